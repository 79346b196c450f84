//! HTTP layer for the TradePulse paper-trading service: the actix-web
//! server, the request/response types, and the `Client` trait implemented
//! by the wire and in-process clients in `tradepulse-client`.

pub mod http;
