//! # TradePulse core
//!
//! Domain library for the TradePulse paper-trading service. This crate holds
//! the pieces that do not touch the network: the in-memory market data source
//! with a synthetic price walk, the paper-trading account engine that turns
//! orders into positions and realized returns, and the credential primitives
//! used to hash passwords and mint opaque bearer tokens.
//!
//! The HTTP surface lives in `tradepulse-http` and the session/client logic
//! in `tradepulse-client`; both compose the types defined here.

pub mod account;
pub mod credentials;
pub mod market;
