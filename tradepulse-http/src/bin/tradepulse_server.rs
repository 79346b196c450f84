use std::env;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use tradepulse_http::http::v1::server::*;
use tradepulse_http::http::v1::AppState;

const MARKET_TICK_SECS: u64 = 15;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let address: String = args.get(1).cloned().unwrap_or("127.0.0.1".to_string());
    let port: u16 = args.get(2).map(|arg| arg.parse().unwrap()).unwrap_or(8080);

    let app_state = web::Data::new(Mutex::new(AppState::with_default_market()));

    let ticker_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(MARKET_TICK_SECS));
        loop {
            interval.tick().await;
            ticker_state.lock().unwrap().tick_market();
            log::info!("market tick applied");
        }
    });

    log::info!("tradepulse server listening on {address}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .service(register)
            .service(login)
            .service(me)
            .service(search_stocks)
            // Fixed segments must be mounted before the `{symbol}` catch-all.
            .service(market_movers)
            .service(popular_stocks)
            .service(stock_history)
            .service(stock_info)
            .service(execute_trade)
            .service(trading_portfolio)
            .service(positions)
            .service(trade_history)
            .service(trading_stats)
            .service(portfolio_value)
            .service(portfolio_performance)
            .service(portfolio_summary)
            .service(portfolio_metrics)
            .service(portfolio_history)
            .service(dashboard_overview)
            .service(dashboard_performance)
            .service(health)
    })
    .bind((address, port))?
    .run()
    .await
}
