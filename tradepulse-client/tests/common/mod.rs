#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Error, Result};

use tradepulse::account::{AccountStats, PositionView, Trade};
use tradepulse::market::Movers;
use tradepulse_client::client::v1::{ClientError, LocalClient};
use tradepulse_http::http::v1::{
    AppState, Client, DashboardOverview, DashboardPerformance, HealthResponse,
    PortfolioHistoryResponse, PortfolioMetrics, PortfolioPerformance, PortfolioResponse,
    PortfolioSummary, PortfolioValue, StockHistoryResponse, StockInfo, TokenResponse,
    TradeReceipt, TradeRequest, UserProfile,
};

pub fn seeded_client(email: &str, password: &str) -> LocalClient {
    let mut state = AppState::with_default_market();
    state.register(email, password).unwrap();
    LocalClient::new(state)
}

fn down() -> Error {
    Error::new(ClientError::Transport("connection refused".to_string()))
}

macro_rules! delegate_client {
    ($inner:ident) => {
        async fn health(&self) -> Result<HealthResponse> {
            self.$inner.health().await
        }

        async fn register(&self, email: &str, password: &str) -> Result<UserProfile> {
            self.$inner.register(email, password).await
        }

        async fn me(&self, token: &str) -> Result<UserProfile> {
            self.$inner.me(token).await
        }

        async fn search_stocks(&self, query: &str) -> Result<Vec<StockInfo>> {
            self.$inner.search_stocks(query).await
        }

        async fn stock_info(&self, symbol: &str) -> Result<StockInfo> {
            self.$inner.stock_info(symbol).await
        }

        async fn stock_history(
            &self,
            symbol: &str,
            period: &str,
        ) -> Result<StockHistoryResponse> {
            self.$inner.stock_history(symbol, period).await
        }

        async fn popular_stocks(&self) -> Result<Vec<StockInfo>> {
            self.$inner.popular_stocks().await
        }

        async fn execute_trade(
            &self,
            token: &str,
            request: TradeRequest,
        ) -> Result<TradeReceipt> {
            self.$inner.execute_trade(token, request).await
        }

        async fn trading_portfolio(&self, token: &str) -> Result<PortfolioResponse> {
            self.$inner.trading_portfolio(token).await
        }

        async fn positions(&self, token: &str) -> Result<Vec<PositionView>> {
            self.$inner.positions(token).await
        }

        async fn trade_history(&self, token: &str) -> Result<Vec<Trade>> {
            self.$inner.trade_history(token).await
        }

        async fn trading_stats(&self, token: &str) -> Result<AccountStats> {
            self.$inner.trading_stats(token).await
        }

        async fn portfolio_value(&self, token: &str) -> Result<PortfolioValue> {
            self.$inner.portfolio_value(token).await
        }

        async fn portfolio_performance(
            &self,
            token: &str,
            period_days: u32,
        ) -> Result<PortfolioPerformance> {
            self.$inner.portfolio_performance(token, period_days).await
        }

        async fn portfolio_summary(&self, token: &str) -> Result<PortfolioSummary> {
            self.$inner.portfolio_summary(token).await
        }

        async fn portfolio_metrics(&self, token: &str) -> Result<PortfolioMetrics> {
            self.$inner.portfolio_metrics(token).await
        }

        async fn portfolio_history(&self, token: &str) -> Result<PortfolioHistoryResponse> {
            self.$inner.portfolio_history(token).await
        }

        async fn dashboard_overview(&self, token: &str) -> Result<DashboardOverview> {
            self.$inner.dashboard_overview(token).await
        }

        async fn dashboard_performance(&self, token: &str) -> Result<DashboardPerformance> {
            self.$inner.dashboard_performance(token).await
        }
    };
}

/// Delegates everything except market movers, which fail at the transport.
pub struct BrokenMovers {
    pub inner: LocalClient,
}

impl Client for BrokenMovers {
    delegate_client!(inner);

    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        self.inner.login(email, password).await
    }

    async fn market_movers(&self) -> Result<Movers> {
        Err(down())
    }
}

/// Fails the first `failures` login attempts at the transport, then
/// delegates. Everything else goes straight through.
pub struct FlakyLogin {
    pub inner: LocalClient,
    pub failures: AtomicUsize,
}

impl FlakyLogin {
    pub fn new(inner: LocalClient, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }
}

impl Client for FlakyLogin {
    delegate_client!(inner);

    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(down());
        }
        self.inner.login(email, password).await
    }

    async fn market_movers(&self) -> Result<Movers> {
        self.inner.market_movers().await
    }
}

/// A backend that cannot be reached at all.
pub struct DownClient;

impl Client for DownClient {
    async fn health(&self) -> Result<HealthResponse> {
        Err(down())
    }

    async fn register(&self, _email: &str, _password: &str) -> Result<UserProfile> {
        Err(down())
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<TokenResponse> {
        Err(down())
    }

    async fn me(&self, _token: &str) -> Result<UserProfile> {
        Err(down())
    }

    async fn search_stocks(&self, _query: &str) -> Result<Vec<StockInfo>> {
        Err(down())
    }

    async fn stock_info(&self, _symbol: &str) -> Result<StockInfo> {
        Err(down())
    }

    async fn stock_history(&self, _symbol: &str, _period: &str) -> Result<StockHistoryResponse> {
        Err(down())
    }

    async fn market_movers(&self) -> Result<Movers> {
        Err(down())
    }

    async fn popular_stocks(&self) -> Result<Vec<StockInfo>> {
        Err(down())
    }

    async fn execute_trade(&self, _token: &str, _request: TradeRequest) -> Result<TradeReceipt> {
        Err(down())
    }

    async fn trading_portfolio(&self, _token: &str) -> Result<PortfolioResponse> {
        Err(down())
    }

    async fn positions(&self, _token: &str) -> Result<Vec<PositionView>> {
        Err(down())
    }

    async fn trade_history(&self, _token: &str) -> Result<Vec<Trade>> {
        Err(down())
    }

    async fn trading_stats(&self, _token: &str) -> Result<AccountStats> {
        Err(down())
    }

    async fn portfolio_value(&self, _token: &str) -> Result<PortfolioValue> {
        Err(down())
    }

    async fn portfolio_performance(
        &self,
        _token: &str,
        _period_days: u32,
    ) -> Result<PortfolioPerformance> {
        Err(down())
    }

    async fn portfolio_summary(&self, _token: &str) -> Result<PortfolioSummary> {
        Err(down())
    }

    async fn portfolio_metrics(&self, _token: &str) -> Result<PortfolioMetrics> {
        Err(down())
    }

    async fn portfolio_history(&self, _token: &str) -> Result<PortfolioHistoryResponse> {
        Err(down())
    }

    async fn dashboard_overview(&self, _token: &str) -> Result<DashboardOverview> {
        Err(down())
    }

    async fn dashboard_performance(&self, _token: &str) -> Result<DashboardPerformance> {
        Err(down())
    }
}
