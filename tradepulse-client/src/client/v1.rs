use std::future::{self, Future};
use std::sync::Mutex;

use anyhow::{Error, Result};
use serde::de::DeserializeOwned;

use tradepulse::account::{AccountStats, PositionView, Trade};
use tradepulse::market::Movers;
use tradepulse_http::http::v1::{
    ApiError, AppState, Client, DashboardOverview, DashboardPerformance, HealthResponse,
    PortfolioHistoryResponse, PortfolioMetrics, PortfolioPerformance, PortfolioResponse,
    PortfolioSummary, PortfolioValue, StockHistoryResponse, StockInfo, TokenResponse,
    TradeReceipt, TradeRequest, UserProfile,
};

/// Outcome classes every client implementation reports through. The
/// transport never reacts to an authorization failure itself; it surfaces
/// `Unauthorized` and leaves the decision to the session layer.
#[derive(Debug)]
pub enum ClientError {
    Unauthorized,
    Rejected { status: u16, message: String },
    Transport(String),
}

impl std::error::Error for ClientError {}

impl core::fmt::Display for ClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ClientError::Unauthorized => write!(f, "Unauthorized"),
            ClientError::Rejected { status, message } => {
                write!(f, "Rejected ({status}): {message}")
            }
            ClientError::Transport(message) => write!(f, "Transport failure: {message}"),
        }
    }
}

impl ClientError {
    pub fn is_unauthorized(error: &Error) -> bool {
        matches!(error.downcast_ref::<ClientError>(), Some(ClientError::Unauthorized))
    }

    pub fn is_transport(error: &Error) -> bool {
        matches!(error.downcast_ref::<ClientError>(), Some(ClientError::Transport(_)))
    }

    /// The backend's own message for a rejected request, verbatim.
    pub fn rejection_message(error: &Error) -> Option<&str> {
        match error.downcast_ref::<ClientError>() {
            Some(ClientError::Rejected { message, .. }) => Some(message),
            _ => None,
        }
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::new(ClientError::Transport(err.to_string()))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::new(ClientError::Unauthorized));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Error::new(ClientError::Rejected {
            status: status.as_u16(),
            message,
        }));
    }
    response.json::<T>().await.map_err(transport)
}

#[derive(Debug)]
pub struct HttpClient {
    pub path: String,
    pub client: reqwest::Client,
}

impl HttpClient {
    pub fn new(path: String) -> Self {
        Self {
            path,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str, token: Option<&str>) -> Result<T> {
        let mut request = self.client.get(self.path.clone() + route);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        decode(request.send().await.map_err(transport)?).await
    }
}

impl Client for HttpClient {
    async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/health", None).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<UserProfile> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .client
            .post(self.path.clone() + "/auth/register")
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    // The login route speaks the OAuth2 password flow, so credentials go
    // over as a form rather than JSON.
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let response = self
            .client
            .post(self.path.clone() + "/auth/login")
            .form(&[("username", email), ("password", password)])
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn me(&self, token: &str) -> Result<UserProfile> {
        self.get_json("/auth/me", Some(token)).await
    }

    async fn search_stocks(&self, query: &str) -> Result<Vec<StockInfo>> {
        let response = self
            .client
            .get(self.path.clone() + "/stocks/search")
            .query(&[("q", query)])
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn stock_info(&self, symbol: &str) -> Result<StockInfo> {
        self.get_json(format!("/stocks/{symbol}").as_str(), None).await
    }

    async fn stock_history(&self, symbol: &str, period: &str) -> Result<StockHistoryResponse> {
        let response = self
            .client
            .get(self.path.clone() + format!("/stocks/{symbol}/history").as_str())
            .query(&[("period", period)])
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn market_movers(&self) -> Result<Movers> {
        self.get_json("/stocks/market/movers", None).await
    }

    async fn popular_stocks(&self) -> Result<Vec<StockInfo>> {
        self.get_json("/stocks/popular", None).await
    }

    async fn execute_trade(&self, token: &str, request: TradeRequest) -> Result<TradeReceipt> {
        let response = self
            .client
            .post(self.path.clone() + "/trading/execute")
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn trading_portfolio(&self, token: &str) -> Result<PortfolioResponse> {
        self.get_json("/trading/portfolio", Some(token)).await
    }

    async fn positions(&self, token: &str) -> Result<Vec<PositionView>> {
        self.get_json("/trading/positions", Some(token)).await
    }

    async fn trade_history(&self, token: &str) -> Result<Vec<Trade>> {
        self.get_json("/trading/history", Some(token)).await
    }

    async fn trading_stats(&self, token: &str) -> Result<AccountStats> {
        self.get_json("/trading/stats", Some(token)).await
    }

    async fn portfolio_value(&self, token: &str) -> Result<PortfolioValue> {
        self.get_json("/portfolio/value", Some(token)).await
    }

    async fn portfolio_performance(
        &self,
        token: &str,
        period_days: u32,
    ) -> Result<PortfolioPerformance> {
        let response = self
            .client
            .get(self.path.clone() + "/portfolio/performance")
            .bearer_auth(token)
            .query(&[("period_days", period_days)])
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn portfolio_summary(&self, token: &str) -> Result<PortfolioSummary> {
        self.get_json("/portfolio/summary", Some(token)).await
    }

    async fn portfolio_metrics(&self, token: &str) -> Result<PortfolioMetrics> {
        self.get_json("/portfolio/metrics", Some(token)).await
    }

    async fn portfolio_history(&self, token: &str) -> Result<PortfolioHistoryResponse> {
        self.get_json("/portfolio/history", Some(token)).await
    }

    async fn dashboard_overview(&self, token: &str) -> Result<DashboardOverview> {
        self.get_json("/dashboard/overview", Some(token)).await
    }

    async fn dashboard_performance(&self, token: &str) -> Result<DashboardPerformance> {
        self.get_json("/dashboard/performance", Some(token)).await
    }
}

fn map_api_error(err: ApiError) -> Error {
    let status = err.status();
    if status == 401 {
        return Error::new(ClientError::Unauthorized);
    }
    Error::new(ClientError::Rejected {
        status,
        message: err.to_string(),
    })
}

/// In-process client over `AppState`, indistinguishable from the wire
/// client to everything above the transport.
pub struct LocalClient {
    state: Mutex<AppState>,
}

impl LocalClient {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_default_market() -> Self {
        Self::new(AppState::with_default_market())
    }

    /// Advances the in-process market, for tests that need prices to move.
    pub fn tick_market(&self) {
        self.state.lock().unwrap().tick_market();
    }
}

impl Client for LocalClient {
    fn health(&self) -> impl Future<Output = Result<HealthResponse>> {
        future::ready(Ok(self.state.lock().unwrap().health()))
    }

    fn register(&self, email: &str, password: &str) -> impl Future<Output = Result<UserProfile>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .register(email, password)
                .map_err(map_api_error),
        )
    }

    fn login(&self, email: &str, password: &str) -> impl Future<Output = Result<TokenResponse>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .login(email, password)
                .map_err(map_api_error),
        )
    }

    fn me(&self, token: &str) -> impl Future<Output = Result<UserProfile>> {
        future::ready(self.state.lock().unwrap().me(token).map_err(map_api_error))
    }

    fn search_stocks(&self, query: &str) -> impl Future<Output = Result<Vec<StockInfo>>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .search_stocks(query)
                .map_err(map_api_error),
        )
    }

    fn stock_info(&self, symbol: &str) -> impl Future<Output = Result<StockInfo>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .stock_info(symbol)
                .map_err(map_api_error),
        )
    }

    fn stock_history(
        &self,
        symbol: &str,
        period: &str,
    ) -> impl Future<Output = Result<StockHistoryResponse>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .stock_history(symbol, period)
                .map_err(map_api_error),
        )
    }

    fn market_movers(&self) -> impl Future<Output = Result<Movers>> {
        future::ready(Ok(self.state.lock().unwrap().market_movers()))
    }

    fn popular_stocks(&self) -> impl Future<Output = Result<Vec<StockInfo>>> {
        future::ready(Ok(self.state.lock().unwrap().popular_stocks()))
    }

    fn execute_trade(
        &self,
        token: &str,
        request: TradeRequest,
    ) -> impl Future<Output = Result<TradeReceipt>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .execute_trade(token, &request)
                .map_err(map_api_error),
        )
    }

    fn trading_portfolio(&self, token: &str) -> impl Future<Output = Result<PortfolioResponse>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .trading_portfolio(token)
                .map_err(map_api_error),
        )
    }

    fn positions(&self, token: &str) -> impl Future<Output = Result<Vec<PositionView>>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .positions(token)
                .map_err(map_api_error),
        )
    }

    fn trade_history(&self, token: &str) -> impl Future<Output = Result<Vec<Trade>>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .trade_history(token)
                .map_err(map_api_error),
        )
    }

    fn trading_stats(&self, token: &str) -> impl Future<Output = Result<AccountStats>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .trading_stats(token)
                .map_err(map_api_error),
        )
    }

    fn portfolio_value(&self, token: &str) -> impl Future<Output = Result<PortfolioValue>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .portfolio_value(token)
                .map_err(map_api_error),
        )
    }

    fn portfolio_performance(
        &self,
        token: &str,
        period_days: u32,
    ) -> impl Future<Output = Result<PortfolioPerformance>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .portfolio_performance(token, period_days)
                .map_err(map_api_error),
        )
    }

    fn portfolio_summary(&self, token: &str) -> impl Future<Output = Result<PortfolioSummary>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .portfolio_summary(token)
                .map_err(map_api_error),
        )
    }

    fn portfolio_metrics(&self, token: &str) -> impl Future<Output = Result<PortfolioMetrics>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .portfolio_metrics(token)
                .map_err(map_api_error),
        )
    }

    fn portfolio_history(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<PortfolioHistoryResponse>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .portfolio_history(token)
                .map_err(map_api_error),
        )
    }

    fn dashboard_overview(&self, token: &str) -> impl Future<Output = Result<DashboardOverview>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .dashboard_overview(token)
                .map_err(map_api_error),
        )
    }

    fn dashboard_performance(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<DashboardPerformance>> {
        future::ready(
            self.state
                .lock()
                .unwrap()
                .dashboard_performance(token)
                .map_err(map_api_error),
        )
    }
}
