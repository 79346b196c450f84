use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tradepulse::account::{Account, AccountStats, PositionView, Trade, TradeError, TradeSide};
use tradepulse::credentials::{
    hash_password, mint_token, verify_password, MIN_PASSWORD_LEN, TOKEN_TTL_SECS,
};
use tradepulse::market::{Market, Movers};

pub const API_VERSION: &str = "1.0.0";
const TRADE_HISTORY_LIMIT: usize = 50;
const VALUE_HISTORY_CAP: usize = 1000;
const DEFAULT_PERFORMANCE_DAYS: u32 = 30;

pub type UserId = u64;

pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: i64,
}

struct SessionRecord {
    user_id: UserId,
    expires_at: i64,
}

pub struct AppState {
    users: HashMap<String, UserRecord>,
    sessions: HashMap<String, SessionRecord>,
    accounts: HashMap<UserId, Account>,
    value_history: HashMap<UserId, Vec<(i64, f64)>>,
    market: Market,
    last_user_id: UserId,
}

impl AppState {
    pub fn new(market: Market) -> Self {
        Self {
            users: HashMap::new(),
            sessions: HashMap::new(),
            accounts: HashMap::new(),
            value_history: HashMap::new(),
            market,
            last_user_id: 0,
        }
    }

    pub fn with_default_market() -> Self {
        Self::new(Market::with_default_listings(now()))
    }

    pub fn register(&mut self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') || email.len() < 3 {
            return Err(ApiError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::WeakPassword);
        }
        if self.users.contains_key(&email) {
            return Err(ApiError::EmailTaken);
        }

        self.last_user_id += 1;
        let user = UserRecord {
            id: self.last_user_id,
            email: email.clone(),
            password_hash: hash_password(password),
            is_active: true,
            created_at: now(),
        };
        let account = Account::new();
        self.value_history
            .insert(user.id, vec![(user.created_at, account.cash_balance)]);
        self.accounts.insert(user.id, account);
        self.users.insert(email.clone(), user);

        self.profile_by_email(&email)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .get(&email)
            .ok_or(ApiError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }

        let token = mint_token();
        self.sessions.insert(
            token.clone(),
            SessionRecord {
                user_id: user.id,
                expires_at: now() + TOKEN_TTL_SECS,
            },
        );
        Ok(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
        })
    }

    /// Resolves a bearer token to a live session. Expired sessions are
    /// dropped on touch.
    pub fn authenticate(&mut self, token: &str) -> Result<UserId, ApiError> {
        let session = self.sessions.get(token).ok_or(ApiError::Unauthorized)?;
        if session.expires_at <= now() {
            self.sessions.remove(token);
            return Err(ApiError::Unauthorized);
        }
        Ok(session.user_id)
    }

    pub fn me(&mut self, token: &str) -> Result<UserProfile, ApiError> {
        let user_id = self.authenticate(token)?;
        self.profile(user_id)
    }

    fn profile_by_email(&self, email: &str) -> Result<UserProfile, ApiError> {
        let user = self.users.get(email).ok_or(ApiError::AccountMissing)?;
        self.profile(user.id)
    }

    pub fn profile(&self, user_id: UserId) -> Result<UserProfile, ApiError> {
        let user = self
            .users
            .values()
            .find(|user| user.id == user_id)
            .ok_or(ApiError::AccountMissing)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(UserProfile {
            id: user.id,
            email: user.email.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            portfolio_id: user.id,
            cash_balance: account.cash_balance,
            total_value: account.total_value(&self.market),
        })
    }

    pub fn search_stocks(&self, query: &str) -> Result<Vec<StockInfo>, ApiError> {
        if query.is_empty() {
            return Err(ApiError::EmptyQuery);
        }
        Ok(self
            .market
            .search(query)
            .into_iter()
            .filter_map(|listing| self.stock_info(&listing.symbol).ok())
            .collect())
    }

    pub fn stock_info(&self, symbol: &str) -> Result<StockInfo, ApiError> {
        let listing = self
            .market
            .get_listing(symbol)
            .ok_or(ApiError::UnknownSymbol)?;
        let quote = self
            .market
            .get_quote(symbol)
            .ok_or(ApiError::UnknownSymbol)?;
        Ok(StockInfo {
            symbol: listing.symbol.clone(),
            name: listing.name.clone(),
            sector: listing.sector.clone(),
            current_price: quote.price,
            previous_close: quote.previous_close,
            change: quote.change(),
            change_percent: quote.change_percent(),
            volume: quote.volume,
            last_updated: quote.date,
        })
    }

    pub fn stock_history(
        &self,
        symbol: &str,
        period: &str,
    ) -> Result<StockHistoryResponse, ApiError> {
        let points = points_for_period(period);
        let series = self
            .market
            .history(symbol, points)
            .ok_or(ApiError::UnknownSymbol)?;
        let mut response = StockHistoryResponse {
            symbol: symbol.to_uppercase(),
            dates: Vec::with_capacity(series.len()),
            prices: Vec::with_capacity(series.len()),
            volumes: Vec::with_capacity(series.len()),
        };
        for quote in series {
            response.dates.push(quote.date);
            response.prices.push(quote.price);
            response.volumes.push(quote.volume);
        }
        Ok(response)
    }

    pub fn market_movers(&self) -> Movers {
        self.market.movers()
    }

    pub fn popular_stocks(&self) -> Vec<StockInfo> {
        self.market
            .popular()
            .into_iter()
            .filter_map(|quote| self.stock_info(&quote.symbol).ok())
            .collect()
    }

    pub fn execute_trade(
        &mut self,
        token: &str,
        request: &TradeRequest,
    ) -> Result<TradeReceipt, ApiError> {
        let user_id = self.authenticate(token)?;
        let quote = self
            .market
            .get_quote(&request.symbol)
            .ok_or(ApiError::UnknownSymbol)?;
        let price = quote.price;
        let date = quote.date;
        let account = self
            .accounts
            .get_mut(&user_id)
            .ok_or(ApiError::AccountMissing)?;

        let (trade, verb) = match request.order_type {
            TradeSide::Buy => (
                account.execute_buy(&request.symbol, request.quantity, price, date)?,
                "bought",
            ),
            TradeSide::Sell => (
                account.execute_sell(&request.symbol, request.quantity, price, date)?,
                "sold",
            ),
        };

        Ok(TradeReceipt {
            trade_id: trade.trade_id,
            message: format!(
                "Successfully {verb} {} shares of {} at ${:.2} per share",
                trade.quantity, trade.symbol, trade.price
            ),
            executed_price: trade.price,
            executed_quantity: trade.quantity,
            total_amount: trade.total_amount,
            fees: trade.fees,
        })
    }

    pub fn trading_portfolio(&mut self, token: &str) -> Result<PortfolioResponse, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(PortfolioResponse {
            cash_balance: account.cash_balance,
            total_market_value: account.market_value(&self.market),
            total_portfolio_value: account.total_value(&self.market),
            positions: account.position_views(&self.market),
        })
    }

    pub fn positions(&mut self, token: &str) -> Result<Vec<PositionView>, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(account.position_views(&self.market))
    }

    pub fn trade_history(&mut self, token: &str) -> Result<Vec<Trade>, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(account
            .trade_history(TRADE_HISTORY_LIMIT)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn trading_stats(&mut self, token: &str) -> Result<AccountStats, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(account.stats())
    }

    pub fn portfolio_value(&mut self, token: &str) -> Result<PortfolioValue, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(PortfolioValue {
            portfolio_id: user_id,
            cash_balance: account.cash_balance,
            stock_value: account.market_value(&self.market),
            total_value: account.total_value(&self.market),
            positions: account.position_views(&self.market),
            last_updated: now(),
        })
    }

    pub fn portfolio_performance(
        &mut self,
        token: &str,
        period_days: u32,
    ) -> Result<PortfolioPerformance, ApiError> {
        let user_id = self.authenticate(token)?;
        self.performance_for(user_id, period_days)
    }

    fn performance_for(
        &self,
        user_id: UserId,
        period_days: u32,
    ) -> Result<PortfolioPerformance, ApiError> {
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        let current_value = account.total_value(&self.market);
        let cutoff = now() - i64::from(period_days) * 86_400;
        let history = self.value_history.get(&user_id);
        let starting_value = history
            .and_then(|series| {
                series
                    .iter()
                    .find(|(date, _)| *date >= cutoff)
                    .or_else(|| series.first())
            })
            .map(|(_, value)| *value)
            .unwrap_or(current_value);
        let total_return = current_value - starting_value;
        let total_return_percent = if starting_value > 0.0 {
            total_return / starting_value * 100.0
        } else {
            0.0
        };
        Ok(PortfolioPerformance {
            period_days,
            starting_value,
            current_value,
            total_return,
            total_return_percent,
        })
    }

    pub fn portfolio_summary(&mut self, token: &str) -> Result<PortfolioSummary, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        let stock_value = account.market_value(&self.market);
        let total_value = account.total_value(&self.market);
        let position_count = account.position_views(&self.market).len() as u64;
        let cash_balance = account.cash_balance;
        let day = self.performance_for(user_id, 1)?;
        let overall = self.performance_for(user_id, DEFAULT_PERFORMANCE_DAYS)?;
        Ok(PortfolioSummary {
            portfolio_id: user_id,
            user_id,
            total_value,
            cash_balance,
            stock_value,
            day_change: day.total_return,
            day_change_percent: day.total_return_percent,
            total_return: overall.total_return,
            total_return_percent: overall.total_return_percent,
            position_count,
            last_updated: now(),
        })
    }

    pub fn portfolio_metrics(&mut self, token: &str) -> Result<PortfolioMetrics, ApiError> {
        let user_id = self.authenticate(token)?;
        let account = self.accounts.get(&user_id).ok_or(ApiError::AccountMissing)?;
        let stats = account.stats();
        let unrealized_pnl = account
            .position_views(&self.market)
            .iter()
            .map(|view| view.unrealized_pnl)
            .sum();
        let total_value = account.total_value(&self.market);
        let return_percent =
            (total_value - tradepulse::account::STARTING_CASH) / tradepulse::account::STARTING_CASH
                * 100.0;
        Ok(PortfolioMetrics {
            realized_pnl: stats.realized_returns,
            unrealized_pnl,
            fees_paid: stats.fees_paid,
            total_trades: stats.total_trades,
            return_percent,
        })
    }

    pub fn portfolio_history(&mut self, token: &str) -> Result<PortfolioHistoryResponse, ApiError> {
        let user_id = self.authenticate(token)?;
        let series = self.value_history.get(&user_id).ok_or(ApiError::AccountMissing)?;
        Ok(PortfolioHistoryResponse {
            dates: series.iter().map(|(date, _)| *date).collect(),
            values: series.iter().map(|(_, value)| *value).collect(),
        })
    }

    pub fn dashboard_overview(&mut self, token: &str) -> Result<DashboardOverview, ApiError> {
        let portfolio = self.trading_portfolio(token)?;
        Ok(DashboardOverview {
            market_movers: self.market_movers(),
            portfolio,
            last_updated: now(),
        })
    }

    pub fn dashboard_performance(
        &mut self,
        token: &str,
    ) -> Result<DashboardPerformance, ApiError> {
        let history = self.portfolio_history(token)?;
        let benchmark_values = (0..history.values.len())
            .map(|step| tradepulse::account::STARTING_CASH + step as f64 * 50.0)
            .collect();
        Ok(DashboardPerformance {
            dates: history.dates,
            portfolio_values: history.values,
            benchmark_values,
        })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            timestamp: now(),
            version: API_VERSION.to_string(),
        }
    }

    /// One step of the market walk, snapshotting every account's value so
    /// performance queries have a series to look back on.
    pub fn tick_market(&mut self) {
        let date = now();
        self.market.tick(date);
        for (user_id, account) in &self.accounts {
            let value = account.total_value(&self.market);
            let series = self.value_history.entry(*user_id).or_default();
            series.push((date, value));
            if series.len() > VALUE_HISTORY_CAP {
                series.remove(0);
            }
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Quote history is tick-resolution, so periods map to point counts rather
/// than calendar ranges.
fn points_for_period(period: &str) -> usize {
    match period {
        "1d" => 24,
        "5d" => 120,
        "1mo" => 720,
        "3mo" => 2160,
        "6mo" => 4320,
        "1y" => 8760,
        _ => 30,
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub is_active: bool,
    pub created_at: i64,
    pub portfolio_id: UserId,
    pub cash_balance: f64,
    pub total_value: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StockInfo {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub last_updated: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StockHistoryResponse {
    pub symbol: String,
    pub dates: Vec<i64>,
    pub prices: Vec<f64>,
    pub volumes: Vec<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: u64,
    pub order_type: TradeSide,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TradeReceipt {
    pub trade_id: u64,
    pub message: String,
    pub executed_price: f64,
    pub executed_quantity: u64,
    pub total_amount: f64,
    pub fees: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortfolioResponse {
    pub cash_balance: f64,
    pub total_market_value: f64,
    pub total_portfolio_value: f64,
    pub positions: Vec<PositionView>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortfolioValue {
    pub portfolio_id: UserId,
    pub cash_balance: f64,
    pub stock_value: f64,
    pub total_value: f64,
    pub positions: Vec<PositionView>,
    pub last_updated: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortfolioPerformance {
    pub period_days: u32,
    pub starting_value: f64,
    pub current_value: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortfolioSummary {
    pub portfolio_id: UserId,
    pub user_id: UserId,
    pub total_value: f64,
    pub cash_balance: f64,
    pub stock_value: f64,
    pub day_change: f64,
    pub day_change_percent: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
    pub position_count: u64,
    pub last_updated: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortfolioMetrics {
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub fees_paid: f64,
    pub total_trades: u64,
    pub return_percent: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortfolioHistoryResponse {
    pub dates: Vec<i64>,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DashboardOverview {
    pub market_movers: Movers,
    pub portfolio: PortfolioResponse,
    pub last_updated: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DashboardPerformance {
    pub dates: Vec<i64>,
    pub portfolio_values: Vec<f64>,
    pub benchmark_values: Vec<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
}

#[derive(Debug)]
pub enum ApiError {
    InvalidCredentials,
    Unauthorized,
    EmailTaken,
    WeakPassword,
    InvalidEmail,
    UnknownSymbol,
    InsufficientFunds { required: f64, available: f64 },
    InsufficientShares { requested: u64, held: u64 },
    ZeroQuantity,
    EmptyQuery,
    AccountMissing,
}

impl ApiError {
    /// HTTP status this error maps to, shared by the actix responder and
    /// the in-process client.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthorized => 401,
            ApiError::UnknownSymbol | ApiError::AccountMissing => 404,
            _ => 400,
        }
    }
}

impl std::error::Error for ApiError {}

impl core::fmt::Display for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApiError::InvalidCredentials => write!(f, "Incorrect email or password"),
            ApiError::Unauthorized => write!(f, "Could not validate credentials"),
            ApiError::EmailTaken => write!(f, "Email already registered"),
            ApiError::WeakPassword => {
                write!(f, "Password must be at least 6 characters")
            }
            ApiError::InvalidEmail => write!(f, "Invalid email address"),
            ApiError::UnknownSymbol => write!(f, "Stock not found"),
            ApiError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "Insufficient funds. Need ${required:.2}, have ${available:.2}"
            ),
            ApiError::InsufficientShares { requested, held } => write!(
                f,
                "Insufficient shares. Trying to sell {requested}, have {held}"
            ),
            ApiError::ZeroQuantity => write!(f, "Quantity must be greater than zero"),
            ApiError::EmptyQuery => write!(f, "Query must be at least 1 character"),
            ApiError::AccountMissing => write!(f, "Portfolio not found"),
        }
    }
}

impl From<TradeError> for ApiError {
    fn from(value: TradeError) -> Self {
        match value {
            TradeError::InsufficientFunds {
                required,
                available,
            } => ApiError::InsufficientFunds {
                required,
                available,
            },
            TradeError::InsufficientShares { requested, held } => {
                ApiError::InsufficientShares { requested, held }
            }
            TradeError::ZeroQuantity => ApiError::ZeroQuantity,
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.status())
            .unwrap_or(actix_web::http::StatusCode::BAD_REQUEST)
    }
}

/// One method per REST operation. Authenticated operations take the bearer
/// token explicitly; session ownership lives with the caller.
pub trait Client {
    fn health(&self) -> impl Future<Output = Result<HealthResponse>>;
    fn register(&self, email: &str, password: &str)
        -> impl Future<Output = Result<UserProfile>>;
    fn login(&self, email: &str, password: &str) -> impl Future<Output = Result<TokenResponse>>;
    fn me(&self, token: &str) -> impl Future<Output = Result<UserProfile>>;
    fn search_stocks(&self, query: &str) -> impl Future<Output = Result<Vec<StockInfo>>>;
    fn stock_info(&self, symbol: &str) -> impl Future<Output = Result<StockInfo>>;
    fn stock_history(
        &self,
        symbol: &str,
        period: &str,
    ) -> impl Future<Output = Result<StockHistoryResponse>>;
    fn market_movers(&self) -> impl Future<Output = Result<Movers>>;
    fn popular_stocks(&self) -> impl Future<Output = Result<Vec<StockInfo>>>;
    fn execute_trade(
        &self,
        token: &str,
        request: TradeRequest,
    ) -> impl Future<Output = Result<TradeReceipt>>;
    fn trading_portfolio(&self, token: &str) -> impl Future<Output = Result<PortfolioResponse>>;
    fn positions(&self, token: &str) -> impl Future<Output = Result<Vec<PositionView>>>;
    fn trade_history(&self, token: &str) -> impl Future<Output = Result<Vec<Trade>>>;
    fn trading_stats(&self, token: &str) -> impl Future<Output = Result<AccountStats>>;
    fn portfolio_value(&self, token: &str) -> impl Future<Output = Result<PortfolioValue>>;
    fn portfolio_performance(
        &self,
        token: &str,
        period_days: u32,
    ) -> impl Future<Output = Result<PortfolioPerformance>>;
    fn portfolio_summary(&self, token: &str) -> impl Future<Output = Result<PortfolioSummary>>;
    fn portfolio_metrics(&self, token: &str) -> impl Future<Output = Result<PortfolioMetrics>>;
    fn portfolio_history(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<PortfolioHistoryResponse>>;
    fn dashboard_overview(&self, token: &str)
        -> impl Future<Output = Result<DashboardOverview>>;
    fn dashboard_performance(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<DashboardPerformance>>;
}

type ServerState = Mutex<AppState>;

pub mod server {
    use actix_web::http::header;
    use actix_web::{get, post, web, HttpRequest};

    use tradepulse::account::{AccountStats, PositionView, Trade};
    use tradepulse::market::Movers;

    use super::{
        ApiError, AppState, DashboardOverview, DashboardPerformance, HealthResponse, LoginForm,
        PortfolioHistoryResponse, PortfolioMetrics, PortfolioPerformance, PortfolioResponse,
        PortfolioSummary, PortfolioValue, RegisterRequest, ServerState, StockHistoryResponse,
        StockInfo, TokenResponse, TradeReceipt, TradeRequest, UserProfile,
        DEFAULT_PERFORMANCE_DAYS,
    };

    fn bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or(ApiError::Unauthorized)
    }

    fn lock(app: &web::Data<ServerState>) -> std::sync::MutexGuard<'_, AppState> {
        app.lock().unwrap()
    }

    #[derive(serde::Deserialize)]
    pub struct SearchQuery {
        pub q: String,
    }

    #[derive(serde::Deserialize)]
    pub struct HistoryQuery {
        pub period: Option<String>,
    }

    #[derive(serde::Deserialize)]
    pub struct PerformanceQuery {
        pub period_days: Option<u32>,
    }

    #[post("/auth/register")]
    pub async fn register(
        app: web::Data<ServerState>,
        body: web::Json<RegisterRequest>,
    ) -> Result<web::Json<UserProfile>, ApiError> {
        Ok(web::Json(lock(&app).register(&body.email, &body.password)?))
    }

    // Login is form-encoded, matching the OAuth2 password flow the original
    // frontend submits.
    #[post("/auth/login")]
    pub async fn login(
        app: web::Data<ServerState>,
        form: web::Form<LoginForm>,
    ) -> Result<web::Json<TokenResponse>, ApiError> {
        Ok(web::Json(lock(&app).login(&form.username, &form.password)?))
    }

    #[get("/auth/me")]
    pub async fn me(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<UserProfile>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).me(&token)?))
    }

    #[get("/stocks/search")]
    pub async fn search_stocks(
        app: web::Data<ServerState>,
        query: web::Query<SearchQuery>,
    ) -> Result<web::Json<Vec<StockInfo>>, ApiError> {
        Ok(web::Json(lock(&app).search_stocks(&query.q)?))
    }

    #[get("/stocks/market/movers")]
    pub async fn market_movers(
        app: web::Data<ServerState>,
    ) -> Result<web::Json<Movers>, ApiError> {
        Ok(web::Json(lock(&app).market_movers()))
    }

    #[get("/stocks/popular")]
    pub async fn popular_stocks(
        app: web::Data<ServerState>,
    ) -> Result<web::Json<Vec<StockInfo>>, ApiError> {
        Ok(web::Json(lock(&app).popular_stocks()))
    }

    #[get("/stocks/{symbol}")]
    pub async fn stock_info(
        app: web::Data<ServerState>,
        path: web::Path<(String,)>,
    ) -> Result<web::Json<StockInfo>, ApiError> {
        let (symbol,) = path.into_inner();
        Ok(web::Json(lock(&app).stock_info(&symbol)?))
    }

    #[get("/stocks/{symbol}/history")]
    pub async fn stock_history(
        app: web::Data<ServerState>,
        path: web::Path<(String,)>,
        query: web::Query<HistoryQuery>,
    ) -> Result<web::Json<StockHistoryResponse>, ApiError> {
        let (symbol,) = path.into_inner();
        let period = query.period.as_deref().unwrap_or("1mo");
        Ok(web::Json(lock(&app).stock_history(&symbol, period)?))
    }

    #[post("/trading/execute")]
    pub async fn execute_trade(
        app: web::Data<ServerState>,
        req: HttpRequest,
        body: web::Json<TradeRequest>,
    ) -> Result<web::Json<TradeReceipt>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).execute_trade(&token, &body)?))
    }

    #[get("/trading/portfolio")]
    pub async fn trading_portfolio(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<PortfolioResponse>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).trading_portfolio(&token)?))
    }

    #[get("/trading/positions")]
    pub async fn positions(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<Vec<PositionView>>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).positions(&token)?))
    }

    #[get("/trading/history")]
    pub async fn trade_history(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<Vec<Trade>>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).trade_history(&token)?))
    }

    #[get("/trading/stats")]
    pub async fn trading_stats(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<AccountStats>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).trading_stats(&token)?))
    }

    #[get("/portfolio/value")]
    pub async fn portfolio_value(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<PortfolioValue>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).portfolio_value(&token)?))
    }

    #[get("/portfolio/performance")]
    pub async fn portfolio_performance(
        app: web::Data<ServerState>,
        req: HttpRequest,
        query: web::Query<PerformanceQuery>,
    ) -> Result<web::Json<PortfolioPerformance>, ApiError> {
        let token = bearer_token(&req)?;
        let period_days = query.period_days.unwrap_or(DEFAULT_PERFORMANCE_DAYS);
        Ok(web::Json(
            lock(&app).portfolio_performance(&token, period_days)?,
        ))
    }

    #[get("/portfolio/summary")]
    pub async fn portfolio_summary(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<PortfolioSummary>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).portfolio_summary(&token)?))
    }

    #[get("/portfolio/metrics")]
    pub async fn portfolio_metrics(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<PortfolioMetrics>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).portfolio_metrics(&token)?))
    }

    #[get("/portfolio/history")]
    pub async fn portfolio_history(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<PortfolioHistoryResponse>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).portfolio_history(&token)?))
    }

    #[get("/dashboard/overview")]
    pub async fn dashboard_overview(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<DashboardOverview>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).dashboard_overview(&token)?))
    }

    #[get("/dashboard/performance")]
    pub async fn dashboard_performance(
        app: web::Data<ServerState>,
        req: HttpRequest,
    ) -> Result<web::Json<DashboardPerformance>, ApiError> {
        let token = bearer_token(&req)?;
        Ok(web::Json(lock(&app).dashboard_performance(&token)?))
    }

    #[get("/health")]
    pub async fn health(app: web::Data<ServerState>) -> web::Json<HealthResponse> {
        web::Json(lock(&app).health())
    }
}
