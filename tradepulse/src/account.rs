//! Paper-trading account engine: orders against live quotes become cash
//! movements, positions, and realized returns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::market::Market;

pub const STARTING_CASH: f64 = 100_000.0;
/// Brokerage charged on both sides of a trade, as a fraction of trade value.
pub const FEE_RATE: f64 = 0.0005;

pub type TradeId = u64;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
    pub total_amount: f64,
    pub fees: f64,
    pub date: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    pub average_cost: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub name: String,
    pub quantity: u64,
    pub average_cost: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub cost_basis: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AccountStats {
    pub total_trades: u64,
    pub buy_trades: u64,
    pub sell_trades: u64,
    pub fees_paid: f64,
    pub realized_returns: f64,
}

#[derive(Debug)]
pub enum TradeError {
    InsufficientFunds { required: f64, available: f64 },
    InsufficientShares { requested: u64, held: u64 },
    ZeroQuantity,
}

impl std::error::Error for TradeError {}

impl core::fmt::Display for TradeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TradeError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "Insufficient funds. Need ${required:.2}, have ${available:.2}"
            ),
            TradeError::InsufficientShares { requested, held } => write!(
                f,
                "Insufficient shares. Trying to sell {requested}, have {held}"
            ),
            TradeError::ZeroQuantity => write!(f, "Quantity must be greater than zero"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Account {
    pub cash_balance: f64,
    pub total_invested: f64,
    pub total_returns: f64,
    positions: HashMap<String, Position>,
    trade_log: Vec<Trade>,
    last_trade_id: TradeId,
}

impl Account {
    pub fn new() -> Self {
        Self {
            cash_balance: STARTING_CASH,
            total_invested: 0.0,
            total_returns: 0.0,
            positions: HashMap::new(),
            trade_log: Vec::new(),
            last_trade_id: 0,
        }
    }

    pub fn execute_buy(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: f64,
        date: i64,
    ) -> Result<Trade, TradeError> {
        if quantity == 0 {
            return Err(TradeError::ZeroQuantity);
        }
        let symbol = symbol.to_uppercase();
        let trade_value = price * quantity as f64;
        let fees = trade_value * FEE_RATE;
        let total_cost = trade_value + fees;

        if self.cash_balance < total_cost {
            return Err(TradeError::InsufficientFunds {
                required: total_cost,
                available: self.cash_balance,
            });
        }

        self.cash_balance -= total_cost;
        self.total_invested += trade_value;

        let position = self
            .positions
            .entry(symbol.clone())
            .or_insert_with(|| Position {
                symbol: symbol.clone(),
                quantity: 0,
                average_cost: 0.0,
            });
        let old_value = position.average_cost * position.quantity as f64;
        position.quantity += quantity;
        position.average_cost = (old_value + trade_value) / position.quantity as f64;

        Ok(self.record_trade(symbol, TradeSide::Buy, quantity, price, trade_value, fees, date))
    }

    pub fn execute_sell(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: f64,
        date: i64,
    ) -> Result<Trade, TradeError> {
        if quantity == 0 {
            return Err(TradeError::ZeroQuantity);
        }
        let symbol = symbol.to_uppercase();
        let held = self
            .positions
            .get(&symbol)
            .map(|position| position.quantity)
            .unwrap_or(0);
        if held < quantity {
            return Err(TradeError::InsufficientShares {
                requested: quantity,
                held,
            });
        }

        let trade_value = price * quantity as f64;
        let fees = trade_value * FEE_RATE;
        let net_proceeds = trade_value - fees;

        // Realized return is measured against the average cost of the shares
        // sold, not against the whole position.
        let position = self.positions.get_mut(&symbol).unwrap();
        let cost_basis = position.average_cost * quantity as f64;
        position.quantity -= quantity;
        if position.quantity == 0 {
            self.positions.remove(&symbol);
        }

        self.cash_balance += net_proceeds;
        self.total_invested -= cost_basis;
        self.total_returns += net_proceeds - cost_basis;

        Ok(self.record_trade(symbol, TradeSide::Sell, quantity, price, trade_value, fees, date))
    }

    #[allow(clippy::too_many_arguments)]
    fn record_trade(
        &mut self,
        symbol: String,
        side: TradeSide,
        quantity: u64,
        price: f64,
        total_amount: f64,
        fees: f64,
        date: i64,
    ) -> Trade {
        self.last_trade_id += 1;
        let trade = Trade {
            trade_id: self.last_trade_id,
            symbol,
            side,
            quantity,
            price,
            total_amount,
            fees,
            date,
        };
        self.trade_log.push(trade.clone());
        trade
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(&symbol.to_uppercase())
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Most recent trades first, capped at `limit`.
    pub fn trade_history(&self, limit: usize) -> Vec<&Trade> {
        self.trade_log.iter().rev().take(limit).collect()
    }

    /// Value of held positions at current market prices. Positions without a
    /// live quote are valued at cost.
    pub fn market_value(&self, market: &Market) -> f64 {
        self.positions
            .values()
            .map(|position| {
                let price = market
                    .get_quote(&position.symbol)
                    .map(|quote| quote.price)
                    .unwrap_or(position.average_cost);
                price * position.quantity as f64
            })
            .sum()
    }

    pub fn total_value(&self, market: &Market) -> f64 {
        self.cash_balance + self.market_value(market)
    }

    pub fn position_views(&self, market: &Market) -> Vec<PositionView> {
        let mut views: Vec<PositionView> = self
            .positions
            .values()
            .map(|position| {
                let current_price = market
                    .get_quote(&position.symbol)
                    .map(|quote| quote.price)
                    .unwrap_or(position.average_cost);
                let name = market
                    .get_listing(&position.symbol)
                    .map(|listing| listing.name.clone())
                    .unwrap_or_else(|| position.symbol.clone());
                let market_value = current_price * position.quantity as f64;
                let cost_basis = position.average_cost * position.quantity as f64;
                let unrealized_pnl = market_value - cost_basis;
                let unrealized_pnl_percent = if cost_basis > 0.0 {
                    unrealized_pnl / cost_basis * 100.0
                } else {
                    0.0
                };
                PositionView {
                    symbol: position.symbol.clone(),
                    name,
                    quantity: position.quantity,
                    average_cost: position.average_cost,
                    current_price,
                    market_value,
                    cost_basis,
                    unrealized_pnl,
                    unrealized_pnl_percent,
                }
            })
            .collect();
        views.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        views
    }

    pub fn stats(&self) -> AccountStats {
        let buy_trades = self
            .trade_log
            .iter()
            .filter(|trade| trade.side == TradeSide::Buy)
            .count() as u64;
        AccountStats {
            total_trades: self.trade_log.len() as u64,
            buy_trades,
            sell_trades: self.trade_log.len() as u64 - buy_trades,
            fees_paid: self.trade_log.iter().map(|trade| trade.fees).sum(),
            realized_returns: self.total_returns,
        }
    }

    /// Back to the starting state. The trade log is cleared with everything
    /// else, matching a full portfolio reset.
    pub fn reset(&mut self) {
        self.cash_balance = STARTING_CASH;
        self.total_invested = 0.0;
        self.total_returns = 0.0;
        self.positions.clear();
        self.trade_log.clear();
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}
