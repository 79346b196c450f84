//! In-memory market data source with a synthetic price walk.

use std::collections::HashMap;

use rand::{thread_rng, Rng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Largest price move a single tick can apply, as a fraction of price.
const MAX_TICK_MOVE: f64 = 0.02;
const TICK_SIGMA: f64 = 0.008;
const SEARCH_LIMIT: usize = 10;
const MOVERS_LIMIT: usize = 5;
const HISTORY_CAP: usize = 1000;

/// Instruments seeded into every default market: (symbol, name, sector, price).
const DEFAULT_LISTINGS: &[(&str, &str, &str, f64)] = &[
    ("AAPL", "Apple Inc.", "Technology", 175.43),
    ("GOOGL", "Alphabet Inc.", "Technology", 2840.12),
    ("MSFT", "Microsoft Corporation", "Technology", 378.85),
    ("AMZN", "Amazon.com Inc.", "Consumer Discretionary", 3127.50),
    ("TSLA", "Tesla Inc.", "Automotive", 248.50),
    ("NVDA", "NVIDIA Corporation", "Technology", 875.28),
    ("META", "Meta Platforms Inc.", "Technology", 298.15),
    ("NFLX", "Netflix Inc.", "Entertainment", 445.12),
    ("JPM", "JPMorgan Chase & Co.", "Financials", 172.30),
    ("V", "Visa Inc.", "Financials", 267.45),
];

/// Broad-market index proxies quoted alongside single names.
pub const INDEX_PROXIES: &[(&str, &str, f64)] = &[
    ("SPY", "SPDR S&P 500 ETF Trust", 478.10),
    ("QQQ", "Invesco QQQ Trust", 412.66),
    ("DIA", "SPDR Dow Jones Industrial Average ETF", 378.92),
];

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Listing {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub is_index: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub volume: u64,
    pub date: i64,
}

impl Quote {
    pub fn change(&self) -> f64 {
        self.price - self.previous_close
    }

    pub fn change_percent(&self) -> f64 {
        if self.previous_close == 0.0 {
            return 0.0;
        }
        self.change() / self.previous_close * 100.0
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Mover {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Movers {
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
}

pub struct Market {
    listings: HashMap<String, Listing>,
    quotes: HashMap<String, Quote>,
    history: HashMap<String, Vec<Quote>>,
}

impl Market {
    pub fn new() -> Self {
        Self {
            listings: HashMap::new(),
            quotes: HashMap::new(),
            history: HashMap::new(),
        }
    }

    /// Market seeded with the curated instrument table and index proxies,
    /// quoted at their base prices.
    pub fn with_default_listings(date: i64) -> Self {
        let mut market = Self::new();
        for (symbol, name, sector, price) in DEFAULT_LISTINGS {
            market.add_listing(
                Listing {
                    symbol: (*symbol).to_string(),
                    name: (*name).to_string(),
                    sector: (*sector).to_string(),
                    is_index: false,
                },
                *price,
                date,
            );
        }
        for (symbol, name, price) in INDEX_PROXIES {
            market.add_listing(
                Listing {
                    symbol: (*symbol).to_string(),
                    name: (*name).to_string(),
                    sector: "Index".to_string(),
                    is_index: true,
                },
                *price,
                date,
            );
        }
        market
    }

    pub fn add_listing(&mut self, listing: Listing, price: f64, date: i64) {
        let symbol = listing.symbol.clone();
        let quote = Quote {
            symbol: symbol.clone(),
            price,
            previous_close: price,
            volume: 1_000_000,
            date,
        };
        self.history.insert(symbol.clone(), vec![quote.clone()]);
        self.quotes.insert(symbol.clone(), quote);
        self.listings.insert(symbol, listing);
    }

    /// Advances every quote one step of the walk. The previous price becomes
    /// the previous close, so change-percent always reflects the last step.
    pub fn tick(&mut self, date: i64) {
        let mut rng = thread_rng();
        let step = Normal::new(0.0, TICK_SIGMA).unwrap();
        for quote in self.quotes.values_mut() {
            let movement: f64 = step.sample(&mut rng);
            let movement = movement.clamp(-MAX_TICK_MOVE, MAX_TICK_MOVE);
            quote.previous_close = quote.price;
            quote.price *= 1.0 + movement;
            quote.volume = rng.gen_range(800_000..2_000_000);
            quote.date = date;

            let series = self.history.entry(quote.symbol.clone()).or_default();
            series.push(quote.clone());
            if series.len() > HISTORY_CAP {
                series.remove(0);
            }
        }
    }

    pub fn get_quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(&symbol.to_uppercase())
    }

    pub fn get_listing(&self, symbol: &str) -> Option<&Listing> {
        self.listings.get(&symbol.to_uppercase())
    }

    /// Case-insensitive substring match over symbols and names.
    pub fn search(&self, query: &str) -> Vec<&Listing> {
        let needle = query.to_uppercase();
        let mut matches: Vec<&Listing> = self
            .listings
            .values()
            .filter(|listing| {
                listing.symbol.contains(&needle) || listing.name.to_uppercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        matches.truncate(SEARCH_LIMIT);
        matches
    }

    /// Top gainers and losers over the last tick, five per side. Gainers are
    /// sorted by change-percent descending, losers ascending.
    pub fn movers(&self) -> Movers {
        let mut gainers = Vec::new();
        let mut losers = Vec::new();
        for quote in self.quotes.values() {
            let listing = match self.listings.get(&quote.symbol) {
                Some(listing) if !listing.is_index => listing,
                _ => continue,
            };
            let mover = Mover {
                symbol: quote.symbol.clone(),
                name: listing.name.clone(),
                price: quote.price,
                change: quote.change(),
                change_percent: quote.change_percent(),
            };
            if mover.change_percent > 0.0 {
                gainers.push(mover);
            } else {
                losers.push(mover);
            }
        }
        gainers.sort_by(|a, b| b.change_percent.partial_cmp(&a.change_percent).unwrap());
        losers.sort_by(|a, b| a.change_percent.partial_cmp(&b.change_percent).unwrap());
        gainers.truncate(MOVERS_LIMIT);
        losers.truncate(MOVERS_LIMIT);
        Movers { gainers, losers }
    }

    /// Last `points` quotes for a symbol in chronological order.
    pub fn history(&self, symbol: &str, points: usize) -> Option<Vec<Quote>> {
        let series = self.history.get(&symbol.to_uppercase())?;
        let start = series.len().saturating_sub(points);
        Some(series[start..].to_vec())
    }

    /// Non-index instruments, the trading dashboard's default watchlist.
    pub fn popular(&self) -> Vec<&Quote> {
        let mut quotes: Vec<&Quote> = self
            .quotes
            .values()
            .filter(|quote| {
                self.listings
                    .get(&quote.symbol)
                    .map(|listing| !listing.is_index)
                    .unwrap_or(false)
            })
            .collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        quotes
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.listings.keys().map(|symbol| symbol.as_str()).collect()
    }
}

impl Default for Market {
    fn default() -> Self {
        Self::with_default_listings(0)
    }
}
