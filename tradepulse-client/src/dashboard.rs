//! Dashboard aggregation: independent reads issued concurrently, each
//! section degrading to empty on failure instead of failing the view.

use futures::future::join_all;

use tradepulse::market::{Movers, INDEX_PROXIES};
use tradepulse_http::http::v1::{Client, PortfolioSummary, StockInfo};

/// Curated stories compiled into the binary. This is placeholder content,
/// not a live feed.
#[derive(Clone, Copy, Debug)]
pub struct NewsItem {
    pub headline: &'static str,
    pub source: &'static str,
    pub summary: &'static str,
}

pub const CURATED_NEWS: &[NewsItem] = &[
    NewsItem {
        headline: "Markets steady as earnings season opens",
        source: "TradePulse Desk",
        summary: "Index futures held their range ahead of a heavy week of large-cap reports.",
    },
    NewsItem {
        headline: "Chipmakers extend their run on data-center demand",
        source: "TradePulse Desk",
        summary: "Semiconductor names led gainers again as cloud capital spending stays strong.",
    },
    NewsItem {
        headline: "Retail investors keep rotating into index funds",
        source: "TradePulse Desk",
        summary: "Flows into broad-market ETFs outpaced single-name buying for a third month.",
    },
];

#[derive(Debug)]
pub struct DashboardSnapshot {
    pub movers: Movers,
    pub indices: Vec<StockInfo>,
    pub summary: Option<PortfolioSummary>,
    pub news: &'static [NewsItem],
}

/// Issues the three reads concurrently and combines whatever arrived. A
/// failed section is logged and rendered empty; other sections are
/// unaffected.
pub async fn load_dashboard<C: Client>(client: &C, token: &str) -> DashboardSnapshot {
    let (movers, indices, summary) = futures::join!(
        client.market_movers(),
        fetch_index_quotes(client),
        client.portfolio_summary(token),
    );

    let movers = movers.unwrap_or_else(|err| {
        log::warn!("market movers unavailable: {err}");
        Movers::default()
    });
    let summary = summary
        .map_err(|err| log::warn!("portfolio summary unavailable: {err}"))
        .ok();

    DashboardSnapshot {
        movers,
        indices,
        summary,
        news: CURATED_NEWS,
    }
}

async fn fetch_index_quotes<C: Client>(client: &C) -> Vec<StockInfo> {
    let fetches = INDEX_PROXIES
        .iter()
        .map(|(symbol, _, _)| client.stock_info(symbol));
    join_all(fetches)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(info) => Some(info),
            Err(err) => {
                log::warn!("index quote unavailable: {err}");
                None
            }
        })
        .collect()
}
