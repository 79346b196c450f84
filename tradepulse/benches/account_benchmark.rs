use criterion::{criterion_group, criterion_main, Criterion};

use tradepulse::account::Account;
use tradepulse::market::Market;

fn trade_and_revalue_loop() {
    let mut market = Market::with_default_listings(100);
    let mut account = Account::new();

    for date in 101..121 {
        market.tick(date);
        let price = market.get_quote("AAPL").unwrap().price;
        let _ = account.execute_buy("AAPL", 10, price, date);
        let _ = account.execute_sell("AAPL", 5, price, date);
        let _ = account.position_views(&market);
        let _ = account.total_value(&market);
    }
}

fn benchmarks(c: &mut Criterion) {
    c.bench_function("trade and revalue loop", |b| b.iter(trade_and_revalue_loop));
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
