use criterion::{criterion_group, criterion_main, Criterion};
use tally::{Ledger, LedgerConfig};

fn parse_text_ledger(path: &str, config: &LedgerConfig) -> Ledger {
    let (ledger, _) = Ledger::from_file(path, config);
    ledger
}

fn criterion_benchmark(c: &mut Criterion) {
    let input = std::env::var("TALLY_BENCH_INPUT").unwrap();
    let config = LedgerConfig::default();
    c.bench_function("Parse text", |b| b.iter(|| parse_text_ledger(&input, &config)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
