use cds_request::{combine, partition, BoundingBox, ResolvedArea, TimeSpan};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;

fn locations() -> (Vec<String>, Vec<ResolvedArea>) {
    let names = ["Rome", "London", "Hamburg", "Paris"];
    let area = ResolvedArea::from_original(BoundingBox::new(42.05, 41.77, 12.66, 12.34), 10.0, 2);
    (
        names.iter().map(|n| n.to_string()).collect(),
        vec![area; names.len()],
    )
}

fn bench_partition(c: &mut Criterion) {
    let (names, areas) = locations();
    let timeframes = TimeSpan::parse_pairs(&[
        "2021-10-05",
        "2022-09-20",
        "1990-01-01",
        "2020-12-31",
        "2024-02-29",
        "2024-02-29",
    ])
    .unwrap();

    c.bench_function("partition_cross_product", |b| {
        b.iter(|| partition(black_box(&names), black_box(&timeframes), "t2m", &areas))
    });
}

fn bench_combine(c: &mut Criterion) {
    let (names, areas) = locations();
    let timeframes = TimeSpan::parse_pairs(&["2021-01-15", "2021-12-20"]).unwrap();
    let filled: Vec<_> = partition(&names, &timeframes, "t2m", &areas)
        .into_iter()
        .map(|sub| {
            let start = sub.timeframe.start_date();
            let dates: Vec<NaiveDate> = (0..sub.timeframe.total_days())
                .map(|i| start + Duration::days(i))
                .collect();
            let values = vec![280.0; dates.len()];
            let frame = df!("time" => dates, "t2m" => values).unwrap();
            sub.with_data(frame)
        })
        .collect();

    c.bench_function("combine_month_fragments", |b| {
        b.iter(|| combine(black_box(filled.clone())).unwrap())
    });
}

criterion_group!(benches, bench_partition, bench_combine);
criterion_main!(benches);
