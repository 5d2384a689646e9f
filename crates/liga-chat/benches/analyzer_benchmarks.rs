//! Benchmarks for question classification and evaluation.
//!
//! Classification runs on every prompt, and evaluation scans a whole table,
//! so both should stay well under a millisecond for a typical sheet of a
//! few hundred sellers.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use liga_chat::{QueryAnalyzer, QueryKind};
use liga_table::{Table, Value};

const QUESTIONS: &[&str] = &[
    "رتبه ۱ کیه",
    "رتبه سوم کیست؟",
    "۵ نفر اول",
    "نفرات برتر",
    "رتبه من چنده",
    "فاصله من تا نفر اول",
    "Who is rank 2?",
    "top 10",
    "میانگین فروش ماه قبل چقدر بود؟",
];

/// A seller table with `rows` rows, ranks shuffled by a fixed stride.
fn generate_table(rows: usize) -> Table {
    let data = (0..rows)
        .map(|i| {
            let rank = ((i * 7919) % rows) as i64 + 1;
            vec![
                Value::from(rank),
                Value::from(format!("First{}", i)),
                Value::from(format!("Last{}", i)),
                Value::from(format!("E{}", i)),
                Value::from((rows as i64 - rank) as f64 * 10.0),
            ]
        })
        .collect();
    Table::new(
        "T1",
        ["رتبه", "نام", "نام خانوادگی", "کد پرسنلی", "فروش"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        data,
    )
    .expect("valid benchmark table")
}

fn bench_classify(c: &mut Criterion) {
    let analyzer = QueryAnalyzer::default();

    let mut group = c.benchmark_group("classify");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("mixed_questions", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let kind = analyzer.classify(QUESTIONS[idx % QUESTIONS.len()]);
            idx += 1;
            kind
        });
    });

    group.finish();
}

fn bench_answer(c: &mut Criterion) {
    let analyzer = QueryAnalyzer::default();
    let table = generate_table(500);

    let mut group = c.benchmark_group("answer_500_rows");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("rank_at", |b| {
        b.iter(|| analyzer.answer(QueryKind::RankAt(250), "", &table, None));
    });

    group.bench_function("top_n", |b| {
        b.iter(|| analyzer.answer(QueryKind::TopN(10), "", &table, None));
    });

    group.bench_function("distance", |b| {
        b.iter(|| {
            analyzer.answer(
                QueryKind::Distance { target_rank: 1 },
                "",
                &table,
                Some("E499"),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_answer);
criterion_main!(benches);
