use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tf_idf_join::{top_n_join, MatchConfig, Matcher, NgramVectorizer};

const FIRST: [&str; 8] = ["john", "mary", "jane", "peter", "susan", "george", "ursula", "terry"];
const LAST: [&str; 8] = ["smith", "smyth", "jones", "tolkien", "rowling", "martin", "le guin", "pratchett"];

/// Author-like names with small typos, deterministic.
fn names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let mut name = format!("{} {} {}", FIRST[i % 8], LAST[(i / 8) % 8], i / 64);
            if i % 3 == 0 {
                // 1 文字落とす
                name.remove(1);
            }
            name
        })
        .collect()
}

fn vectorize_and_join_benchmark(c: &mut Criterion) {
    let docs = names(5_000);

    c.bench_function("fit_transform", |b| {
        b.iter(|| NgramVectorizer::default().fit_transform(black_box(&docs)));
    });

    let (_, m) = NgramVectorizer::default().fit_transform(&docs);
    let t = m.transpose();
    c.bench_function("top_n_join", |b| {
        b.iter(|| top_n_join(black_box(&m), black_box(&t), 10, 0.5));
    });

    let matcher = Matcher::new(MatchConfig::new(10).lower_bound(0.5)).expect("valid config");
    c.bench_function("match_self", |b| {
        b.iter(|| matcher.match_self(black_box(&docs)));
    });
}

criterion_group!(benches, vectorize_and_join_benchmark);
criterion_main!(benches);
