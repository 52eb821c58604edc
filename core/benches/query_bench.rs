use criterion::{criterion_group, criterion_main, Criterion};
use quarry::{Engine, MemorySource, PorterStemmer, SearchConfig, SearchMode};

fn corpus() -> MemorySource {
    let text = include_str!("../README.md");
    let paragraphs: Vec<&str> = text.split("\n\n").filter(|p| !p.trim().is_empty()).collect();
    // repeat the paragraphs so posting lists get some length
    MemorySource::from_bodies((0..50).flat_map(|_| paragraphs.iter().copied()))
}

fn bench_queries(c: &mut Criterion) {
    let source = corpus();
    let engine = Engine::build(&source, Box::new(PorterStemmer::default()), SearchConfig::default(), |_| {})
        .expect("bench corpus builds");

    c.bench_function("boolean_and", |b| b.iter(|| engine.evaluate("index query", SearchMode::Boolean)));
    c.bench_function("boolean_phrase", |b| b.iter(|| engine.evaluate("\"inverted index\"", SearchMode::Boolean)));
    c.bench_function("boolean_wildcard", |b| b.iter(|| engine.evaluate("pos* + wild*", SearchMode::Boolean)));
    c.bench_function("ranked_top10", |b| b.iter(|| engine.evaluate("ranked query over postings", SearchMode::Ranked)));
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
