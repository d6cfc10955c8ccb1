//! Benchmarks for transcript parsing and locale detection.
//!
//! Run with `cargo bench`.

use chatreport::config::ReportConfig;
use chatreport::locale::LocaleSpec;
use chatreport::parse::parse_transcript;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Generates an iOS-style transcript with `count` messages.
fn generate_transcript(count: usize) -> String {
    let senders = ["Alice", "Bob", "Charlie", "Diana"];
    let mut out = String::with_capacity(count * 64);
    for i in 0..count {
        let sender = senders[i % senders.len()];
        let hour = 8 + (i / 60) % 14;
        let minute = i % 60;
        out.push_str(&format!(
            "[15.01.24, {hour:02}:{minute:02}:00] {sender}: Message number {i} with some text\n"
        ));
        if i % 7 == 0 {
            out.push_str("a continuation line for this one\n");
        }
        if i % 11 == 0 {
            out.push_str(&format!(
                "[15.01.24, {hour:02}:{minute:02}:30] {sender}: \u{200E}<attached: IMG-20240115-WA{i:04}.jpg>\n"
            ));
        }
    }
    out
}

fn bench_parse_transcript(c: &mut Criterion) {
    let config = ReportConfig::new();
    let mut group = c.benchmark_group("parse_transcript");

    for count in [100, 1_000, 10_000] {
        let transcript = generate_transcript(count);
        group.throughput(Throughput::Bytes(transcript.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &transcript,
            |b, transcript| {
                b.iter(|| parse_transcript(black_box(transcript), &config).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_parse_pinned_locale(c: &mut Criterion) {
    let config = ReportConfig::new().with_locale("eu-dot-bracketed");
    let transcript = generate_transcript(1_000);

    let mut group = c.benchmark_group("parse_pinned");
    group.throughput(Throughput::Bytes(transcript.len() as u64));
    group.bench_function("1000", |b| {
        b.iter(|| parse_transcript(black_box(&transcript), &config).unwrap());
    });
    group.finish();
}

fn bench_locale_detection(c: &mut Criterion) {
    let transcript = generate_transcript(100);
    let lines: Vec<&str> = transcript.lines().take(20).collect();

    c.bench_function("detect_locale", |b| {
        b.iter(|| LocaleSpec::detect(black_box(&lines)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_parse_transcript,
    bench_parse_pinned_locale,
    bench_locale_detection
);
criterion_main!(benches);
