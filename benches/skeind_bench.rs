//! Criterion benchmarks for hot paths in skeind.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - Title cleaning/validation (regex pipeline, called on every folio create)
//!   - Mention parsing (regex, called on every folio create)
//!   - Relative-time parsing (used by /activity, /logs, search)
//!   - Shard name validation and sequence bookkeeping

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skeind::identity::{content_hash, parse_mentions, parse_relative_time};
use skeind::shard::naming::{next_sequence, validate_shard_name};

fn bench_title_validation(c: &mut Criterion) {
    let clean = "Implement the new feature and add tests for edge cases";
    let messy = "  \t  Implement   the\nnew feature!!!   \n\n  ";

    c.bench_function("validate_title_clean", |b| {
        b.iter(|| {
            let r = skeind::artifact::title::validate_title(black_box(clean), black_box("brief"));
            black_box(r).ok();
        });
    });

    c.bench_function("validate_title_messy", |b| {
        b.iter(|| {
            let r = skeind::artifact::title::validate_title(black_box(messy), black_box("brief"));
            black_box(r).ok();
        });
    });
}

fn bench_mention_parsing(c: &mut Criterion) {
    let no_mentions = "Rewrote the storage layer to use file-per-record persistence.";
    let many_mentions = "@alice please review, cc @bob @charlotte and loop in @dmitri-k if @eve-42 is unavailable.";

    c.bench_function("parse_mentions_none", |b| {
        b.iter(|| black_box(parse_mentions(black_box(no_mentions))));
    });

    c.bench_function("parse_mentions_many", |b| {
        b.iter(|| black_box(parse_mentions(black_box(many_mentions))));
    });
}

fn bench_relative_time(c: &mut Criterion) {
    use chrono::{TimeZone, Utc};
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();

    c.bench_function("parse_relative_time_hours", |b| {
        b.iter(|| black_box(parse_relative_time(black_box("2h"), now)).ok());
    });

    c.bench_function("parse_relative_time_rfc3339", |b| {
        b.iter(|| black_box(parse_relative_time(black_box("2026-07-25T00:00:00Z"), now)).ok());
    });
}

fn bench_content_hash(c: &mut Criterion) {
    let parts = ["brief-20260727-a1b2", "Implement the feature", "Some longer body content describing the change in detail."];
    c.bench_function("content_hash_three_parts", |b| {
        b.iter(|| black_box(content_hash(black_box(&parts))));
    });
}

fn bench_shard_naming(c: &mut Criterion) {
    c.bench_function("validate_shard_name_valid", |b| {
        b.iter(|| black_box(validate_shard_name(black_box("feature-auth-rework"))).ok());
    });

    c.bench_function("validate_shard_name_rejected", |b| {
        b.iter(|| black_box(validate_shard_name(black_box("HEAD"))).is_err());
    });

    let sequences: Vec<u32> = (1..=200).collect();
    c.bench_function("next_sequence_200_existing", |b| {
        b.iter(|| black_box(next_sequence(black_box(&sequences))).ok());
    });
}

criterion_group!(
    benches,
    bench_title_validation,
    bench_mention_parsing,
    bench_relative_time,
    bench_content_hash,
    bench_shard_naming
);
criterion_main!(benches);
