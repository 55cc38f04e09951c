use criterion::{Criterion, criterion_group, criterion_main};
use nawth::db::{FilterSet, Pagination, build_filter};
use serde_json::json;
use std::hint::black_box;

fn bench_build_filter(c: &mut Criterion) {
    let set = FilterSet::new()
        .eq("category_id", "cat_1700000000000_abcdef012345")
        .gt("price", 10)
        .lt("price", 500)
        .like("title", "boost")
        .is_in("status", ["active", "pending", "completed"]);

    c.bench_function("build_filter/five_conditions", |b| {
        b.iter(|| build_filter(black_box(&set)))
    });
}

fn bench_from_suffixed(c: &mut Criterion) {
    let query = json!({
        "category_id": "cat_1",
        "price_gt": 10,
        "price_lt": 500,
        "title_like": "boost",
        "status_in": ["active", "pending"],
        "provider_id": null,
    });
    let Some(map) = query.as_object() else {
        return;
    };

    c.bench_function("from_suffixed/query_string", |b| {
        b.iter(|| FilterSet::from_suffixed(black_box(map)))
    });
}

fn bench_pagination(c: &mut Criterion) {
    c.bench_function("pagination/clamp_and_offset", |b| {
        b.iter(|| {
            let p = Pagination::new(black_box(-3), black_box(1_000));
            black_box(p.offset())
        })
    });
}

criterion_group!(
    benches,
    bench_build_filter,
    bench_from_suffixed,
    bench_pagination
);
criterion_main!(benches);
