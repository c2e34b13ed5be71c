use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

use dataset_scraper::query::resolve;

fn build_catalog(product_count: usize) -> Value {
    let categories: Vec<Value> = (0..10)
        .map(|c| {
            let products: Vec<Value> = (0..product_count / 10)
                .map(|p| {
                    json!({
                        "id": c * 1000 + p,
                        "url": format!("https://shop.example/c/{c}/p/{p}"),
                        "price": p % 50,
                        "tags": ["a", "b"]
                    })
                })
                .collect();
            json!({"name": format!("category-{c}"), "products": products})
        })
        .collect();
    json!({"catalog": {"categories": categories}})
}

fn bench_resolve(c: &mut Criterion) {
    let queries = [
        ("wildcard", "$.catalog.categories[*].products[*]"),
        ("descendant", "$..products[*]"),
        ("filter", "$..products[?(@.price < 10)]"),
        ("slice", "$.catalog.categories[1:8:2].products[0]"),
    ];

    for size in [100usize, 1_000, 10_000] {
        let document = build_catalog(size);
        for (name, query) in queries {
            c.bench_with_input(BenchmarkId::new(name, size), &document, |b, document| {
                b.iter(|| black_box(resolve(document, query).unwrap()));
            });
        }
    }
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
