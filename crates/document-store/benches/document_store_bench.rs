use common::DocumentId;
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::{
    Document, DocumentQuery, InMemoryDocumentStore, Version, WriteOptions, store::DocumentStore,
};

fn make_cart(user_id: DocumentId, lines: usize) -> Document {
    let lines: Vec<_> = (0..lines)
        .map(|i| {
            serde_json::json!({
                "product_id": DocumentId::new().to_string(),
                "quantity": i + 1,
                "unit_price": 1000,
                "title": format!("Product {i}"),
            })
        })
        .collect();
    Document::new(
        "carts",
        user_id,
        serde_json::json!({ "user_id": user_id.to_string(), "lines": lines }),
    )
}

fn bench_insert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("document_store/insert", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                store
                    .put(make_cart(DocumentId::new(), 3), WriteOptions::expect_new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_conditional_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let user_id = DocumentId::new();
    let mut version = rt.block_on(async {
        store
            .put(make_cart(user_id, 3), WriteOptions::expect_new())
            .await
            .unwrap()
    });

    c.bench_function("document_store/conditional_update", |b| {
        b.iter(|| {
            version = rt.block_on(async {
                store
                    .put(make_cart(user_id, 3), WriteOptions::expect_version(version))
                    .await
                    .unwrap()
            });
        });
    });
    assert!(version > Version::first());
}

fn bench_query_by_field(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let owner = DocumentId::new();
    rt.block_on(async {
        for i in 0..500 {
            let user = if i % 10 == 0 { owner } else { DocumentId::new() };
            let doc = Document::new(
                "orders",
                DocumentId::new(),
                serde_json::json!({ "user_id": user.to_string(), "total_price": i }),
            );
            store.put(doc, WriteOptions::new()).await.unwrap();
        }
    });

    c.bench_function("document_store/query_500_by_owner", |b| {
        b.iter(|| {
            rt.block_on(async {
                let query =
                    DocumentQuery::collection("orders").field_eq("user_id", owner.to_string());
                let found = store.query(query).await.unwrap();
                assert_eq!(found.len(), 50);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_conditional_update,
    bench_query_by_field
);
criterion_main!(benches);
