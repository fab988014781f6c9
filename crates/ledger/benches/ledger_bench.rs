use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Item, OrderStatus, StockLevel};
use ledger::{
    InMemoryOrdersRepository, InMemoryStocksStorage, OrdersRepository, Sku, SkuCounts,
    StocksStorage, UserId,
};

fn stocked(skus: u32) -> InMemoryStocksStorage {
    InMemoryStocksStorage::with_stocks(
        (1..=skus).map(|sku| (Sku::new(sku), StockLevel::new(u32::MAX, 0).unwrap())),
    )
}

fn bench_reserve_single(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = stocked(1);

    c.bench_function("ledger/reserve_single", |b| {
        b.iter(|| {
            rt.block_on(async {
                storage.reserve(Sku::new(1), 1).await.unwrap();
                storage
                    .rollback_reservation(&SkuCounts::from([(Sku::new(1), 1)]))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_consume_batch_10(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = stocked(10);
    let items: SkuCounts = (1..=10).map(|sku| (Sku::new(sku), 1)).collect();

    c.bench_function("ledger/consume_batch_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                for &sku in items.keys() {
                    storage.reserve(sku, 1).await.unwrap();
                }
                storage.consume_on_pay(&items).await.unwrap();
                storage.restore_consumed(&items).await.unwrap();
                storage.rollback_reservation(&items).await.unwrap();
            });
        });
    });
}

fn bench_order_create_and_transition(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orders = InMemoryOrdersRepository::new();

    c.bench_function("ledger/order_create_and_transition", |b| {
        b.iter(|| {
            rt.block_on(async {
                let id = orders
                    .create(UserId::new(1), vec![Item::new(1, 2), Item::new(2, 1)])
                    .await
                    .unwrap();
                orders
                    .transition(id, OrderStatus::New, OrderStatus::AwaitingPayment)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_reserve_single,
    bench_consume_batch_10,
    bench_order_create_and_transition
);
criterion_main!(benches);
