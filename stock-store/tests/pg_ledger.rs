//! Integration tests for the PostgreSQL stock ledger.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p stock-store --features postgres`

#![cfg(feature = "postgres")]

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use stock_domain::{IdempotencyKey, StockLevel};
use stock_store::{PgStockLedger, StockLedger, StoreError};
use uuid::Uuid;

fn level(n: i64) -> StockLevel {
    StockLevel::new(n).unwrap()
}

#[sqlx::test(migrations = "../migrations")]
async fn test_adjust_scenario(pool: PgPool) {
    let ledger = PgStockLedger::new(Arc::new(pool));
    let id = Uuid::now_v7();

    ledger.set(id, level(5)).await.unwrap();

    let receipt = ledger.adjust(id, -3, None).await.unwrap();
    assert_eq!(receipt.new_quantity, level(2));

    let err = ledger.adjust(id, -3, None).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock { available, .. } if available == level(2)));
    assert_eq!(ledger.read(id).await.unwrap(), level(2));

    let receipt = ledger.adjust(id, 1, None).await.unwrap();
    assert_eq!(receipt.new_quantity, level(3));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_unknown_product(pool: PgPool) {
    let ledger = PgStockLedger::new(Arc::new(pool));
    let id = Uuid::now_v7();

    assert!(matches!(ledger.read(id).await, Err(StoreError::NotFound { .. })));
    assert!(matches!(ledger.adjust(id, -1, None).await, Err(StoreError::NotFound { .. })));
    assert!(matches!(ledger.remove(id).await, Err(StoreError::NotFound { .. })));

    let receipt = ledger.adjust(id, 7, None).await.unwrap();
    assert_eq!(receipt.new_quantity, level(7));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_provision_and_remove(pool: PgPool) {
    let ledger = PgStockLedger::new(Arc::new(pool));
    let id = Uuid::now_v7();

    assert!(ledger.provision(id, level(4)).await.unwrap());
    assert!(!ledger.provision(id, level(40)).await.unwrap());
    assert_eq!(ledger.read(id).await.unwrap(), level(4));

    ledger.remove(id).await.unwrap();
    assert!(ledger.find_record(id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../migrations")]
async fn test_idempotent_adjust(pool: PgPool) {
    let ledger = PgStockLedger::new(Arc::new(pool));
    let id = Uuid::now_v7();
    let key = IdempotencyKey::new(format!("order-{}", Uuid::now_v7())).unwrap();

    ledger.set(id, level(10)).await.unwrap();

    let first = ledger.adjust(id, -4, Some(&key)).await.unwrap();
    let replay = ledger.adjust(id, -4, Some(&key)).await.unwrap();
    assert!(!first.replayed);
    assert!(replay.replayed);
    assert_eq!(replay.new_quantity, level(6));
    assert_eq!(ledger.read(id).await.unwrap(), level(6));

    let err = ledger.adjust(id, -1, Some(&key)).await.unwrap_err();
    assert!(matches!(err, StoreError::IdempotencyConflict { .. }));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_rejected_adjust_releases_key(pool: PgPool) {
    let ledger = PgStockLedger::new(Arc::new(pool));
    let id = Uuid::now_v7();
    let key = IdempotencyKey::new("restock-retry").unwrap();

    ledger.set(id, level(1)).await.unwrap();
    assert!(ledger.adjust(id, -2, Some(&key)).await.is_err());

    ledger.set(id, level(3)).await.unwrap();
    let receipt = ledger.adjust(id, -2, Some(&key)).await.unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.new_quantity, level(1));
}

#[sqlx::test(migrations = "../migrations")]
async fn test_concurrent_decrements_never_oversell(pool: PgPool) {
    let ledger = Arc::new(PgStockLedger::new(Arc::new(pool)));
    let id = Uuid::now_v7();
    ledger.set(id, level(10)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..30 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.adjust(id, -1, None).await }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(StoreError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(rejected, 20);
    assert_eq!(ledger.read(id).await.unwrap(), StockLevel::ZERO);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_cancelled_adjust_leaves_no_effect(pool: PgPool) {
    let ledger = PgStockLedger::new(Arc::new(pool));
    let id = Uuid::now_v7();
    let key = IdempotencyKey::new("checkout-cancelled").unwrap();
    ledger.set(id, level(5)).await.unwrap();

    // Hold the row lock so the adjust parks after claiming its key.
    let mut blocker = ledger.pool().begin().await.unwrap();
    sqlx::query("SELECT quantity_on_hand FROM product_stock WHERE product_id = $1 FOR UPDATE")
        .bind(id)
        .fetch_one(&mut *blocker)
        .await
        .unwrap();

    let attempt = tokio::time::timeout(Duration::from_millis(200), ledger.adjust(id, -1, Some(&key))).await;
    assert!(attempt.is_err());

    blocker.rollback().await.unwrap();

    assert_eq!(ledger.read(id).await.unwrap(), level(5));
    let receipts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_adjustments WHERE idempotency_key = $1")
        .bind(key.as_str())
        .fetch_one(ledger.pool())
        .await
        .unwrap();
    assert_eq!(receipts, 0);

    let receipt = ledger.adjust(id, -1, Some(&key)).await.unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.new_quantity, level(4));
}
