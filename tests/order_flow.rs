//! End-to-end order and refund flows against a live database.
//!
//! Requires `DATABASE_URL` pointing at a disposable Postgres instance;
//! run with `cargo test -- --ignored`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use perfume_commerce::domain::order::{Address, Order, OrderStatus, PaymentStatus};
use perfume_commerce::domain::perfume::{Perfume, Variant};
use perfume_commerce::domain::refund::{RefundStatus, RequestedItem};
use perfume_commerce::error::AppError;
use perfume_commerce::notify::Notifier;
use perfume_commerce::service::{CheckoutInput, OrderService, PricingResolver, RefundService};
use perfume_commerce::store::{
    CartLine, CartStore, DiscountStore, OrderStore, PerfumeStore, RefundStore,
};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_invoice_email(&self, order: &Order, _document: &[u8]) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(order.id);
        Ok(())
    }
}

struct Harness {
    pool: PgPool,
    perfumes: PerfumeStore,
    carts: CartStore,
    order_store: OrderStore,
    refund_store: RefundStore,
    orders: OrderService,
    refunds: RefundService,
    notifier: Arc<RecordingNotifier>,
}

async fn harness() -> Harness {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let perfumes = PerfumeStore::new(pool.clone());
    let discounts = DiscountStore::new(pool.clone());
    let carts = CartStore::new(pool.clone());
    let order_store = OrderStore::new(pool.clone());
    let refund_store = RefundStore::new(pool.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let orders = OrderService::new(
        pool.clone(),
        order_store.clone(),
        perfumes.clone(),
        carts.clone(),
        PricingResolver::new(discounts),
        notifier.clone(),
    );
    let refunds = RefundService::new(
        pool.clone(),
        order_store.clone(),
        perfumes.clone(),
        refund_store.clone(),
        30,
    );
    Harness { pool, perfumes, carts, order_store, refund_store, orders, refunds, notifier }
}

async fn seed_perfume(h: &Harness, stock: i32, price: Decimal) -> Perfume {
    let perfume = Perfume {
        id: Uuid::now_v7(),
        name: "Vetiver Sauvage".into(),
        brand: "Maison Test".into(),
        description: None,
        active: true,
        variants: vec![Variant { volume: 50, price, stock, active: true }],
        created_at: Utc::now(),
    };
    h.perfumes.insert(&perfume).await.unwrap();
    perfume
}

fn checkout_input() -> CheckoutInput {
    CheckoutInput {
        email: "buyer@example.com".into(),
        shipping_address: Address {
            name: "Buyer".into(),
            street: "1 Rue de Test".into(),
            city: "Paris".into(),
            zip: "75001".into(),
            country: "FR".into(),
            phone: None,
        },
        tax_id: None,
        card_number: "4111111111111111".into(),
        card_holder: "Buyer".into(),
        card_expiry: "12/27".into(),
        card_cvc: "123".into(),
    }
}

async fn stock_of(h: &Harness, perfume_id: Uuid) -> i32 {
    h.perfumes.get(perfume_id).await.unwrap().variant(50).unwrap().stock
}

async fn force_delivered(pool: &PgPool, order_id: Uuid) {
    sqlx::query("UPDATE orders SET status = 'DELIVERED', payment_status = 'COMPLETED' WHERE id = $1")
        .bind(order_id)
        .execute(pool)
        .await
        .unwrap();
}

fn item(perfume_id: Uuid, quantity: i32) -> RequestedItem {
    RequestedItem { perfume_id, volume: 50, quantity }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn empty_cart_checkout_creates_nothing() {
    let h = harness().await;
    let user = Uuid::new_v4();
    let perfume = seed_perfume(&h, 10, Decimal::new(10000, 2)).await;

    let err = h.orders.checkout(user, checkout_input()).await.unwrap_err();
    assert!(matches!(err, AppError::Client(_)));

    assert!(h.order_store.list_for_user(user).await.unwrap().is_empty());
    assert_eq!(stock_of(&h, perfume.id).await, 10);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn stock_decrements_on_checkout_and_restores_on_full_refund() {
    let h = harness().await;
    let user = Uuid::new_v4();
    let perfume = seed_perfume(&h, 10, Decimal::new(10000, 2)).await;
    h.carts
        .add(user, &CartLine { perfume_id: perfume.id, volume: 50, quantity: 2 })
        .await
        .unwrap();

    let order = h.orders.checkout(user, checkout_input()).await.unwrap();
    assert_eq!(stock_of(&h, perfume.id).await, 8);
    assert_eq!(order.total_amount, Decimal::new(20000, 2));
    assert!(h.carts.details(user).await.unwrap().is_empty());

    force_delivered(&h.pool, order.id).await;
    let request = h.refunds.create(order.id, user, vec![item(perfume.id, 2)]).await.unwrap();
    h.refunds.approve(request.id).await.unwrap();

    assert_eq!(stock_of(&h, perfume.id).await, 10);
    let order = h.order_store.get(order.id).await.unwrap();
    assert!(order.lines.is_empty());
    assert_eq!(order.status, OrderStatus::Refunded);
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert_eq!(order.total_amount, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn concurrent_approvals_on_one_order_serialize() {
    let h = harness().await;
    let user = Uuid::new_v4();
    let first = seed_perfume(&h, 10, Decimal::new(10000, 2)).await;
    let second = seed_perfume(&h, 10, Decimal::new(6000, 2)).await;
    h.carts
        .add(user, &CartLine { perfume_id: first.id, volume: 50, quantity: 1 })
        .await
        .unwrap();
    h.carts
        .add(user, &CartLine { perfume_id: second.id, volume: 50, quantity: 1 })
        .await
        .unwrap();

    let order = h.orders.checkout(user, checkout_input()).await.unwrap();
    force_delivered(&h.pool, order.id).await;

    // Non-overlapping perfumes, so the duplicate guard permits both.
    let a = h.refunds.create(order.id, user, vec![item(first.id, 1)]).await.unwrap();
    let b = h.refunds.create(order.id, user, vec![item(second.id, 1)]).await.unwrap();

    let (ra, rb) = tokio::join!(h.refunds.approve(a.id), h.refunds.approve(b.id));
    ra.unwrap();
    rb.unwrap();

    // Neither approval may resurrect the other's refunded line.
    let order = h.order_store.get(order.id).await.unwrap();
    assert!(order.lines.is_empty());
    assert_eq!(order.total_amount, Decimal::ZERO);
    assert_eq!(order.status, OrderStatus::Refunded);
    assert_eq!(stock_of(&h, first.id).await, 10);
    assert_eq!(stock_of(&h, second.id).await, 10);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn ownership_is_checked_before_the_duplicate_guard() {
    let h = harness().await;
    let user = Uuid::new_v4();
    let perfume = seed_perfume(&h, 10, Decimal::new(10000, 2)).await;
    h.carts
        .add(user, &CartLine { perfume_id: perfume.id, volume: 50, quantity: 1 })
        .await
        .unwrap();
    let order = h.orders.checkout(user, checkout_input()).await.unwrap();
    force_delivered(&h.pool, order.id).await;
    h.refunds.create(order.id, user, vec![item(perfume.id, 1)]).await.unwrap();

    // A stranger probing the order id must hit the ownership error,
    // not learn that a refund request already exists.
    let err = h
        .refunds
        .create(order.id, Uuid::new_v4(), vec![item(perfume.id, 1)])
        .await
        .unwrap_err();
    match err {
        AppError::Client(msg) => assert!(msg.contains("does not belong")),
        other => panic!("expected client error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn rejection_records_reason_and_leaves_order_untouched() {
    let h = harness().await;
    let user = Uuid::new_v4();
    let perfume = seed_perfume(&h, 10, Decimal::new(10000, 2)).await;
    h.carts
        .add(user, &CartLine { perfume_id: perfume.id, volume: 50, quantity: 2 })
        .await
        .unwrap();
    let order = h.orders.checkout(user, checkout_input()).await.unwrap();
    force_delivered(&h.pool, order.id).await;

    let request = h.refunds.create(order.id, user, vec![item(perfume.id, 1)]).await.unwrap();
    h.refunds.reject(request.id, "item was used").await.unwrap();

    let request = h.refund_store.get(request.id).await.unwrap();
    assert_eq!(request.status, RefundStatus::Rejected);
    assert_eq!(request.rejection_reason.as_deref(), Some("item was used"));
    assert!(request.processed_at.is_some());

    let order = h.order_store.get(order.id).await.unwrap();
    assert_eq!(order.lines[0].quantity, 2);
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(stock_of(&h, perfume.id).await, 8);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn resolving_unknown_refund_is_not_found() {
    let h = harness().await;
    let err = h.refunds.reject(Uuid::new_v4(), "whatever").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = h.refunds.approve(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
