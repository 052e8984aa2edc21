//! Perfume Commerce - Self-hosted Perfume Retail Backend

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perfume_commerce::config::AppConfig;
use perfume_commerce::http::{self, AppState};
use perfume_commerce::notify::LogNotifier;
use perfume_commerce::service::{OrderService, PricingResolver, RefundService, StatusSimulator};
use perfume_commerce::store::{CartStore, DiscountStore, OrderStore, PerfumeStore, RefundStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let perfumes = PerfumeStore::new(db.clone());
    let discounts = DiscountStore::new(db.clone());
    let carts = CartStore::new(db.clone());
    let order_store = OrderStore::new(db.clone());
    let refund_store = RefundStore::new(db.clone());
    let pricing = PricingResolver::new(discounts.clone());
    let orders = OrderService::new(
        db.clone(),
        order_store.clone(),
        perfumes.clone(),
        carts.clone(),
        pricing,
        Arc::new(LogNotifier),
    );
    let refunds = RefundService::new(
        db.clone(),
        order_store.clone(),
        perfumes.clone(),
        refund_store,
        config.refund_window_days,
    );

    let simulator = StatusSimulator::spawn(order_store, config.simulator.clone());

    let app = http::router(AppState { perfumes, discounts, carts, orders, refunds })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("perfume-commerce listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    simulator.shutdown().await;
    Ok(())
}
