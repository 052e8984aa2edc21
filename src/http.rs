//! HTTP surface
//!
//! Thin axum handlers over the service layer. Session issuance is an
//! external capability; the caller identity arrives as an `x-user-id`
//! header set by the gateway.

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::discount::Discount;
use crate::domain::order::{Address, Order};
use crate::domain::perfume::{Perfume, Variant};
use crate::domain::refund::{RefundRequest, RequestedItem};
use crate::error::{AppError, Result};
use crate::service::{CheckoutInput, OrderService, RefundService};
use crate::store::{CartLine, CartStore, DiscountStore, PerfumeStore};

#[derive(Clone)]
pub struct AppState {
    pub perfumes: PerfumeStore,
    pub discounts: DiscountStore,
    pub carts: CartStore,
    pub orders: OrderService,
    pub refunds: RefundService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "perfume-commerce"})) }),
        )
        .route("/api/v1/perfumes", get(list_perfumes).post(create_perfume))
        .route("/api/v1/perfumes/:id", get(get_perfume))
        .route("/api/v1/discounts", get(list_discounts).post(create_discount))
        .route("/api/v1/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/orders", get(list_orders).post(checkout))
        .route("/api/v1/orders/:id", get(get_order).delete(cancel_order))
        .route(
            "/api/v1/orders/:id/refund-requests",
            get(list_order_refunds).post(create_refund),
        )
        .route("/api/v1/refund-requests/pending", get(list_pending_refunds))
        .route("/api/v1/refund-requests/:id/approve", post(approve_refund))
        .route("/api/v1/refund-requests/:id/reject", post(reject_refund))
        .with_state(state)
}

/// Caller identity from the `x-user-id` header.
pub struct UserId(pub Uuid);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(UserId)
            .ok_or_else(|| AppError::client("missing or invalid x-user-id header"))
    }
}

// ---- catalog ----

async fn list_perfumes(State(s): State<AppState>) -> Result<Json<Vec<Perfume>>> {
    Ok(Json(s.perfumes.list_active().await?))
}

async fn get_perfume(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Perfume>> {
    Ok(Json(s.perfumes.get(id).await?))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VariantBody {
    pub volume: i32,
    pub price: Decimal,
    pub stock: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePerfumeRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub brand: String,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub variants: Vec<VariantBody>,
}

async fn create_perfume(
    State(s): State<AppState>,
    Json(req): Json<CreatePerfumeRequest>,
) -> Result<(StatusCode, Json<Perfume>)> {
    req.validate().map_err(|e| AppError::client(e.to_string()))?;
    let perfume = Perfume {
        id: Uuid::now_v7(),
        name: req.name,
        brand: req.brand,
        description: req.description,
        active: true,
        variants: req
            .variants
            .into_iter()
            .map(|v| Variant { volume: v.volume, price: v.price, stock: v.stock, active: true })
            .collect(),
        created_at: Utc::now(),
    };
    s.perfumes.insert(&perfume).await?;
    Ok((StatusCode::CREATED, Json(perfume)))
}

// ---- discounts ----

async fn list_discounts(State(s): State<AppState>) -> Result<Json<Vec<Discount>>> {
    Ok(Json(s.discounts.list().await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub perfume_ids: Vec<Uuid>,
    pub rate: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

async fn create_discount(
    State(s): State<AppState>,
    Json(req): Json<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<Discount>)> {
    req.validate().map_err(|e| AppError::client(e.to_string()))?;
    if req.rate <= Decimal::ZERO || req.rate >= Decimal::ONE_HUNDRED {
        return Err(AppError::client("discount rate must be between 0 and 100"));
    }
    if req.ends_at <= req.starts_at {
        return Err(AppError::client("discount window is empty"));
    }
    let discount = Discount {
        id: Uuid::now_v7(),
        name: req.name,
        perfume_ids: req.perfume_ids,
        rate: req.rate,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        active: true,
    };
    s.discounts.insert(&discount).await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

// ---- cart ----

async fn get_cart(State(s): State<AppState>, UserId(user): UserId) -> Result<Json<Vec<CartLine>>> {
    Ok(Json(s.carts.details(user).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub perfume_id: Uuid,
    pub volume: i32,
    pub quantity: i32,
}

async fn add_to_cart(
    State(s): State<AppState>,
    UserId(user): UserId,
    Json(req): Json<AddToCartRequest>,
) -> Result<StatusCode> {
    if req.quantity < 1 {
        return Err(AppError::client("quantity must be at least 1"));
    }
    // Reject unknown perfume/volume pairs up front; checkout re-checks.
    let perfume = s.perfumes.get(req.perfume_id).await?;
    if perfume.variant(req.volume).is_none() {
        return Err(AppError::client(format!(
            "invalid volume {}ml for perfume {}",
            req.volume, perfume.name
        )));
    }
    s.carts
        .add(user, &CartLine { perfume_id: req.perfume_id, volume: req.volume, quantity: req.quantity })
        .await?;
    Ok(StatusCode::CREATED)
}

async fn clear_cart(State(s): State<AppState>, UserId(user): UserId) -> Result<StatusCode> {
    s.carts.clear(user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- orders ----

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(email)]
    pub email: String,
    pub shipping_address: Address,
    pub tax_id: Option<String>,
    #[validate(length(min = 12, max = 23))]
    pub card_number: String,
    #[validate(length(min = 1))]
    pub card_holder: String,
    #[validate(length(min = 4, max = 7))]
    pub card_expiry: String,
    #[validate(length(min = 3, max = 4))]
    pub card_cvc: String,
}

async fn checkout(
    State(s): State<AppState>,
    UserId(user): UserId,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    req.validate().map_err(|e| AppError::client(e.to_string()))?;
    let order = s
        .orders
        .checkout(
            user,
            CheckoutInput {
                email: req.email,
                shipping_address: req.shipping_address,
                tax_id: req.tax_id,
                card_number: req.card_number,
                card_holder: req.card_holder,
                card_expiry: req.card_expiry,
                card_cvc: req.card_cvc,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(s): State<AppState>, UserId(user): UserId) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_for_user(user).await?))
}

async fn get_order(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    Ok(Json(s.orders.get(id, user).await?))
}

async fn cancel_order(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    s.orders.cancel(id, user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- refunds ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRefundRequest {
    #[validate(length(min = 1))]
    pub items: Vec<RequestedItem>,
}

async fn create_refund(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CreateRefundRequest>,
) -> Result<(StatusCode, Json<RefundRequest>)> {
    req.validate().map_err(|e| AppError::client(e.to_string()))?;
    let request = s.refunds.create(order_id, user, req.items).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_order_refunds(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<RefundRequest>>> {
    Ok(Json(s.refunds.list_for_order(order_id, user).await?))
}

async fn list_pending_refunds(State(s): State<AppState>) -> Result<Json<Vec<RefundRequest>>> {
    Ok(Json(s.refunds.list_pending().await?))
}

async fn approve_refund(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.refunds.approve(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRefundRequest {
    #[validate(length(min = 1))]
    pub reason: String,
}

async fn reject_refund(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRefundRequest>,
) -> Result<StatusCode> {
    req.validate().map_err(|e| AppError::client(e.to_string()))?;
    s.refunds.reject(id, &req.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}
