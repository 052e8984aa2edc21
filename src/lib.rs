//! Perfume Commerce
//!
//! Self-hosted backend for a perfume retailer.
//!
//! ## Features
//! - Perfume catalog with per-volume variants and stock
//! - Time-bounded percentage discounts with floor-to-cent pricing
//! - Cart checkout into immutable orders with masked payment data
//! - Refund requests with proportional discount spreading
//! - Mock fulfillment simulator advancing order status in the background

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod notify;
pub mod service;
pub mod store;
