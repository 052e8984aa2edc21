//! Postgres persistence layer

mod carts;
mod discounts;
mod orders;
mod perfumes;
mod refunds;

pub use carts::{CartLine, CartStore};
pub use discounts::DiscountStore;
pub use orders::OrderStore;
pub use perfumes::PerfumeStore;
pub use refunds::RefundStore;
