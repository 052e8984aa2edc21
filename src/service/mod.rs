//! Service layer: orchestration between HTTP, domain, and storage.

pub mod orders;
pub mod pricing;
pub mod refunds;
pub mod simulator;

pub use orders::{CheckoutInput, OrderService};
pub use pricing::PricingResolver;
pub use refunds::RefundService;
pub use simulator::StatusSimulator;
