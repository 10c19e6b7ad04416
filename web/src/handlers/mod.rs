//! HTTP request handlers, one module per resource.

pub mod beds;
pub mod health;
pub mod payments;
pub mod tenants;

pub use health::health_check;
