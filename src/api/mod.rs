//! API layer
//!
//! HTTP handlers outside the sign-in flow:
//! - Home page
//! - Metrics (Prometheus)

mod home;
pub mod metrics;

pub use home::home_router;
pub use metrics::metrics_router;
