//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Provider callbacks by outcome ("success" / "failure")
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("socialgate_logins_total", "Total number of provider login attempts"),
        &["provider", "outcome"]
    ).expect("metric can be created");

    /// Users created by the identity resolver
    pub static ref USERS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("socialgate_users_created_total", "Total number of users created"),
        &["provider"]
    ).expect("metric can be created");

    /// Stored users per provider, refreshed on scrape
    pub static ref USERS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("socialgate_users", "Number of stored users"),
        &["provider"]
    ).expect("metric can be created");

    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("socialgate_errors_total", "Total number of errors returned to clients"),
        &["type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(LOGINS_TOTAL.clone()))
            .expect("LOGINS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(USERS_CREATED_TOTAL.clone()))
            .expect("USERS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(USERS.clone()))
            .expect("USERS can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_metrics_is_idempotent() {
        init_metrics();
        init_metrics();

        LOGINS_TOTAL.with_label_values(&["github", "success"]).inc();
        let names: Vec<String> = REGISTRY
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"socialgate_logins_total".to_string()));
    }
}
