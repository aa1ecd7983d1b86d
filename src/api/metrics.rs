//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring and observability.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::AppState;
use crate::data::Provider;
use crate::error::AppError;
use crate::metrics::{REGISTRY, USERS};

/// GET /metrics
///
/// Refreshes the per-provider user gauge, then returns all metrics in
/// Prometheus text format.
async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    for provider in Provider::ALL {
        let count = state.db.count_users(Some(provider)).await?;
        USERS.with_label_values(&[provider.as_str()]).set(count);
    }

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            metrics_text,
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            Err(AppError::Internal(e.into()))
        }
    }
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
