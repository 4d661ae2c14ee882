use axum::Router;
use axum::routing::{get, post};
use tower::limit::ConcurrencyLimitLayer;

use super::{AppState, handlers};

/// Build the tolld router. `max_concurrent_requests` bounds in-flight requests.
pub fn create_router(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/data", post(handlers::fetch_data))
        .route("/v1/batch", post(handlers::fetch_batch))
        .route("/v1/budget", get(handlers::list_budgets))
        .route("/v1/budget/{provider}", get(handlers::get_budget))
        .route("/v1/cache/stats", get(handlers::cache_stats))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .with_state(state)
}
