//! HTTP server for tolld.
//!
//! This module provides:
//! - The axum router and handlers (`routes`, `handlers`)
//! - Error → HTTP status mapping (`error`)
//! - Configuration types (`config`)
//!
//! | Route                       | Handler            |
//! |-----------------------------|--------------------|
//! | `GET  /health`              | `health`           |
//! | `POST /v1/data`             | `fetch_data`       |
//! | `POST /v1/batch`            | `fetch_batch`      |
//! | `GET  /v1/budget`           | `list_budgets`     |
//! | `GET  /v1/budget/{provider}`| `get_budget`       |
//! | `GET  /v1/cache/stats`      | `cache_stats`      |

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::DataGateway;

pub use error::{ApiError, ErrorBody};
pub use routes::create_router;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn DataGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self { gateway }
    }
}
