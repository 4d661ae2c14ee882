//! Tollgate - cost-aware cache gateway for paid data APIs
//!
//! Tollgate sits between an application and the paid market/company data
//! APIs it consumes. For every request it decides whether to serve a cached
//! record, spend budget on an upstream call, or fall back to stale data
//! because the provider's spend cap for the period is reached. Every answer
//! carries its provenance (`cache`, `api`, `cache_expired`,
//! `cache_fallback`), its cost and a freshness-weighted confidence score.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rust_decimal::Decimal;
//! use tollgate::{
//!     BudgetConfig, DataGateway, DataRequest, DataTypePolicy, HttpDataProvider, ProviderSpec,
//!     Tollgate,
//! };
//!
//! #[tokio::main]
//! async fn main() -> tollgate::Result<()> {
//!     let openbb = HttpDataProvider::new("openbb", "https://data.example.com/v1")?.api_key("key");
//!     let gateway = Tollgate::builder()
//!         .provider(
//!             ProviderSpec::new(Arc::new(openbb), BudgetConfig::daily(Decimal::ONE)).data_type(
//!                 "profile",
//!                 DataTypePolicy::new(Decimal::new(30, 2), Duration::from_secs(86_400)),
//!             ),
//!         )
//!         .build()?;
//!
//!     let envelope = gateway.fetch(&DataRequest::new("Acme Corp", "profile")).await?;
//!     println!("{} (cost {:?})", envelope.source, envelope.cost);
//!     Ok(())
//! }
//! ```

pub mod budget;
pub mod cache;
#[cfg(feature = "client")]
pub mod client;
pub mod clock;
pub mod confidence;
pub mod error;
pub mod gateway;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{Result, TollgateError};
pub use gateway::{EmbeddedGateway, Tollgate, TollgateBuilder};
pub use traits::DataGateway;

pub use budget::{BudgetConfig, BudgetPeriod, BudgetStatus};
pub use cache::{CacheConfig, CacheStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use confidence::ConfidenceScorer;
pub use providers::{
    DataProvider, DataTypePolicy, HttpDataProvider, ProviderRequest, ProviderResponse,
    ProviderSpec, RetryConfig,
};
pub use types::{
    BatchEntity, BatchRequest, BatchResponse, BatchSummary, DataRequest, Envelope, ItemFailure,
    ItemResult, Source,
};
pub use version::{PKG_VERSION, version_string};

#[cfg(feature = "client")]
pub use client::GatewayClient;
