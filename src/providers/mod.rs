//! Upstream data providers.
//!
//! [`DataProvider`] is the seam to paid APIs; [`HttpDataProvider`] is the
//! stock REST implementation and [`ProviderRegistry`] routes data types to
//! providers.

pub mod http;
pub mod registry;
pub mod retry;
pub mod traits;

pub use http::HttpDataProvider;
pub use registry::{DataTypePolicy, ProviderRegistry, ProviderSpec, Route};
pub use retry::{RetryConfig, RetryingDataProvider};
pub use traits::{DataProvider, ProviderRequest, ProviderResponse};
