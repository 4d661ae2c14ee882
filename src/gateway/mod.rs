//! Gateway implementations

mod batch;
mod builder;
mod embedded;
mod orchestrator;

pub use batch::DEFAULT_MAX_CONCURRENT_UPSTREAM;
pub use builder::{DEFAULT_UPSTREAM_TIMEOUT, Tollgate, TollgateBuilder};
pub use embedded::EmbeddedGateway;
