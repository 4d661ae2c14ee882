//! Public types for the Tollgate API.

mod batch;
mod entity;
mod envelope;
mod request;

pub use batch::{BatchResponse, BatchResults, BatchSummary, ItemFailure, ItemResult};
pub use entity::{normalize_entity_id, normalize_website};
pub use envelope::{Envelope, Source};
pub use request::{BatchEntity, BatchRequest, DataRequest};
