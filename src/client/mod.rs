//! Client library for connecting to tolld.
//!
//! Provides [`GatewayClient`], which implements [`DataGateway`](crate::DataGateway)
//! by forwarding calls to a remote tolld instance over HTTP.

mod gateway_client;

pub use gateway_client::{GatewayClient, Health};
