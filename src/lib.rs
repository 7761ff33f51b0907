//! Gatehouse - request authorization gates for axum services
//!
//! Requests are dispatched to a controller/action pair, the applicable rule
//! is resolved from KDL policies and the named gates run in order until one
//! stops the request. All modules are exposed for testing purposes.

pub mod errors;
pub mod gates;
pub mod settings;
pub mod web;
