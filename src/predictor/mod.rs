//! Client side of the external traffic-prediction service.
//!
//! The service owns the model. This module only builds validated requests,
//! sends them over HTTP and decodes the two predicted quantities:
//! traffic volume and travel time index.

pub mod client;
pub mod request;

pub use client::PredictionClient;
pub use request::{PredictionRequest, PredictionResponse, Weather};
