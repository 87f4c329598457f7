pub mod auth;
pub mod client;
pub mod types;

pub use auth::ServiceAccountIdentity;
pub use client::VertexPredictionClient;
pub use types::{EndpointId, PredictRequest, PredictResponse, SynthesisInstance, SynthesisParameters};
