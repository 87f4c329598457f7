//! Google generative-AI nodes for a visual node-graph pipeline
//!
//! Text (Gemini, API key), vision (Gemini, API key) and text-to-image
//! (Vertex AI Imagen, service account) nodes that take graph-native values,
//! drive the remote service, and always return graph-native values, with
//! failures degraded to placeholder output.

pub mod ai;
pub mod credentials;
pub mod error;
pub mod failure;
pub mod image;
pub mod nodes;
pub mod request;
pub mod response;
pub mod settings;

pub use error::{Error, FailureKind, Result};
