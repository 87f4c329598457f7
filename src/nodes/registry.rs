//! Node registration, the equivalent of the host's class and display-name
//! mappings.

use super::imagen::{ImagenNode, IMAGEN_NODE_ID};
use super::llm::{LlmNode, LLM_NODE_ID};
use super::vlm::{VlmNode, VLM_NODE_ID};
use super::{Node, NodeSpec};
use crate::ai::BackendProvider;
use crate::credentials;
use std::sync::Arc;

pub struct NodeRegistry {
    backends: Arc<dyn BackendProvider>,
}

impl NodeRegistry {
    pub fn new(backends: Arc<dyn BackendProvider>) -> Self {
        Self { backends }
    }

    /// Registry backed by the process-wide credential store.
    pub fn with_global_credentials() -> Self {
        Self::new(credentials::global())
    }

    /// Metadata for every node, in registration order.
    pub fn specs() -> Vec<NodeSpec> {
        vec![
            LlmNode::node_spec(),
            VlmNode::node_spec(),
            ImagenNode::node_spec(),
        ]
    }

    pub fn display_name(id: &str) -> Option<&'static str> {
        Self::specs()
            .into_iter()
            .find(|spec| spec.id == id)
            .map(|spec| spec.display_name)
    }

    pub fn create(&self, id: &str) -> Option<Box<dyn Node>> {
        let backends = Arc::clone(&self.backends);
        match id {
            LLM_NODE_ID => Some(Box::new(LlmNode::new(backends))),
            VLM_NODE_ID => Some(Box::new(VlmNode::new(backends))),
            IMAGEN_NODE_ID => Some(Box::new(ImagenNode::new(backends))),
            _ => {
                tracing::warn!("Unknown node id: {}", id);
                None
            }
        }
    }
}
