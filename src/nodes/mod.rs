//! Node adapters
//!
//! Each node declares its inputs and single output the way the host graph
//! expects, pulls typed values out of a [`NodeInputs`] map, drives one
//! backend call, and always hands back a [`NodeOutput`]. Any failure along
//! the way is routed through [`crate::failure`]; `run` itself cannot fail.

pub mod imagen;
pub mod llm;
pub mod registry;
pub mod vlm;

pub use imagen::ImagenNode;
pub use llm::LlmNode;
pub use registry::NodeRegistry;
pub use vlm::VlmNode;

use crate::image::{ImageBatch, ImageTensor};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

/// Input metadata, serialized in the host's `INPUT_TYPES` vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum InputKind {
    String {
        default: &'static str,
        multiline: bool,
    },
    Int {
        default: i64,
        min: i64,
        max: i64,
        step: i64,
    },
    Choice {
        options: Vec<&'static str>,
        default: &'static str,
    },
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: InputKind,
}

impl InputSpec {
    pub fn multiline(name: &'static str) -> Self {
        Self {
            name,
            kind: InputKind::String {
                default: "",
                multiline: true,
            },
        }
    }

    pub fn int(name: &'static str, default: i64, min: i64, max: i64, step: i64) -> Self {
        Self {
            name,
            kind: InputKind::Int {
                default,
                min,
                max,
                step,
            },
        }
    }

    pub fn choice(name: &'static str, options: &[&'static str], default: &'static str) -> Self {
        Self {
            name,
            kind: InputKind::Choice {
                options: options.to_vec(),
                default,
            },
        }
    }

    pub fn image(name: &'static str) -> Self {
        Self {
            name,
            kind: InputKind::Image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputKind {
    String,
    Image,
}

/// Everything the host needs to register and render a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub inputs: Vec<InputSpec>,
    pub output: OutputKind,
}

impl NodeSpec {
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Inputs pre-filled with every declared default. Image inputs have no
    /// default and are left unset.
    pub fn default_inputs(&self) -> NodeInputs {
        self.inputs
            .iter()
            .fold(NodeInputs::new(), |inputs, input| match &input.kind {
                InputKind::String { default, .. } | InputKind::Choice { default, .. } => {
                    inputs.with_string(input.name, *default)
                }
                InputKind::Int { default, .. } => inputs.with_int(input.name, *default),
                InputKind::Image => inputs,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    String(String),
    Int(i64),
    Image(ImageTensor),
}

impl InputValue {
    fn type_name(&self) -> &'static str {
        match self {
            InputValue::String(_) => "STRING",
            InputValue::Int(_) => "INT",
            InputValue::Image(_) => "IMAGE",
        }
    }
}

/// Named input values for one node invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInputs {
    values: HashMap<String, InputValue>,
}

impl NodeInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, InputValue::String(value.into()));
        self
    }

    pub fn with_int(mut self, name: &str, value: i64) -> Self {
        self.set(name, InputValue::Int(value));
        self
    }

    pub fn with_image(mut self, name: &str, value: ImageTensor) -> Self {
        self.set(name, InputValue::Image(value));
        self
    }

    pub fn set(&mut self, name: &str, value: InputValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<InputValue> {
        self.values.remove(name)
    }

    fn get(&self, name: &str, expected: &str) -> Result<&InputValue> {
        self.values
            .get(name)
            .ok_or_else(|| Error::Conversion(format!("missing {} input '{}'", expected, name)))
    }

    fn mistyped(name: &str, expected: &str, actual: &InputValue) -> Error {
        Error::Conversion(format!(
            "input '{}' must be {}, got {}",
            name,
            expected,
            actual.type_name()
        ))
    }

    pub fn get_string(&self, name: &str) -> Result<&str> {
        match self.get(name, "STRING")? {
            InputValue::String(value) => Ok(value),
            other => Err(Self::mistyped(name, "STRING", other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.get(name, "INT")? {
            InputValue::Int(value) => Ok(*value),
            other => Err(Self::mistyped(name, "INT", other)),
        }
    }

    pub fn get_image(&self, name: &str) -> Result<&ImageTensor> {
        match self.get(name, "IMAGE")? {
            InputValue::Image(value) => Ok(value),
            other => Err(Self::mistyped(name, "IMAGE", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    Text(String),
    Image(ImageBatch),
}

impl NodeOutput {
    pub fn kind(&self) -> OutputKind {
        match self {
            NodeOutput::Text(_) => OutputKind::String,
            NodeOutput::Image(_) => OutputKind::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeOutput::Text(text) => Some(text),
            NodeOutput::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBatch> {
        match self {
            NodeOutput::Image(batch) => Some(batch),
            NodeOutput::Text(_) => None,
        }
    }
}

#[async_trait]
pub trait Node: Send + Sync {
    fn spec(&self) -> NodeSpec;

    /// Run once. Failures come back as placeholder output, never as errors.
    async fn run(&self, inputs: &NodeInputs) -> NodeOutput;
}
