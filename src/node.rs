//! Inputs handed to the core by an external driver: graph nodes and a way to
//! turn a value id into a canonical type name ("float", "int64_t", ...).
//!
//! The core never walks a graph; whoever loaded the model implements
//! `GraphNode` for its node type and `TypeLookup` for its value info.
//!
//! JSON shape accepted by `NodeList` (what the CLI `scan` reads):
//! {
//!   "value_types": { "X": "float", "idx": "int64_t" },
//!   "nodes": [
//!     { "domain": "", "op_type": "Gather", "inputs": ["X", "idx"], "outputs": ["Y"] }
//!   ]
//! }

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Read-only view of one graph node.
pub trait GraphNode {
    /// Operator domain. Empty means the default domain.
    fn domain(&self) -> &str;
    fn op_type(&self) -> &str;
    fn inputs_len(&self) -> usize;
    /// Value id of input `i`. Only called with `i < inputs_len()`.
    fn input(&self, i: usize) -> &str;
    fn outputs_len(&self) -> usize;
    /// Value id of output `i`. Only called with `i < outputs_len()`.
    fn output(&self, i: usize) -> &str;
}

/// Resolves a value id to its canonical type name.
pub trait TypeLookup {
    fn type_name(&self, value_id: &str) -> Result<String>;
}

impl TypeLookup for HashMap<String, String> {
    fn type_name(&self, value_id: &str) -> Result<String> {
        self.get(value_id)
            .cloned()
            .ok_or_else(|| Error::UnknownValue(value_id.to_string()))
    }
}

impl TypeLookup for BTreeMap<String, String> {
    fn type_name(&self, value_id: &str) -> Result<String> {
        self.get(value_id)
            .cloned()
            .ok_or_else(|| Error::UnknownValue(value_id.to_string()))
    }
}

/// Plain node description, as found in a JSON node dump.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDesc {
    #[serde(default)]
    pub domain: String,

    pub op_type: String,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,
}

impl NodeDesc {
    pub fn new(domain: &str, op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            domain: domain.to_string(),
            op_type: op_type.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GraphNode for NodeDesc {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn op_type(&self) -> &str {
        &self.op_type
    }

    fn inputs_len(&self) -> usize {
        self.inputs.len()
    }

    fn input(&self, i: usize) -> &str {
        &self.inputs[i]
    }

    fn outputs_len(&self) -> usize {
        self.outputs.len()
    }

    fn output(&self, i: usize) -> &str {
        &self.outputs[i]
    }
}

/// A flat node dump plus the value types it refers to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub value_types: BTreeMap<String, String>,

    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_node_list() {
        let list: NodeList = serde_json::from_str(
            r#"{
                "value_types": { "X": "float", "idx": "int64_t" },
                "nodes": [ { "op_type": "Gather", "inputs": ["X", "idx"], "outputs": ["Y"] } ]
            }"#,
        )
        .unwrap();

        assert_eq!(list.nodes.len(), 1);
        let node = &list.nodes[0];
        assert_eq!(node.domain(), "");
        assert_eq!(node.inputs_len(), 2);
        assert_eq!(node.input(1), "idx");
        assert_eq!(list.value_types.type_name("idx").unwrap(), "int64_t");
    }

    #[test]
    fn missing_value_is_an_error() {
        let types: BTreeMap<String, String> = BTreeMap::new();
        assert!(matches!(
            types.type_name("nope"),
            Err(Error::UnknownValue(v)) if v == "nope"
        ));
    }
}
