use crate::error::{Error, Result};
use crate::key::OpKey;
use crate::node::{GraphNode, TypeLookup};
use crate::processor::UsageProcessor;
use crate::processor::entry::{CompositeEntry, to_entry_string};
use std::collections::BTreeSet;

/// Separator between the type names of a composite key.
pub const COMPOSITE_SEPARATOR: &str = "_";

/// Tracks the combinations of types seen across several inputs of one node.
///
/// For OneHot (indices, depth, values) a node with float/int64_t/int64_t
/// inputs records "float_int64_t_int64_t", which is exactly the string the
/// kernel registration carries. Selection happens only through
/// `is_registration_needed`; no build defines are written.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeProcessor {
    key: OpKey,
    inputs: Vec<usize>,
    combinations: BTreeSet<String>,
}

impl CompositeProcessor {
    /// `inputs` lists the positions joined into the key, in key order.
    pub fn new(key: OpKey, inputs: &[usize]) -> Self {
        Self {
            key,
            inputs: inputs.to_vec(),
            combinations: BTreeSet::new(),
        }
    }

    pub fn combinations(&self) -> &BTreeSet<String> {
        &self.combinations
    }
}

impl UsageProcessor for CompositeProcessor {
    fn key(&self) -> &OpKey {
        &self.key
    }

    fn process_node<N, L>(&mut self, node: &N, types: &L) -> Result<()>
    where
        N: GraphNode + ?Sized,
        L: TypeLookup + ?Sized,
    {
        let mut parts = Vec::with_capacity(self.inputs.len());
        for &i in &self.inputs {
            if i >= node.inputs_len() {
                return Err(Error::ArityMismatch {
                    key: self.key.to_string(),
                    kind: "input",
                    position: i,
                    actual: node.inputs_len(),
                });
            }
            parts.push(types.type_name(node.input(i))?);
        }

        self.combinations.insert(parts.join(COMPOSITE_SEPARATOR));
        Ok(())
    }

    fn is_registration_needed(&self, type_in_registration: &str) -> Result<bool> {
        Ok(self.combinations.contains(type_in_registration))
    }

    fn build_directives(&self) -> Vec<String> {
        Vec::new()
    }

    fn to_config_entry(&self) -> Result<Option<String>> {
        if self.combinations.is_empty() {
            return Ok(None);
        }
        let entry = CompositeEntry {
            custom: self.combinations.iter().cloned().collect(),
        };
        to_entry_string(&entry).map(Some)
    }

    fn from_config_entry(&mut self, entry: &str) -> Result<()> {
        let parsed: CompositeEntry =
            serde_json::from_str(entry).map_err(|e| Error::malformed(&self.key, e))?;

        self.combinations = parsed.custom.into_iter().collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDesc;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn one_hot() -> CompositeProcessor {
        CompositeProcessor::new(OpKey::new("ai.onnx", "OneHot"), &[0, 1, 2])
    }

    fn lookup() -> HashMap<String, String> {
        [("f", "float"), ("d", "double"), ("i", "int64_t")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn joins_types_in_argument_order() {
        let mut p = one_hot();
        p.process_node(&NodeDesc::new("", "OneHot", &["f", "i", "i"], &["y"]), &lookup())
            .unwrap();
        p.process_node(&NodeDesc::new("", "OneHot", &["d", "i", "i"], &["y"]), &lookup())
            .unwrap();

        assert!(p.is_registration_needed("float_int64_t_int64_t").unwrap());
        assert!(p.is_registration_needed("double_int64_t_int64_t").unwrap());
        assert!(!p.is_registration_needed("float_float_int64_t").unwrap());
        assert!(p.build_directives().is_empty());
    }

    #[test]
    fn entry_uses_custom_shape() {
        let mut p = one_hot();
        assert_eq!(p.to_config_entry().unwrap(), None);

        p.process_node(&NodeDesc::new("", "OneHot", &["i", "i", "f"], &["y"]), &lookup())
            .unwrap();
        assert_eq!(
            p.to_config_entry().unwrap().as_deref(),
            Some(r#"{"custom": ["int64_t_int64_t_float"]}"#)
        );
    }

    #[test]
    fn restore_replaces_combinations() {
        let mut p = one_hot();
        p.process_node(&NodeDesc::new("", "OneHot", &["f", "i", "i"], &["y"]), &lookup())
            .unwrap();

        p.from_config_entry(r#"{"custom": ["int32_t_float_float"]}"#)
            .unwrap();

        assert!(!p.is_registration_needed("float_int64_t_int64_t").unwrap());
        assert!(p.is_registration_needed("int32_t_float_float").unwrap());
    }

    #[test]
    fn restore_rejects_default_shape() {
        let mut p = one_hot();
        assert!(matches!(
            p.from_config_entry(r#"{"inputs": {"0": ["float"]}}"#),
            Err(Error::MalformedEntry { .. })
        ));
    }

    #[test]
    fn short_node_fails() {
        let mut p = one_hot();
        let err = p
            .process_node(&NodeDesc::new("", "OneHot", &["f", "i"], &["y"]), &lookup())
            .unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { position: 2, actual: 2, .. }));
        assert!(p.combinations().is_empty());
    }
}
