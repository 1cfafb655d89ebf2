use crate::error::{Error, Result};
use crate::key::OpKey;
use crate::node::{GraphNode, TypeLookup};
use crate::processor::UsageProcessor;
use crate::processor::entry::{DefaultEntry, to_entry_string};
use std::collections::{BTreeMap, BTreeSet};

/// Tracks the types seen at selected input and/or output positions.
///
/// The tracked positions are fixed at construction. Typed registrations are
/// always keyed on the type of input 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultProcessor {
    key: OpKey,
    input_types: BTreeMap<usize, BTreeSet<String>>,
    output_types: BTreeMap<usize, BTreeSet<String>>,
}

impl DefaultProcessor {
    /// Track input 0 only.
    pub fn new(key: OpKey) -> Self {
        Self::with_positions(key, &[0], &[])
    }

    pub fn with_positions(key: OpKey, inputs: &[usize], outputs: &[usize]) -> Self {
        Self {
            key,
            input_types: inputs.iter().map(|&i| (i, BTreeSet::new())).collect(),
            output_types: outputs.iter().map(|&o| (o, BTreeSet::new())).collect(),
        }
    }

    pub fn input_types(&self, position: usize) -> Option<&BTreeSet<String>> {
        self.input_types.get(&position)
    }

    pub fn output_types(&self, position: usize) -> Option<&BTreeSet<String>> {
        self.output_types.get(&position)
    }

    fn check_arity(&self, kind: &'static str, position: usize, actual: usize) -> Result<()> {
        if position >= actual {
            return Err(Error::ArityMismatch {
                key: self.key.to_string(),
                kind,
                position,
                actual,
            });
        }
        Ok(())
    }
}

impl UsageProcessor for DefaultProcessor {
    fn key(&self) -> &OpKey {
        &self.key
    }

    fn process_node<N, L>(&mut self, node: &N, types: &L) -> Result<()>
    where
        N: GraphNode + ?Sized,
        L: TypeLookup + ?Sized,
    {
        for &i in self.input_types.keys() {
            self.check_arity("input", i, node.inputs_len())?;
        }
        for &o in self.output_types.keys() {
            self.check_arity("output", o, node.outputs_len())?;
        }

        // Resolve everything before touching state so a lookup failure
        // leaves the processor as it was.
        let inputs = self
            .input_types
            .keys()
            .map(|&i| -> Result<(usize, String)> { Ok((i, types.type_name(node.input(i))?)) })
            .collect::<Result<Vec<_>>>()?;
        let outputs = self
            .output_types
            .keys()
            .map(|&o| -> Result<(usize, String)> { Ok((o, types.type_name(node.output(o))?)) })
            .collect::<Result<Vec<_>>>()?;

        for (i, ty) in inputs {
            self.input_types.entry(i).or_default().insert(ty);
        }
        for (o, ty) in outputs {
            self.output_types.entry(o).or_default().insert(ty);
        }
        Ok(())
    }

    fn is_registration_needed(&self, type_in_registration: &str) -> Result<bool> {
        match self.input_types.get(&0) {
            Some(seen) => Ok(seen.contains(type_in_registration)),
            None => Err(Error::UntrackedPosition {
                key: self.key.to_string(),
                position: 0,
            }),
        }
    }

    fn build_directives(&self) -> Vec<String> {
        let name = self.key.build_name();
        let mut out = Vec::new();

        for (kind, positions) in [("INPUT", &self.input_types), ("OUTPUT", &self.output_types)] {
            for (pos, seen) in positions {
                if seen.is_empty() {
                    continue;
                }
                let list: Vec<&str> = seen.iter().map(String::as_str).collect();
                out.push(format!("{}_{}{}_TYPES = ({})", name, kind, pos, list.join(",")));
            }
        }
        out
    }

    fn to_config_entry(&self) -> Result<Option<String>> {
        let collect = |positions: &BTreeMap<usize, BTreeSet<String>>| {
            positions
                .iter()
                .filter(|(_, seen)| !seen.is_empty())
                .map(|(pos, seen)| (*pos, seen.iter().cloned().collect()))
                .collect::<BTreeMap<usize, Vec<String>>>()
        };

        let entry = DefaultEntry {
            inputs: collect(&self.input_types),
            outputs: collect(&self.output_types),
        };
        if entry.is_empty() {
            return Ok(None);
        }
        to_entry_string(&entry).map(Some)
    }

    fn from_config_entry(&mut self, entry: &str) -> Result<()> {
        let parsed: DefaultEntry =
            serde_json::from_str(entry).map_err(|e| Error::malformed(&self.key, e))?;

        for (kind, given, tracked) in [
            ("input", &parsed.inputs, &self.input_types),
            ("output", &parsed.outputs, &self.output_types),
        ] {
            if let Some(pos) = given.keys().find(|p| !tracked.contains_key(*p)) {
                return Err(Error::malformed(
                    &self.key,
                    format!("{} {} is not tracked by this operator", kind, pos),
                ));
            }
        }

        for seen in self.input_types.values_mut() {
            seen.clear();
        }
        for seen in self.output_types.values_mut() {
            seen.clear();
        }
        for (pos, list) in parsed.inputs {
            self.input_types.entry(pos).or_default().extend(list);
        }
        for (pos, list) in parsed.outputs {
            self.output_types.entry(pos).or_default().extend(list);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDesc;
    use pretty_assertions::assert_eq;

    fn types(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tracks_only_configured_positions() {
        let mut p = DefaultProcessor::new(OpKey::new("ai.onnx", "Concat"));
        let lookup = types(&[("a", "float"), ("b", "float"), ("c", "int64_t"), ("y", "double")]);

        p.process_node(&NodeDesc::new("", "Concat", &["a", "b", "c"], &["y"]), &lookup)
            .unwrap();
        p.process_node(&NodeDesc::new("", "Concat", &["c", "a", "b"], &["y"]), &lookup)
            .unwrap();

        assert_eq!(p.input_types(0), Some(&set(&["float", "int64_t"])));
        assert_eq!(p.input_types(1), None);
        assert_eq!(p.output_types(0), None);
        assert_eq!(
            p.to_config_entry().unwrap().as_deref(),
            Some(r#"{"inputs": {"0": ["float", "int64_t"]}}"#)
        );
    }

    #[test]
    fn processing_twice_is_idempotent() {
        let mut p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "Cast"), &[0], &[0]);
        let lookup = types(&[("x", "float"), ("y", "int32_t")]);
        let node = NodeDesc::new("", "Cast", &["x"], &["y"]);

        p.process_node(&node, &lookup).unwrap();
        let once = p.clone();
        p.process_node(&node, &lookup).unwrap();

        assert_eq!(p, once);
        assert_eq!(p.to_config_entry().unwrap(), once.to_config_entry().unwrap());
    }

    #[test]
    fn arity_guard() {
        let mut p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "Pad"), &[2], &[]);
        let lookup = types(&[("x", "float"), ("pads", "int64_t")]);

        let err = p
            .process_node(&NodeDesc::new("", "Pad", &["x", "pads"], &["y"]), &lookup)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ArityMismatch { position: 2, actual: 2, kind: "input", .. }
        ));
        assert_eq!(p.input_types(2), Some(&BTreeSet::new()));
    }

    #[test]
    fn output_arity_guard() {
        let mut p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "TopK"), &[], &[1]);
        let lookup = types(&[("x", "float"), ("v", "float")]);

        let err = p
            .process_node(&NodeDesc::new("", "TopK", &["x"], &["v"]), &lookup)
            .unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { kind: "output", .. }));
    }

    #[test]
    fn registration_uses_input_zero() {
        let mut p = DefaultProcessor::new(OpKey::new("ai.onnx", "Relu"));
        p.process_node(
            &NodeDesc::new("", "Relu", &["x"], &["y"]),
            &types(&[("x", "float")]),
        )
        .unwrap();

        assert!(p.is_registration_needed("float").unwrap());
        assert!(!p.is_registration_needed("double").unwrap());
    }

    #[test]
    fn registration_without_input_zero_is_an_error() {
        let p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "RandomNormal"), &[], &[0]);
        assert!(matches!(
            p.is_registration_needed("float"),
            Err(Error::UntrackedPosition { position: 0, .. })
        ));
    }

    #[test]
    fn directives_sorted_by_position_then_type() {
        let mut p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "Pow"), &[1, 0], &[]);
        let lookup = types(&[("a", "int32_t"), ("b", "float"), ("e", "double")]);
        p.process_node(&NodeDesc::new("", "Pow", &["a", "e"], &["y"]), &lookup)
            .unwrap();
        p.process_node(&NodeDesc::new("", "Pow", &["b", "e"], &["y"]), &lookup)
            .unwrap();

        assert_eq!(
            p.build_directives(),
            vec![
                "AI_ONNX_POW_INPUT0_TYPES = (float,int32_t)".to_string(),
                "AI_ONNX_POW_INPUT1_TYPES = (double)".to_string(),
            ]
        );
    }

    #[test]
    fn empty_state_has_no_entry_and_no_directives() {
        let p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "Cast"), &[0], &[0]);
        assert_eq!(p.to_config_entry().unwrap(), None);
        assert!(p.build_directives().is_empty());
    }

    #[test]
    fn restore_replaces_state() {
        let mut p = DefaultProcessor::with_positions(OpKey::new("ai.onnx", "Cast"), &[0], &[0]);
        p.process_node(
            &NodeDesc::new("", "Cast", &["x"], &["y"]),
            &types(&[("x", "uint8_t"), ("y", "float")]),
        )
        .unwrap();

        p.from_config_entry(r#"{"outputs": {"0": ["double"]}}"#)
            .unwrap();

        assert_eq!(p.input_types(0), Some(&BTreeSet::new()));
        assert_eq!(p.output_types(0), Some(&set(&["double"])));
        assert_eq!(
            p.build_directives(),
            vec!["AI_ONNX_CAST_OUTPUT0_TYPES = (double)".to_string()]
        );
    }

    #[test]
    fn restore_rejects_untracked_position() {
        let mut p = DefaultProcessor::new(OpKey::new("ai.onnx", "Add"));
        p.from_config_entry(r#"{"inputs": {"0": ["float"]}}"#).unwrap();

        let err = p
            .from_config_entry(r#"{"inputs": {"1": ["float"]}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { .. }));
        // failed restore leaves the previous state alone
        assert_eq!(p.input_types(0), Some(&set(&["float"])));
    }

    #[test]
    fn restore_rejects_bad_json() {
        let mut p = DefaultProcessor::new(OpKey::new("ai.onnx", "Add"));
        for bad in ["not json", r#"["float"]"#, r#"{"custom": ["a_b_c"]}"#] {
            assert!(matches!(
                p.from_config_entry(bad),
                Err(Error::MalformedEntry { .. })
            ));
        }
    }
}
