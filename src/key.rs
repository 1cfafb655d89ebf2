//! Operator key: (domain, optype).
//!
//! Example: domain "ai.onnx", optype "Add"  =>  "ai.onnx:Add"
//!
//! Ordering is derived so keys can be used in BTreeMap and give the same
//! order as the rendered strings.

use std::fmt;

/// Domain used when a node leaves its domain empty.
pub const DEFAULT_DOMAIN: &str = "ai.onnx";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpKey {
    pub domain: String,
    pub optype: String,
}

impl OpKey {
    pub fn new(domain: impl Into<String>, optype: impl Into<String>) -> Self {
        let domain = domain.into();
        let domain = if domain.is_empty() {
            DEFAULT_DOMAIN.to_string()
        } else {
            domain
        };
        Self {
            domain,
            optype: optype.into(),
        }
    }

    /// Identifier usable as a build define: uppercased, anything that is not
    /// ASCII alphanumeric turned into '_'.
    ///
    /// "ai.onnx:Add" => "AI_ONNX_ADD"
    pub fn build_name(&self) -> String {
        self.to_string()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.optype)
    }
}
