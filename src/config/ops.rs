use std::collections::BTreeMap;
use std::fmt;

/// Operator name to its optional type usage entry.
pub type OperatorEntries = BTreeMap<String, Option<String>>;

/// domain -> opset -> operator -> entry, all sorted so output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredOps(BTreeMap<String, BTreeMap<u32, OperatorEntries>>);

impl RequiredOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operator. Returns the entry it already had if it was present.
    pub fn insert(
        &mut self,
        domain: &str,
        opset: u32,
        optype: &str,
        entry: Option<String>,
    ) -> Option<Option<String>> {
        self.0
            .entry(domain.to_string())
            .or_default()
            .entry(opset)
            .or_default()
            .insert(optype.to_string(), entry)
    }

    pub fn get(&self, domain: &str, opset: u32, optype: &str) -> Option<&Option<String>> {
        self.0.get(domain)?.get(&opset)?.get(optype)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (domain, optype, entry) for every listed operator. An operator listed
    /// under several opsets appears once per opset.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, Option<&str>)> {
        self.0.iter().flat_map(|(domain, opsets)| {
            opsets.values().flat_map(move |ops| {
                ops.iter()
                    .map(move |(op, entry)| (domain.as_str(), op.as_str(), entry.as_deref()))
            })
        })
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&str, &str, &mut Option<String>)> {
        self.0.iter_mut().flat_map(|(domain, opsets)| {
            opsets.values_mut().flat_map(move |ops| {
                ops.iter_mut()
                    .map(move |(op, entry)| (domain.as_str(), op.as_str(), entry))
            })
        })
    }
}

impl fmt::Display for RequiredOps {
    /// One line per (domain, opset).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (domain, opsets) in &self.0 {
            for (opset, ops) in opsets {
                write!(f, "{};{};", domain, opset)?;
                for (i, (op, entry)) in ops.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    f.write_str(op)?;
                    if let Some(entry) = entry {
                        f.write_str(entry)?;
                    }
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
