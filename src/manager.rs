//! Usage manager: routes nodes, registration queries and config entries to
//! the processor for each operator.
//!
//! Per operator key:
//! - not in the catalog: ignored
//! - in the catalog, untouched: registrations are kept
//! - active (a node or config entry was seen): the processor decides
//!
//! Activation is one way for the life of the manager. Feeding several models
//! through one manager accumulates their types.
//!
//! TODO: types are tracked per operator, not per opset version.

use crate::config::RequiredOps;
use crate::error::Result;
use crate::key::OpKey;
use crate::node::{GraphNode, TypeLookup};
use crate::processor::{Processor, UsageProcessor};
use crate::registry::{Catalog, build_catalog};
use log::{debug, trace, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct UsageManager {
    catalog: Catalog,
    active: BTreeMap<OpKey, Processor>,
}

impl UsageManager {
    /// Manager over the built-in catalog.
    pub fn new() -> Result<Self> {
        Ok(Self::with_catalog(build_catalog()?))
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            active: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Keys of the processors touched so far, sorted.
    pub fn active_keys(&self) -> impl Iterator<Item = &OpKey> {
        self.active.keys()
    }

    pub fn is_active(&self, domain: &str, optype: &str) -> bool {
        self.active.contains_key(&OpKey::new(domain, optype))
    }

    fn activate(&mut self, key: OpKey) -> Option<&mut Processor> {
        if !self.active.contains_key(&key) {
            let template = self.catalog.get(&key)?.clone();
            debug!("activating type usage processor for {}", key);
            self.active.insert(key.clone(), template);
        }
        self.active.get_mut(&key)
    }

    /// Record the types used by one node.
    pub fn process_node<N, L>(&mut self, node: &N, types: &L) -> Result<()>
    where
        N: GraphNode + ?Sized,
        L: TypeLookup + ?Sized,
    {
        let key = OpKey::new(node.domain(), node.op_type());
        match self.activate(key) {
            Some(processor) => processor.process_node(node, types),
            None => {
                trace!(
                    "no type usage processor for {}:{}",
                    node.domain(),
                    node.op_type()
                );
                Ok(())
            }
        }
    }

    /// Whether the kernel registration typed `type_in_registration` is needed.
    ///
    /// Registrations are kept unless an active processor says otherwise.
    pub fn is_registration_needed(
        &self,
        domain: &str,
        optype: &str,
        type_in_registration: &str,
    ) -> Result<bool> {
        match self.active.get(&OpKey::new(domain, optype)) {
            Some(processor) => processor.is_registration_needed(type_in_registration),
            None => Ok(true),
        }
    }

    /// Build defines for every active processor, ordered by operator key.
    pub fn build_directives(&self) -> Vec<String> {
        self.active
            .values()
            .flat_map(|p| p.build_directives())
            .collect()
    }

    /// Config entry for one operator, if it is active and has seen anything.
    pub fn get_config_entry(&self, domain: &str, optype: &str) -> Result<Option<String>> {
        match self.active.get(&OpKey::new(domain, optype)) {
            Some(processor) => processor.to_config_entry(),
            None => Ok(None),
        }
    }

    /// Replace one operator's state with a config entry. Unknown operators
    /// are ignored.
    pub fn restore_from_config_entry(
        &mut self,
        domain: &str,
        optype: &str,
        entry: &str,
    ) -> Result<()> {
        let key = OpKey::new(domain, optype);
        match self.activate(key.clone()) {
            Some(processor) => processor.from_config_entry(entry),
            None => {
                trace!("ignoring config entry for {}", key);
                Ok(())
            }
        }
    }

    /// Restore every operator entry found in a required ops config.
    /// Operators listed without an entry are left alone.
    pub fn restore_from_required_ops(&mut self, ops: &RequiredOps) -> Result<()> {
        for (domain, optype, entry) in ops.entries() {
            let Some(entry) = entry else { continue };
            if !self.catalog.contains(&OpKey::new(domain, optype)) {
                warn!(
                    "config has type info for {}:{} but no processor exists for it, dropping it",
                    domain, optype
                );
                continue;
            }
            self.restore_from_config_entry(domain, optype, entry)?;
        }
        Ok(())
    }

    /// Set the entry of every operator listed in `ops` from the current state.
    pub fn annotate(&self, ops: &mut RequiredOps) -> Result<()> {
        for (domain, optype, entry) in ops.entries_mut() {
            *entry = self.get_config_entry(domain, optype)?;
        }
        Ok(())
    }

    /// Human readable listing of directives and config entries.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::from("build directives:\n");
        for line in self.build_directives() {
            out.push_str(&line);
            out.push('\n');
        }

        out.push_str("config entries:\n");
        for (key, processor) in &self.active {
            if let Some(entry) = processor.to_config_entry()? {
                out.push_str(&format!("{} -> {}\n", key, entry));
            }
        }
        Ok(out)
    }

    /// Check that every active processor restores from its own entry to the
    /// same entry. Does not modify the manager.
    pub fn verify_round_trip(&self) -> Result<()> {
        for processor in self.active.values() {
            processor.verify_round_trip()?;
        }
        Ok(())
    }
}
