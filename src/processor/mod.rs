//! Per-operator type usage processors.
//!
//! A processor accumulates the types an operator was seen with and answers,
//! from that state, which typed kernel registrations a reduced build needs.
//! The set of processor kinds is closed:
//! - `DefaultProcessor`: a type set per tracked input/output position
//! - `CompositeProcessor`: a set of joined type tuples, for kernels that
//!   dispatch on several inputs at once

pub mod composite;
pub mod default;
pub mod entry;

pub use composite::CompositeProcessor;
pub use default::DefaultProcessor;

use crate::error::{Error, Result};
use crate::key::OpKey;
use crate::node::{GraphNode, TypeLookup};

/// Operations every processor kind provides.
pub trait UsageProcessor {
    fn key(&self) -> &OpKey;

    /// Record the types used by one node. Repeating a node changes nothing.
    fn process_node<N, L>(&mut self, node: &N, types: &L) -> Result<()>
    where
        N: GraphNode + ?Sized,
        L: TypeLookup + ?Sized;

    /// Whether the kernel registration for `type_in_registration` is needed.
    fn is_registration_needed(&self, type_in_registration: &str) -> Result<bool>;

    /// Build defines for the types seen, one line per non-empty position.
    fn build_directives(&self) -> Vec<String>;

    /// JSON entry for the accumulated state, `None` when nothing was seen.
    fn to_config_entry(&self) -> Result<Option<String>>;

    /// Replace the accumulated state with the one described by `entry`.
    fn from_config_entry(&mut self, entry: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Processor {
    Default(DefaultProcessor),
    Composite(CompositeProcessor),
}

impl From<DefaultProcessor> for Processor {
    fn from(p: DefaultProcessor) -> Self {
        Processor::Default(p)
    }
}

impl From<CompositeProcessor> for Processor {
    fn from(p: CompositeProcessor) -> Self {
        Processor::Composite(p)
    }
}

impl Processor {
    /// Serialize, restore into a copy, serialize again and compare.
    /// Leaves `self` untouched.
    pub fn verify_round_trip(&self) -> Result<()> {
        let Some(before) = self.to_config_entry()? else {
            return Ok(());
        };

        let mut copy = self.clone();
        copy.from_config_entry(&before)?;
        let after = copy.to_config_entry()?.unwrap_or_default();

        if before != after {
            return Err(Error::RoundTrip {
                key: self.key().to_string(),
                before,
                after,
            });
        }
        Ok(())
    }
}

impl UsageProcessor for Processor {
    fn key(&self) -> &OpKey {
        match self {
            Processor::Default(p) => p.key(),
            Processor::Composite(p) => p.key(),
        }
    }

    fn process_node<N, L>(&mut self, node: &N, types: &L) -> Result<()>
    where
        N: GraphNode + ?Sized,
        L: TypeLookup + ?Sized,
    {
        match self {
            Processor::Default(p) => p.process_node(node, types),
            Processor::Composite(p) => p.process_node(node, types),
        }
    }

    fn is_registration_needed(&self, type_in_registration: &str) -> Result<bool> {
        match self {
            Processor::Default(p) => p.is_registration_needed(type_in_registration),
            Processor::Composite(p) => p.is_registration_needed(type_in_registration),
        }
    }

    fn build_directives(&self) -> Vec<String> {
        match self {
            Processor::Default(p) => p.build_directives(),
            Processor::Composite(p) => p.build_directives(),
        }
    }

    fn to_config_entry(&self) -> Result<Option<String>> {
        match self {
            Processor::Default(p) => p.to_config_entry(),
            Processor::Composite(p) => p.to_config_entry(),
        }
    }

    fn from_config_entry(&mut self, entry: &str) -> Result<()> {
        match self {
            Processor::Default(p) => p.from_config_entry(entry),
            Processor::Composite(p) => p.from_config_entry(entry),
        }
    }
}
