//! Operator type usage tracking for reduced-type kernel builds.
//!
//! An external driver walks a model and hands every node to a
//! [`UsageManager`]. The manager keeps, per operator, the concrete types the
//! operator was used with. That state then answers which typed kernel
//! registrations are needed, produces build defines listing the enabled
//! types, and round-trips through per-operator JSON config entries so
//! results from several models can be combined without re-reading them.

pub mod config;
pub mod error;
pub mod key;
pub mod manager;
pub mod node;
pub mod processor;
pub mod registry;

pub use config::{RequiredOps, parse_required_ops};
pub use error::{Error, Result};
pub use key::{DEFAULT_DOMAIN, OpKey};
pub use manager::UsageManager;
pub use node::{GraphNode, NodeDesc, NodeList, TypeLookup};
pub use processor::{CompositeProcessor, DefaultProcessor, Processor, UsageProcessor};
pub use registry::{Catalog, build_catalog};
