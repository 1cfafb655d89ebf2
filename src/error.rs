//! Error taxonomy for the type usage core.
//!
//! Everything here is fatal for the current run. Unknown operators and
//! operators that were never activated are not errors and never reach this
//! type.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Two processors were registered under the same operator key.
    #[error("duplicate processor for {0}")]
    DuplicateProcessor(String),

    /// A processor tracks a position the node does not have.
    #[error(
        "node has {actual} {kind}s; tracker for {key} incorrectly configured as it requires {kind} {position}"
    )]
    ArityMismatch {
        key: String,
        kind: &'static str,
        position: usize,
        actual: usize,
    },

    /// Registration query for a position the processor was never told to track.
    #[error("typed registration for {key} expects input {position} to be tracked")]
    UntrackedPosition { key: String, position: usize },

    /// A config entry that is not the shape this processor writes.
    #[error("malformed config entry for {key}: {reason}")]
    MalformedEntry { key: String, reason: String },

    /// Serializing then restoring a processor changed its entry.
    #[error("round trip mismatch for {key}: wrote {before} but re-serialized {after}")]
    RoundTrip {
        key: String,
        before: String,
        after: String,
    },

    /// The value type lookup has no type for a value id.
    #[error("no type information for value '{0}'")]
    UnknownValue(String),

    /// Syntax error in a required operators config file.
    #[error("config parse error at line {line}: {reason}")]
    ConfigParse { line: usize, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(key: impl ToString, reason: impl ToString) -> Self {
        Error::MalformedEntry {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
