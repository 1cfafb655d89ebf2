//! Required operators config file: which operators (and optionally which
//! types) a reduced build must keep.
//!
//! Line format:
//! domain;opset[,opset...];Op[{entry}][,Op[{entry}]...]
//!
//! Example:
//! ai.onnx;12,13;Add{"inputs": {"0": ["float"]}},Conv
//!
//! Reading and writing files is left to the caller; this module works on text.

pub mod ops;
pub mod parse;

pub use ops::RequiredOps;
pub use parse::parse_required_ops;
