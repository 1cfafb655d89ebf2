//! Static catalog of every operator whose types can be reduced.
//!
//! Operators left out either have a single supported type or kernels small
//! enough that reduction buys nothing.

use crate::error::{Error, Result};
use crate::key::OpKey;
use crate::processor::{CompositeProcessor, DefaultProcessor, Processor, UsageProcessor};
use std::collections::BTreeMap;

/// Operator key to processor template. Templates are never mutated; the
/// manager activates a copy on first use.
#[derive(Debug, Clone, Default)]
pub struct Catalog(BTreeMap<OpKey, Processor>);

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, processor: impl Into<Processor>) -> Result<()> {
        let processor = processor.into();
        let key = processor.key().clone();
        if self.0.contains_key(&key) {
            return Err(Error::DuplicateProcessor(key.to_string()));
        }
        self.0.insert(key, processor);
        Ok(())
    }

    pub fn get(&self, key: &OpKey) -> Option<&Processor> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &OpKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &OpKey> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Ops seen in production models (Office, Mobilenet, SSD Mobilenet,
// MobileBert) plus a few known large kernels. Input 0 drives the kernel type.
const DEFAULT_ONNX_OPS: &[&str] = &[
    "Add",
    "AveragePool",
    "BatchNormalization",
    "Clip",
    "Concat",
    "Conv",
    "DequantizeLinear",
    "Div",
    "Equal",
    "Exp",
    "Expand",
    "Flatten",
    "Gemm",
    "Greater",
    "Less",
    "MatMul",
    "Max",
    "Min",
    "Mul",
    "NonMaxSuppression",
    "NonZero",
    "Pad",
    "QLinearConv",
    "Relu",
    "Resize",
    "Sigmoid",
    "Slice",
    "Softmax",
    "Split",
    "Sub",
    "Tile",
    "TopK",
    "Transpose",
];

// FusedConv, FusedGemm and TransposeMatMul are float only.
const DEFAULT_MS_OPS: &[&str] = &["QLinearAdd", "QLinearMul"];

// These produce new data, so the output type is what selects the kernel.
const OUTPUT_ONLY_ONNX_OPS: &[&str] = &[
    "RandomNormal",
    "RandomNormalLike",
    "RandomUniform",
    "RandomUniformLike",
    "Multinomial",
    // input is float only
    "QuantizeLinear",
];

/// Build the full catalog. Fails only if the policy lists an operator twice.
pub fn build_catalog() -> Result<Catalog> {
    let mut catalog = Catalog::new();
    let onnx = |op: &str| OpKey::new("ai.onnx", op);

    for op in DEFAULT_ONNX_OPS {
        catalog.add(DefaultProcessor::new(onnx(*op)))?;
    }
    for op in DEFAULT_MS_OPS {
        catalog.add(DefaultProcessor::new(OpKey::new("com.microsoft", *op)))?;
    }

    // Cast switches on both source and destination type.
    catalog.add(DefaultProcessor::with_positions(onnx("Cast"), &[0], &[0]))?;

    // data type (input 0) and indices type (input 1)
    catalog.add(DefaultProcessor::with_positions(onnx("Gather"), &[0, 1], &[]))?;
    catalog.add(DefaultProcessor::with_positions(
        onnx("GatherElements"),
        &[0, 1],
        &[],
    ))?;
    // base and exponent
    catalog.add(DefaultProcessor::with_positions(onnx("Pow"), &[0, 1], &[]))?;

    for op in OUTPUT_ONLY_ONNX_OPS {
        catalog.add(DefaultProcessor::with_positions(onnx(*op), &[], &[0]))?;
    }

    // Registration names a (indices, depth, values) triple, e.g. float_int64_t_int64_t.
    catalog.add(CompositeProcessor::new(onnx("OneHot"), &[0, 1, 2]))?;

    Ok(catalog)
}
