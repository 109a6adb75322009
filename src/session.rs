// src/session.rs

use log::{debug, info};
use ndarray::{s, Array1, Array2, Array3, ArrayView3, CowArray, Ix3, IxDyn};
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::InferenceError;

pub const INPUT_IDS: &str = "input_ids";
pub const ATTENTION_MASK: &str = "attention_mask";
pub const DECODER_INPUT_IDS: &str = "decoder_input_ids";
pub const LOGITS: &str = "logits";

/// One forward pass of an encoder-decoder model.
///
/// All tensors are batch-major with batch size 1. The returned logits have shape
/// `[1, decoder_len, vocab]`. Implementations must not keep state between calls.
pub trait Seq2SeqModel {
    fn run(
        &self,
        input_ids: &Array2<i64>,
        attention_mask: &Array2<i64>,
        decoder_input_ids: &Array2<i64>,
    ) -> Result<Array3<f32>, InferenceError>;

    /// Forward pass reduced to the scores for the last decoder position.
    ///
    /// Implementations that can read the last row in place should override this to
    /// avoid materializing the full logits tensor.
    fn next_token_logits(
        &self,
        input_ids: &Array2<i64>,
        attention_mask: &Array2<i64>,
        decoder_input_ids: &Array2<i64>,
    ) -> Result<NextTokenLogits, InferenceError> {
        let logits = self.run(input_ids, attention_mask, decoder_input_ids)?;
        Ok(NextTokenLogits::from_logits(logits.view()))
    }
}

/// Last-position scores together with the shape of the logits they were cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct NextTokenLogits {
    /// `(batch, decoder_len, vocab)` as reported by the model.
    pub shape: (usize, usize, usize),
    pub scores: Array1<f32>,
}

impl NextTokenLogits {
    /// Copies only batch 0, last position. Empty scores when either axis is empty.
    pub fn from_logits(logits: ArrayView3<'_, f32>) -> Self {
        let shape = logits.dim();
        let (batch, positions, _) = shape;
        let scores = if batch == 0 || positions == 0 {
            Array1::zeros(0)
        } else {
            logits.slice(s![0, positions - 1, ..]).to_owned()
        };
        Self { shape, scores }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphInput {
    InputIds,
    AttentionMask,
    DecoderInputIds,
}

impl GraphInput {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            INPUT_IDS => Some(GraphInput::InputIds),
            ATTENTION_MASK => Some(GraphInput::AttentionMask),
            DECODER_INPUT_IDS => Some(GraphInput::DecoderInputIds),
            _ => None,
        }
    }
}

/// Exported T5 graph loaded into ONNX Runtime.
pub struct OnnxSession {
    session: Session,
    // Feed order follows the graph's declared inputs.
    input_order: Vec<GraphInput>,
    logits_index: usize,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("model_path", &self.model_path)
            .field("input_order", &self.input_order)
            .field("logits_index", &self.logits_index)
            .finish()
    }
}

impl OnnxSession {
    pub fn load(model_path: &Path, config: &SessionConfig) -> Result<Self, InferenceError> {
        let load_error = |message: String| InferenceError::Load {
            path: model_path.to_path_buf(),
            message,
        };

        if !model_path.is_file() {
            return Err(load_error("model file not found".to_string()));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("nl2trail")
                .build()
                .map_err(|e| load_error(format!("failed to create ONNX environment: {e}")))?,
        );

        let mut builder = SessionBuilder::new(&environment)
            .map_err(|e| load_error(format!("failed to create session builder: {e}")))?
            .with_optimization_level(optimization_level(config.optimization_level))
            .map_err(|e| load_error(format!("failed to set optimization level: {e}")))?;
        if let Some(threads) = config.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| load_error(format!("failed to set intra-op threads: {e}")))?;
        }
        let session = builder
            .with_model_from_file(model_path)
            .map_err(|e| load_error(e.to_string()))?;

        for (i, input) in session.inputs.iter().enumerate() {
            debug!(
                "Input[{i}] name={:?} input_type={:?} dimensions={:?}",
                input.name, input.input_type, input.dimensions
            );
        }

        let input_order = session
            .inputs
            .iter()
            .map(|input| {
                GraphInput::from_name(&input.name).ok_or_else(|| {
                    InferenceError::Signature(format!("unexpected model input '{}'", input.name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for required in [GraphInput::InputIds, GraphInput::AttentionMask, GraphInput::DecoderInputIds] {
            if !input_order.contains(&required) {
                return Err(InferenceError::Signature(format!(
                    "model is missing input {:?}; expected {INPUT_IDS}, {ATTENTION_MASK}, {DECODER_INPUT_IDS}",
                    required
                )));
            }
        }

        let logits_index = session
            .outputs
            .iter()
            .position(|output| output.name == LOGITS)
            .ok_or_else(|| InferenceError::Signature(format!("model has no '{LOGITS}' output")))?;

        info!("Loaded ONNX model from {:?}", model_path);
        Ok(Self {
            session,
            input_order,
            logits_index,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    // Runs the graph and hands the rank-checked logits view to `read`.
    fn forward<R>(
        &self,
        input_ids: &Array2<i64>,
        attention_mask: &Array2<i64>,
        decoder_input_ids: &Array2<i64>,
        read: impl FnOnce(ArrayView3<'_, f32>) -> R,
    ) -> Result<R, InferenceError> {
        let input_ids = CowArray::from(input_ids.view().into_dyn());
        let attention_mask = CowArray::from(attention_mask.view().into_dyn());
        let decoder_input_ids = CowArray::from(decoder_input_ids.view().into_dyn());

        let allocator = self.session.allocator();
        let inputs = self
            .input_order
            .iter()
            .map(|input| {
                let array = match input {
                    GraphInput::InputIds => &input_ids,
                    GraphInput::AttentionMask => &attention_mask,
                    GraphInput::DecoderInputIds => &decoder_input_ids,
                };
                Value::from_array(allocator, array)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let outputs: Vec<Value> = self.session.run(inputs)?;
        let logits_value = outputs
            .get(self.logits_index)
            .ok_or_else(|| InferenceError::Shape("model returned no logits tensor".to_string()))?;

        let logits: OrtOwnedTensor<f32, IxDyn> = logits_value.try_extract()?;
        let view = logits.view();
        if view.ndim() != 3 {
            return Err(InferenceError::Shape(format!(
                "expected rank 3 [batch, decoder_len, vocab], got {:?}",
                view.shape()
            )));
        }
        Ok(read(view.view().into_dimensionality::<Ix3>()?))
    }
}

impl Seq2SeqModel for OnnxSession {
    fn run(
        &self,
        input_ids: &Array2<i64>,
        attention_mask: &Array2<i64>,
        decoder_input_ids: &Array2<i64>,
    ) -> Result<Array3<f32>, InferenceError> {
        self.forward(input_ids, attention_mask, decoder_input_ids, |logits| {
            logits.to_owned()
        })
    }

    fn next_token_logits(
        &self,
        input_ids: &Array2<i64>,
        attention_mask: &Array2<i64>,
        decoder_input_ids: &Array2<i64>,
    ) -> Result<NextTokenLogits, InferenceError> {
        self.forward(
            input_ids,
            attention_mask,
            decoder_input_ids,
            NextTokenLogits::from_logits,
        )
    }
}

fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}
