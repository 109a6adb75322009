//! Error types shared across the tokenizer, session, decoder and CLI layers.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the generation facade.
pub type Result<T> = std::result::Result<T, Nl2TrailError>;

#[derive(Error, Debug)]
pub enum TokenizerError {
    /// The tokenizer artifact could not be read or parsed.
    #[error("failed to load tokenizer from {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("encoding failed for text '{text}': {message}")]
    Encode { text: String, message: String },

    #[error("decoding failed for ids {ids:?}: {message}")]
    Decode { ids: Vec<u32>, message: String },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model file is missing or the runtime rejected it.
    #[error("failed to load model from {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    /// The graph does not expose the expected inputs/outputs.
    #[error("model signature mismatch: {0}")]
    Signature(String),

    /// Logits came back with an unexpected rank or dimensions.
    #[error("unexpected logits shape: {0}")]
    Shape(String),

    #[error("onnx runtime error: {0}")]
    Runtime(#[from] ort::OrtError),

    #[error("tensor shape error: {0}")]
    Tensor(#[from] ndarray::ShapeError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found at: {0:?}")]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error returned by [`crate::generator::Nl2Trail`].
#[derive(Error, Debug)]
pub enum Nl2TrailError {
    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
