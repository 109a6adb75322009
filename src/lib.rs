//! Natural language to CAD trail commands.
//!
//! Runs a fine-tuned T5 model exported to ONNX with greedy decoding. The pieces, leaf
//! first: [`tokenizer`] (with the [`keyword_tokenizer`] fallback), [`session`],
//! [`decoder`], and the [`generator`] facade that chains them.

pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod generator;
pub mod keyword_tokenizer;
pub mod session;
pub mod tokenizer;
pub mod trail_check;

pub use config::{Nl2TrailConfig, TokenizerKind};
pub use error::{Nl2TrailError, Result};
pub use generator::Nl2Trail;
