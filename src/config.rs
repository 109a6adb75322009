use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// File name the export step gives the ONNX graph.
pub const DEFAULT_MODEL_FILE: &str = "t5_creo.onnx";
/// File name `save_pretrained` gives the fast-tokenizer artifact.
pub const DEFAULT_TOKENIZER_FILE: &str = "tokenizer.json";
pub const DEFAULT_MAX_NEW_TOKENS: usize = 256;

/// Which tokenizer variant backs the generator.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Subword tokenizer loaded from `tokenizer.json`.
    #[default]
    Subword,
    /// Keyword splitter with canned trail templates. Smoke tests only.
    Keyword,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// ONNX Runtime graph optimization level, 0 (disabled) to 3 (all).
    pub optimization_level: u8,
    /// Intra-op thread count. `None` lets the runtime decide.
    pub intra_threads: Option<i16>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            optimization_level: 1,
            intra_threads: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Nl2TrailConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub tokenizer_kind: TokenizerKind,
    #[serde(alias = "max_length")]
    pub max_new_tokens: usize,
    /// Append the tokenizer's special tokens (T5: `</s>`) to the encoder input.
    pub add_special_tokens: bool,
    pub session: SessionConfig,
}

impl Default for Nl2TrailConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_FILE),
            tokenizer_path: PathBuf::from(DEFAULT_TOKENIZER_FILE),
            tokenizer_kind: TokenizerKind::default(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            add_special_tokens: false,
            session: SessionConfig::default(),
        }
    }
}

impl Nl2TrailConfig {
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path.to_path_buf()));
        }

        let mut file = File::open(config_path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Nl2TrailConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config pointing at the artifacts of an export directory.
    ///
    /// Prefers `t5_creo.onnx`; otherwise accepts the directory's only `*.onnx` file.
    pub fn from_export_dir(dir: &Path) -> Result<Self, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::NotFound(dir.to_path_buf()));
        }

        let model_path = resolve_model_file(dir)?;
        let tokenizer_path = dir.join(DEFAULT_TOKENIZER_FILE);
        if !tokenizer_path.exists() {
            return Err(ConfigError::NotFound(tokenizer_path));
        }

        Ok(Self {
            model_path,
            tokenizer_path,
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_new_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_new_tokens must be greater than 0".to_string(),
            ));
        }
        if self.session.optimization_level > 3 {
            return Err(ConfigError::Invalid(format!(
                "optimization_level must be between 0 and 3, got {}",
                self.session.optimization_level
            )));
        }
        Ok(())
    }
}

fn resolve_model_file(dir: &Path) -> Result<PathBuf, ConfigError> {
    let preferred = dir.join(DEFAULT_MODEL_FILE);
    if preferred.exists() {
        return Ok(preferred);
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "onnx") {
            candidates.push(path);
        }
    }

    match candidates.len() {
        0 => Err(ConfigError::NotFound(preferred)),
        1 => Ok(candidates.remove(0)),
        n => Err(ConfigError::Invalid(format!(
            "found {} .onnx files in {:?}; pass the model path explicitly",
            n, dir
        ))),
    }
}
