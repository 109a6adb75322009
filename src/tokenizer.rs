use log::{debug, info};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer; // From the 'tokenizers' crate

use crate::config::{TokenizerKind, DEFAULT_TOKENIZER_FILE};
use crate::error::TokenizerError;
use crate::keyword_tokenizer::KeywordTokenizer;

// T5 reserves these ids; the exported model relies on them.
pub const PAD_TOKEN_ID: u32 = 0;
pub const EOS_TOKEN_ID: u32 = 1;
pub const UNK_TOKEN_ID: u32 = 2;

/// Text <-> token id bridge used by the generator.
///
/// `pad_id` and `eos_id` are fixed by the T5 model family and are not meant to be
/// overridden.
pub trait TrailTokenizer: Send + Sync {
    /// Empty or whitespace-only text yields an empty sequence.
    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError>;

    fn decode(&self, ids: &[u32]) -> Result<String, TokenizerError>;

    fn vocab_size(&self) -> usize;

    fn pad_id(&self) -> u32 {
        PAD_TOKEN_ID
    }

    fn eos_id(&self) -> u32 {
        EOS_TOKEN_ID
    }
}

/// Loads the tokenizer variant selected by configuration.
pub fn load_tokenizer(
    kind: TokenizerKind,
    path: &Path,
    add_special_tokens: bool,
) -> Result<Box<dyn TrailTokenizer>, TokenizerError> {
    match kind {
        TokenizerKind::Subword => Ok(Box::new(
            SubwordTokenizer::load(path)?.with_special_tokens(add_special_tokens),
        )),
        TokenizerKind::Keyword => Ok(Box::new(KeywordTokenizer::load(path))),
    }
}

#[derive(Debug)]
pub struct SubwordTokenizer {
    tokenizer: Tokenizer,
    add_special_tokens: bool,
}

impl SubwordTokenizer {
    /// Accepts either a `tokenizer.json` file or a directory containing one.
    pub fn load(tokenizer_path: &Path) -> Result<Self, TokenizerError> {
        let file_path: PathBuf = if tokenizer_path.is_dir() {
            tokenizer_path.join(DEFAULT_TOKENIZER_FILE)
        } else {
            tokenizer_path.to_path_buf()
        };

        let tokenizer = Tokenizer::from_file(&file_path).map_err(|e| TokenizerError::Load {
            path: file_path.clone(),
            message: e.to_string(),
        })?;
        info!(
            "Loaded tokenizer from {:?} (vocab size {})",
            file_path,
            tokenizer.get_vocab_size(true)
        );

        Ok(Self {
            tokenizer,
            add_special_tokens: false,
        })
    }

    pub fn with_special_tokens(mut self, add_special_tokens: bool) -> Self {
        self.add_special_tokens = add_special_tokens;
        self
    }

    fn is_known(&self, id: u32) -> bool {
        self.tokenizer.id_to_token(id).is_some()
    }
}

impl TrailTokenizer for SubwordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let encoding = self
            .tokenizer
            .encode(text, self.add_special_tokens)
            .map_err(|e| TokenizerError::Encode {
                text: text.to_string(),
                message: e.to_string(),
            })?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, TokenizerError> {
        // Pad/EOS are control tokens; ids the vocabulary does not know render as <unk>.
        let cleaned: Vec<u32> = ids
            .iter()
            .filter(|&&id| id != self.pad_id() && id != self.eos_id())
            .map(|&id| if self.is_known(id) { id } else { UNK_TOKEN_ID })
            .collect();
        if cleaned.len() != ids.len() {
            debug!("Decoding {} of {} ids after dropping control tokens", cleaned.len(), ids.len());
        }

        self.tokenizer
            .decode(&cleaned, false)
            .map_err(|e| TokenizerError::Decode {
                ids: ids.to_vec(),
                message: e.to_string(),
            })
    }

    fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}
