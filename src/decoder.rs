// src/decoder.rs

use log::{debug, trace};
use ndarray::Array2;

use crate::config::DEFAULT_MAX_NEW_TOKENS;
use crate::error::InferenceError;
use crate::session::Seq2SeqModel;
use crate::tokenizer::{EOS_TOKEN_ID, PAD_TOKEN_ID};

/// Index of the highest score.
///
/// Scans left to right from a best of negative infinity and only moves on a strict `>`,
/// so ties keep the lowest index and NaN never wins. A row with no finite winner yields 0.
pub fn argmax<'a>(scores: impl IntoIterator<Item = &'a f32>) -> usize {
    let mut best_idx = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &val) in scores.into_iter().enumerate() {
        if val > best_val {
            best_val = val;
            best_idx = i;
        }
    }
    best_idx
}

/// Greedy autoregressive decoding over a [`Seq2SeqModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreedyDecoder {
    max_new_tokens: usize,
    pad_id: u32,
    eos_id: u32,
}

impl Default for GreedyDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NEW_TOKENS)
    }
}

impl GreedyDecoder {
    pub fn new(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            pad_id: PAD_TOKEN_ID,
            eos_id: EOS_TOKEN_ID,
        }
    }

    /// Takes the reserved ids from a tokenizer instead of the T5 defaults.
    pub fn with_special_ids(mut self, pad_id: u32, eos_id: u32) -> Self {
        self.pad_id = pad_id;
        self.eos_id = eos_id;
        self
    }

    /// Generates target ids for `src_ids`.
    ///
    /// The decoder sequence is seeded with the pad id, grows by one argmax token per
    /// step, and stops when EOS is selected (EOS is not kept) or after `max_new_tokens`
    /// steps. The seed pad is stripped from the result.
    pub fn decode<M: Seq2SeqModel + ?Sized>(
        &self,
        model: &M,
        src_ids: &[u32],
    ) -> Result<Vec<u32>, InferenceError> {
        if src_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Encoder side stays fixed for the whole request.
        let src_len = src_ids.len();
        let input_ids = Array2::from_shape_vec(
            (1, src_len),
            src_ids.iter().map(|&id| i64::from(id)).collect(),
        )?;
        let attention_mask = Array2::<i64>::ones((1, src_len));

        let mut decoder_ids: Vec<i64> = vec![i64::from(self.pad_id)];

        for step in 0..self.max_new_tokens {
            let decoder_len = decoder_ids.len();
            let decoder_input_ids = Array2::from_shape_vec((1, decoder_len), decoder_ids.clone())?;

            let logits = model.next_token_logits(&input_ids, &attention_mask, &decoder_input_ids)?;

            let (batch, positions, vocab) = logits.shape;
            if batch != 1 || positions != decoder_len || vocab == 0 {
                return Err(InferenceError::Shape(format!(
                    "expected [1, {}, vocab>0], got [{}, {}, {}]",
                    decoder_len, batch, positions, vocab
                )));
            }

            let next_id = argmax(logits.scores.iter()) as u32;
            trace!("Step {}: next token id {}", step, next_id);

            if next_id == self.eos_id {
                debug!("EOS selected at step {}; stopping", step);
                break;
            }
            decoder_ids.push(i64::from(next_id));
        }

        // Ids came from argmax over a u32-indexed vocabulary.
        Ok(decoder_ids[1..].iter().map(|&id| id as u32).collect())
    }
}
