//! Text-to-trail generation: encode, greedy decode, decode.

use log::{debug, info};

use crate::config::Nl2TrailConfig;
use crate::decoder::GreedyDecoder;
use crate::error::Result;
use crate::session::{OnnxSession, Seq2SeqModel};
use crate::tokenizer::{load_tokenizer, TrailTokenizer};

pub struct Nl2Trail {
    tokenizer: Box<dyn TrailTokenizer>,
    model: Box<dyn Seq2SeqModel>,
    decoder: GreedyDecoder,
}

impl Nl2Trail {
    pub fn new(
        tokenizer: Box<dyn TrailTokenizer>,
        model: Box<dyn Seq2SeqModel>,
        max_new_tokens: usize,
    ) -> Self {
        let decoder =
            GreedyDecoder::new(max_new_tokens).with_special_ids(tokenizer.pad_id(), tokenizer.eos_id());
        Self {
            tokenizer,
            model,
            decoder,
        }
    }

    /// Loads the model, then the tokenizer. Either failing aborts construction.
    pub fn from_config(config: &Nl2TrailConfig) -> Result<Self> {
        config.validate()?;

        let model = OnnxSession::load(&config.model_path, &config.session)?;
        let tokenizer = load_tokenizer(
            config.tokenizer_kind,
            &config.tokenizer_path,
            config.add_special_tokens,
        )?;
        info!(
            "Generator ready (model {:?}, tokenizer {:?}, max_new_tokens {})",
            model.model_path(),
            config.tokenizer_kind,
            config.max_new_tokens
        );

        Ok(Self::new(tokenizer, Box::new(model), config.max_new_tokens))
    }

    /// Raw generated ids; empty when the text encodes to nothing.
    pub fn generate_ids(&self, text: &str) -> Result<Vec<u32>> {
        Ok(self.run_decoder(text)?.unwrap_or_default())
    }

    pub fn generate(&self, text: &str) -> Result<String> {
        match self.run_decoder(text)? {
            Some(generated) => Ok(self.tokenizer.decode(&generated)?),
            None => Ok(String::new()),
        }
    }

    // `None` when the text encodes to no tokens; the model is not run then.
    fn run_decoder(&self, text: &str) -> Result<Option<Vec<u32>>> {
        let src_ids = self.tokenizer.encode(text)?;
        if src_ids.is_empty() {
            debug!("Input encoded to no tokens; skipping inference");
            return Ok(None);
        }
        debug!("Source token ids: {:?}", src_ids);

        let generated = self.decoder.decode(self.model.as_ref(), &src_ids)?;
        debug!("Generated {} token ids", generated.len());
        Ok(Some(generated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InferenceError, Nl2TrailError};
    use crate::keyword_tokenizer::KeywordTokenizer;
    use crate::tokenizer::SubwordTokenizer;
    use ndarray::{Array2, Array3};
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    /// Replays a fixed token script and counts invocations.
    struct ReplayModel {
        vocab: usize,
        script: Vec<u32>,
        calls: Rc<Cell<usize>>,
    }

    impl Seq2SeqModel for ReplayModel {
        fn run(
            &self,
            _input_ids: &Array2<i64>,
            _attention_mask: &Array2<i64>,
            decoder_input_ids: &Array2<i64>,
        ) -> std::result::Result<Array3<f32>, InferenceError> {
            self.calls.set(self.calls.get() + 1);
            let len = decoder_input_ids.ncols();
            let target = self.script.get(len - 1).copied().unwrap_or(1) as usize;
            let mut logits = Array3::<f32>::zeros((1, len, self.vocab));
            logits[[0, len - 1, target]] = 1.0;
            Ok(logits)
        }
    }

    fn subword() -> Box<dyn TrailTokenizer> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/test_tokenizer.json");
        Box::new(SubwordTokenizer::load(&path).unwrap())
    }

    fn generator(script: Vec<u32>, calls: Rc<Cell<usize>>) -> Nl2Trail {
        let model = ReplayModel {
            vocab: 11,
            script,
            calls,
        };
        Nl2Trail::new(subword(), Box::new(model), 16)
    }

    #[test]
    fn test_generate_decodes_model_output() {
        let calls = Rc::new(Cell::new(0));
        let nl2trail = generator(vec![6, 7, 8, 1], calls.clone());

        let trail = nl2trail.generate("create a cube").unwrap();
        assert_eq!(trail, "~ Command `ProCmdExtrudeDashboard`");
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_generate_empty_input_skips_inference() {
        let calls = Rc::new(Cell::new(0));
        let nl2trail = generator(vec![6, 1], calls.clone());

        assert_eq!(nl2trail.generate("").unwrap(), "");
        assert_eq!(nl2trail.generate("   ").unwrap(), "");
        assert!(nl2trail.generate_ids("").unwrap().is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_generate_ids_matches_script() {
        let calls = Rc::new(Cell::new(0));
        let nl2trail = generator(vec![9, 10, 1], calls);
        assert_eq!(nl2trail.generate_ids("create").unwrap(), vec![9, 10]);
    }

    #[test]
    fn test_generate_is_repeatable() {
        let calls = Rc::new(Cell::new(0));
        let nl2trail = generator(vec![6, 7, 8, 9, 10, 1], calls);
        let first = nl2trail.generate("create a cube").unwrap();
        let second = nl2trail.generate("create a cube").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_stops_at_budget() {
        let calls = Rc::new(Cell::new(0));
        // Never emits EOS: 16 steps of token 10.
        let nl2trail = generator(vec![10; 64], calls.clone());
        let ids = nl2trail.generate_ids("cube").unwrap();
        assert_eq!(ids.len(), 16);
        assert_eq!(calls.get(), 16);
    }

    #[test]
    fn test_generate_propagates_inference_failure() {
        struct BrokenModel;
        impl Seq2SeqModel for BrokenModel {
            fn run(
                &self,
                _: &Array2<i64>,
                _: &Array2<i64>,
                _: &Array2<i64>,
            ) -> std::result::Result<Array3<f32>, InferenceError> {
                Ok(Array3::zeros((1, 5, 11)))
            }
        }

        let nl2trail = Nl2Trail::new(subword(), Box::new(BrokenModel), 16);
        let result = nl2trail.generate("create a cube");
        assert!(matches!(
            result,
            Err(Nl2TrailError::Inference(InferenceError::Shape(_)))
        ));
    }

    #[test]
    fn test_keyword_fallback_path_is_template_based() {
        let calls = Rc::new(Cell::new(0));
        let model = ReplayModel {
            vocab: 64,
            script: vec![20, 1],
            calls: calls.clone(),
        };
        let nl2trail = Nl2Trail::new(Box::new(KeywordTokenizer), Box::new(model), 16);

        // Token 20 is "cube" in the keyword vocabulary, so the cube template comes back.
        let trail = nl2trail.generate("make something").unwrap();
        assert!(trail.ends_with("! Created 50mm cube"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_generate_decodes_generate_ids() {
        let calls = Rc::new(Cell::new(0));
        let nl2trail = generator(vec![9, 2, 10, 1], calls);
        let ids = nl2trail.generate_ids("create a cube").unwrap();
        assert_eq!(ids, vec![9, 2, 10]);
        assert_eq!(
            nl2trail.generate("create a cube").unwrap(),
            subword().decode(&ids).unwrap()
        );
    }

    #[test]
    fn test_keyword_fallback_empty_input_is_empty_trail() {
        let calls = Rc::new(Cell::new(0));
        let model = ReplayModel {
            vocab: 64,
            script: vec![20, 1],
            calls: calls.clone(),
        };
        let nl2trail = Nl2Trail::new(Box::new(KeywordTokenizer), Box::new(model), 16);

        // No template either: empty input never reaches the tokenizer's decode.
        assert_eq!(nl2trail.generate("  ").unwrap(), "");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_from_config_missing_model_fails_before_tokenizer() {
        let config = Nl2TrailConfig {
            model_path: "missing/t5_creo.onnx".into(),
            tokenizer_path: "missing/tokenizer.json".into(),
            ..Nl2TrailConfig::default()
        };
        assert!(matches!(
            Nl2Trail::from_config(&config),
            Err(Nl2TrailError::Inference(InferenceError::Load { .. }))
        ));
    }
}
