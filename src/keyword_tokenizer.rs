//! Keyword fallback tokenizer.
//!
//! Splits on whitespace against a small fixed CAD vocabulary. Its `decode` is **not** an
//! inverse of `encode`: it scans the ids for recognised shape keywords and returns a canned
//! trail template. Output is unrelated to model inference and is only good for smoke-testing
//! a build that has no real tokenizer artifact. Keep its expectations out of golden tests.

use log::warn;
use std::path::Path;

use crate::error::TokenizerError;
use crate::tokenizer::{TrailTokenizer, UNK_TOKEN_ID};

const KEYWORD_VOCAB: &[&str] = &[
    "<pad>", "<eos>", "<unk>",
    "create", "sketch", "extrude", "revolve", "sweep", "blend",
    "circle", "rectangle", "line", "arc", "spline", "point",
    "dimension", "constraint", "pattern", "mirror", "copy",
    "cube", "cylinder", "sphere", "cone", "torus",
    "mm", "inch", "degree", "radius", "diameter", "length",
    "width", "height", "depth", "angle", "distance",
    "feature", "surface", "solid", "assembly", "part",
    "modify", "edit", "delete", "hide", "show", "zoom",
    "view", "rotate", "translate", "scale", "measure",
];

const CUBE_TRAIL: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate sketch\n\
~ Command `ProCmdSquare`\n\
~ Create square sketch\n\
~ Command `ProCmdDimLinear`\n\
~ Set dimension 50mm\n\
~ Command `ProCmdSketchDone`\n\
~ Exit sketch\n\
~ Command `ProCmdExtrude`\n\
~ Extrude 50mm\n\
~ Command `ProCmdFeatureDone`\n\
! Created 50mm cube";

const CIRCLE_TRAIL: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate sketch\n\
~ Command `ProCmdCircle`\n\
~ Create circle\n\
~ Command `ProCmdDimDiameter`\n\
~ Set diameter\n\
~ Command `ProCmdSketchDone`\n\
! Created circle";

const RECTANGLE_TRAIL: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate sketch\n\
~ Command `ProCmdRectangle`\n\
~ Create rectangle\n\
~ Command `ProCmdDimLinear`\n\
~ Set dimensions\n\
~ Command `ProCmdSketchDone`\n\
! Created rectangle";

const GENERIC_TRAIL: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate modeling environment\n\
! Ready for feature creation";

#[derive(Debug, Default)]
pub struct KeywordTokenizer;

impl KeywordTokenizer {
    /// Always succeeds; the path is accepted for interface parity and ignored.
    pub fn load(_path: &Path) -> Self {
        warn!("Using keyword fallback tokenizer: output is a canned template, not a model decode");
        Self
    }

    fn token_id(word: &str) -> u32 {
        KEYWORD_VOCAB
            .iter()
            .position(|&entry| entry == word)
            .map(|idx| idx as u32)
            .unwrap_or(UNK_TOKEN_ID)
    }

    fn token(id: u32) -> Option<&'static str> {
        KEYWORD_VOCAB.get(id as usize).copied()
    }
}

impl TrailTokenizer for KeywordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        Ok(text
            .split_whitespace()
            .map(|word| Self::token_id(&word.to_lowercase()))
            .collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, TokenizerError> {
        let has = |keyword: &str| ids.iter().any(|&id| Self::token(id) == Some(keyword));

        let template = if has("cube") {
            CUBE_TRAIL
        } else if has("circle") {
            CIRCLE_TRAIL
        } else if has("rectangle") {
            RECTANGLE_TRAIL
        } else {
            GENERIC_TRAIL
        };
        Ok(template.to_string())
    }

    fn vocab_size(&self) -> usize {
        KEYWORD_VOCAB.len()
    }
}
