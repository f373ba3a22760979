use serde::{Deserialize, Serialize};

use crate::core::geometry::{BBox, Point};
use crate::core::model::{LinguisticToken, TokenId, TokenMeta};
use crate::ocr::normalize::normalize_text;
use crate::ocr::OcrTrack;

/// `{"tokens": [...]}`: the crate's own muscle-stream schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeTokens {
    pub tokens: Vec<NativeToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeToken {
    pub text: String,
    #[serde(default)]
    pub polygon: Vec<Point>,
    /// `[x0, y0, x1, y1]`, used when `polygon` is empty.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl NativeToken {
    fn outline(&self) -> Vec<Point> {
        match (self.polygon.is_empty(), self.bbox) {
            (true, Some([x0, y0, x1, y1])) => BBox::new(x0, y0, x1, y1).to_polygon(),
            _ => self.polygon.clone(),
        }
    }
}

impl OcrTrack for NativeTokens {
    fn tokens(&self, first_id: u32) -> Vec<LinguisticToken> {
        self.tokens
            .iter()
            .zip(first_id..)
            .map(|(raw, id)| {
                LinguisticToken::new(TokenId(id), normalize_text(&raw.text), raw.outline(), raw.confidence)
                    .with_meta(TokenMeta {
                        break_after: None,
                        language: raw.language.clone(),
                    })
            })
            .collect()
    }
}
