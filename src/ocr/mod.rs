//! Stream B adapters: token-level OCR exports into [`LinguisticToken`]s.

pub mod native;
pub mod normalize;
pub mod vision;

use serde::Deserialize;
use tracing::debug;

use crate::core::error::{FusionError, Result};
use crate::core::model::LinguisticToken;

use native::NativeTokens;
use vision::{FullTextAnnotation, VisionResponse};

/// A muscle-stream export that can be flattened into tokens. Ids are dense
/// and start at `first_id`.
pub trait OcrTrack {
    fn tokens(&self, first_id: u32) -> Vec<LinguisticToken>;
}

/// Shapes accepted for the token stream, tried in declaration order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MuscleDocument {
    Native(NativeTokens),
    VisionBatch {
        responses: Vec<VisionResponse>,
    },
    Vision {
        #[serde(rename = "fullTextAnnotation")]
        full_text_annotation: FullTextAnnotation,
    },
}

impl OcrTrack for MuscleDocument {
    fn tokens(&self, first_id: u32) -> Vec<LinguisticToken> {
        match self {
            MuscleDocument::Native(doc) => doc.tokens(first_id),
            MuscleDocument::Vision {
                full_text_annotation,
            } => full_text_annotation.tokens(first_id),
            MuscleDocument::VisionBatch { responses } => {
                let mut tokens: Vec<LinguisticToken> = Vec::new();
                for annotation in responses.iter().filter_map(|r| r.full_text_annotation.as_ref()) {
                    let next = tokens.last().map_or(first_id, |t| t.id.0 + 1);
                    tokens.extend(annotation.tokens(next));
                }
                tokens
            }
        }
    }
}

/// Parses a token-stream JSON document in any supported shape.
pub fn parse_tokens(raw: &str) -> Result<Vec<LinguisticToken>> {
    let doc: MuscleDocument = serde_json::from_str(raw).map_err(|source| {
        FusionError::InvalidDocument {
            stream: "tokens",
            source,
        }
    })?;
    let tokens = doc.tokens(0);
    debug!(count = tokens.len(), "parsed token stream");
    Ok(tokens)
}
