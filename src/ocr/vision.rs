//! Google Cloud Vision `fullTextAnnotation` export (document text detection).
//!
//! One token per `word`. Pixel vertices are divided by the page size so the
//! tokens share the page-normalized frame of the layout stream.

use serde::Deserialize;
use tracing::warn;

use crate::core::geometry::Point;
use crate::core::model::{BreakType, LinguisticToken, TokenId, TokenMeta};
use crate::ocr::normalize::normalize_text;
use crate::ocr::OcrTrack;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionResponse {
    #[serde(default)]
    pub full_text_annotation: Option<FullTextAnnotation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub pages: Vec<VisionPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionPage {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub blocks: Vec<VisionBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionBlock {
    #[serde(default)]
    pub paragraphs: Vec<VisionParagraph>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionParagraph {
    #[serde(default)]
    pub words: Vec<VisionWord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionWord {
    #[serde(default)]
    pub symbols: Vec<VisionSymbol>,
    #[serde(default)]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub property: Option<TextProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionSymbol {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub property: Option<TextProperty>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperty {
    #[serde(default)]
    pub detected_languages: Vec<DetectedLanguage>,
    #[serde(default)]
    pub detected_break: Option<DetectedBreak>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    pub language_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectedBreak {
    #[serde(rename = "type", alias = "type_", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub normalized_vertices: Vec<Vertex>,
}

/// Vision omits zero coordinates, hence the defaults.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Flattens pages → blocks → paragraphs → words in stream order.
impl OcrTrack for FullTextAnnotation {
    fn tokens(&self, first_id: u32) -> Vec<LinguisticToken> {
        let mut tokens = Vec::new();
        let mut next_id = first_id;

        for page in &self.pages {
            let (width, height) = page_size(page);
            for word in page
                .blocks
                .iter()
                .flat_map(|b| b.paragraphs.iter())
                .flat_map(|p| p.words.iter())
            {
                let token = LinguisticToken::new(
                    TokenId(next_id),
                    word_text(word),
                    word_polygon(word, width, height),
                    word.confidence.unwrap_or(1.0),
                )
                .with_meta(word_meta(word));
                tokens.push(token);
                next_id += 1;
            }
        }

        tokens
    }
}

fn page_size(page: &VisionPage) -> (f64, f64) {
    let width = if page.width > 0.0 { page.width } else { 1.0 };
    let height = if page.height > 0.0 { page.height } else { 1.0 };
    if page.width <= 0.0 || page.height <= 0.0 {
        warn!(
            width = page.width,
            height = page.height,
            "vision page without dimensions, pixel coordinates kept as-is"
        );
    }
    (width, height)
}

fn word_text(word: &VisionWord) -> String {
    let raw: String = word.symbols.iter().map(|s| s.text.as_str()).collect();
    normalize_text(&raw)
}

fn word_polygon(word: &VisionWord, width: f64, height: f64) -> Vec<Point> {
    let Some(poly) = &word.bounding_box else {
        return Vec::new();
    };
    if !poly.vertices.is_empty() {
        poly.vertices
            .iter()
            .map(|v| Point::new(v.x / width, v.y / height))
            .collect()
    } else {
        poly.normalized_vertices
            .iter()
            .map(|v| Point::new(v.x, v.y))
            .collect()
    }
}

fn word_meta(word: &VisionWord) -> TokenMeta {
    let break_after = word
        .symbols
        .last()
        .and_then(|s| s.property.as_ref())
        .and_then(|p| p.detected_break.as_ref())
        .and_then(|b| BreakType::from_vision(&b.kind));
    let language = word
        .property
        .as_ref()
        .and_then(|p| p.detected_languages.first())
        .map(|l| l.language_code.clone());
    TokenMeta {
        break_after,
        language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "pages": [{
            "width": 1000, "height": 2000,
            "blocks": [{"paragraphs": [{"words": [
                {
                    "boundingBox": {"vertices": [{"x": 100, "y": 200}, {"x": 300, "y": 200}, {"x": 300, "y": 260}, {"y": 260, "x": 100}]},
                    "confidence": 0.97,
                    "property": {"detectedLanguages": [{"languageCode": "kk"}]},
                    "symbols": [
                        {"text": "Т"}, {"text": "і"}, {"text": "л"},
                        {"text": "і", "property": {"detectedBreak": {"type": "SPACE"}}}
                    ]
                },
                {
                    "boundingBox": {"vertices": [{}, {"x": 50}, {"x": 50, "y": 40}, {"y": 40}]},
                    "symbols": [{"text": "и"}, {"text": "\u0306"}]
                }
            ]}]}]
        }]
    }"#;

    #[test]
    fn flattens_words_into_normalized_tokens() {
        let annotation: FullTextAnnotation = serde_json::from_str(SAMPLE).unwrap();
        let tokens = annotation.tokens(0);

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].id, TokenId(0));
        assert_eq!(tokens[0].text, "Тілі");
        assert_eq!(tokens[0].polygon[0], Point::new(0.1, 0.1));
        assert_eq!(tokens[0].polygon[2], Point::new(0.3, 0.13));
        assert_eq!(tokens[0].confidence, 0.97);
        assert_eq!(tokens[0].meta.break_after, Some(BreakType::Space));
        assert_eq!(tokens[0].meta.language.as_deref(), Some("kk"));

        assert_eq!(tokens[1].text, "й");
        assert_eq!(tokens[1].polygon[0], Point::new(0.0, 0.0));
        assert_eq!(tokens[1].confidence, 1.0);
    }

    #[test]
    fn word_without_box_yields_empty_polygon() {
        let word: VisionWord = serde_json::from_str(r#"{"symbols": [{"text": "а"}]}"#).unwrap();
        assert!(word_polygon(&word, 10.0, 10.0).is_empty());
    }
}
