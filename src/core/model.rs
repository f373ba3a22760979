use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::core::config::FusionConfig;
use crate::core::error::{Notice, OrphanReason};
use crate::core::geometry::{self, BBox, Point};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub String);

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RegionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u32);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Structural type of a skeleton region. Table cells carry their grid
/// coordinates (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Paragraph,
    TableCell { row: u32, column: u32 },
    Diagram,
    Caption,
    Unknown,
}

impl RegionKind {
    pub fn label(&self) -> &'static str {
        match self {
            RegionKind::Paragraph => "paragraph",
            RegionKind::TableCell { .. } => "table_cell",
            RegionKind::Diagram => "diagram",
            RegionKind::Caption => "caption",
            RegionKind::Unknown => "unknown",
        }
    }
}

impl Serialize for RegionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A structural region from the skeleton stream.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricRegion {
    pub id: RegionId,
    pub polygon: Vec<Point>,
    pub kind: RegionKind,
    pub confidence: f64,
    /// Enclosing structure (e.g. the table a cell belongs to), when the
    /// skeleton stream reports one.
    pub parent: Option<RegionId>,
}

impl GeometricRegion {
    /// Builds a region, dropping repeated vertices from the outline.
    pub fn new(id: RegionId, polygon: &[Point], kind: RegionKind, confidence: f64) -> Self {
        Self {
            id,
            polygon: geometry::dedup_vertices(polygon),
            kind,
            confidence,
            parent: None,
        }
    }

    pub fn from_bbox(id: RegionId, bbox: BBox, kind: RegionKind, confidence: f64) -> Self {
        Self::new(id, &bbox.to_polygon(), kind, confidence)
    }

    pub fn with_parent(mut self, parent: Option<RegionId>) -> Self {
        self.parent = parent;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    Space,
    SureSpace,
    EolSureSpace,
    Hyphen,
    LineBreak,
}

impl BreakType {
    /// Maps a Vision `detectedBreak.type` value.
    pub fn from_vision(value: &str) -> Option<Self> {
        match value {
            "SPACE" => Some(BreakType::Space),
            "SURE_SPACE" => Some(BreakType::SureSpace),
            "EOL_SURE_SPACE" => Some(BreakType::EolSureSpace),
            "HYPHEN" => Some(BreakType::Hyphen),
            "LINE_BREAK" => Some(BreakType::LineBreak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_after: Option<BreakType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A recognized token from the muscle stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LinguisticToken {
    pub id: TokenId,
    pub text: String,
    pub polygon: Vec<Point>,
    pub confidence: f64,
    pub meta: TokenMeta,
}

impl LinguisticToken {
    pub fn new(id: TokenId, text: impl Into<String>, polygon: Vec<Point>, confidence: f64) -> Self {
        Self {
            id,
            text: text.into(),
            polygon,
            confidence,
            meta: TokenMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: TokenMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn centroid(&self) -> Option<Point> {
        geometry::centroid(&self.polygon)
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.polygon)
    }

    pub fn height(&self) -> f64 {
        self.bbox().map(|b| b.height()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orphan {
    pub token: TokenId,
    pub reason: OrphanReason,
}

/// Per-page quantities derived from the token stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PageMetrics {
    pub median_token_height: f64,
    pub tolerance_buffer: f64,
    pub rescue_tolerance: f64,
    pub band_height: f64,
}

/// Region → ordered token ids, plus the orphan bucket. Regions appear in
/// ingestion order and every ingested region has an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionMapping {
    pub assignments: IndexMap<RegionId, Vec<TokenId>>,
    /// Line band of each assigned token within its region.
    pub bands: BTreeMap<TokenId, u32>,
    pub orphans: Vec<Orphan>,
    pub metrics: PageMetrics,
    pub notices: Vec<Notice>,
}

impl FusionMapping {
    pub fn tokens_of(&self, region: &RegionId) -> &[TokenId] {
        self.assignments
            .get(region)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn owner_of(&self, token: TokenId) -> Option<&RegionId> {
        self.assignments
            .iter()
            .find(|(_, tokens)| tokens.contains(&token))
            .map(|(region, _)| region)
    }

    pub fn band_of(&self, token: TokenId) -> Option<u32> {
        self.bands.get(&token).copied()
    }

    pub fn is_orphan(&self, token: TokenId) -> bool {
        self.orphans.iter().any(|o| o.token == token)
    }
}

/// Serialized form of one region after routing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RegionContent {
    Text { text: String },
    GridEntry { row: u32, column: u32, text: String },
    Labels { labels: Vec<String> },
}

impl RegionContent {
    pub fn is_empty(&self) -> bool {
        match self {
            RegionContent::Text { text } | RegionContent::GridEntry { text, .. } => text.is_empty(),
            RegionContent::Labels { labels } => labels.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedRegion {
    pub id: RegionId,
    #[serde(rename = "type")]
    pub kind: RegionKind,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<RegionId>,
    pub polygon: Vec<Point>,
    pub token_ids: Vec<TokenId>,
    pub content: RegionContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedToken {
    pub id: TokenId,
    pub text: String,
    pub polygon: Vec<Point>,
    pub confidence: f64,
    pub reason: OrphanReason,
}

/// Final per-page document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedPage {
    pub page: String,
    pub config: FusionConfig,
    pub metrics: PageMetrics,
    pub regions: Vec<FusedRegion>,
    pub unmatched_tokens: Vec<UnmatchedToken>,
    pub notices: Vec<Notice>,
}

impl FusedPage {
    pub fn region(&self, id: &str) -> Option<&FusedRegion> {
        self.regions.iter().find(|r| r.id.0 == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_kind_serializes_as_label() {
        let kind = RegionKind::TableCell { row: 0, column: 1 };
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"table_cell\"");
    }

    #[test]
    fn region_new_drops_closing_vertex() {
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        let region = GeometricRegion::new(RegionId::from("r"), &poly, RegionKind::Paragraph, 1.0);
        assert_eq!(region.polygon.len(), 3);
    }

    #[test]
    fn content_is_tagged_by_strategy() {
        let content = RegionContent::GridEntry {
            row: 0,
            column: 1,
            text: String::new(),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["strategy"], "grid_entry");
        assert_eq!(json["text"], "");
    }
}
