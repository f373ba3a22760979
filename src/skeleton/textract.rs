//! AWS Textract `AnalyzeDocument` export (layout + tables).
//!
//! Only layout, table and cell blocks become regions. Coordinates are
//! page-normalized already; confidence is rescaled from 0-100 to 0-1.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::core::geometry::{BBox, Point};
use crate::core::model::{GeometricRegion, RegionId, RegionKind};
use crate::skeleton::LayoutTrack;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractDocument {
    pub blocks: Vec<TextractBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractBlock {
    pub id: String,
    pub block_type: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub geometry: Option<TextractGeometry>,
    #[serde(default)]
    pub row_index: Option<u32>,
    #[serde(default)]
    pub column_index: Option<u32>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractGeometry {
    #[serde(default)]
    pub bounding_box: Option<TextractBox>,
    #[serde(default)]
    pub polygon: Vec<TextractPoint>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractBox {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextractPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Relationship types through which a table owns its parts.
const TABLE_PARTS: &[&str] = &["CHILD", "MERGED_CELL", "TABLE_TITLE", "TABLE_FOOTER"];

impl TextractBlock {
    /// Structural type for region blocks, `None` for everything else
    /// (`PAGE`, `LINE`, `WORD`, selection elements, ...).
    pub fn region_kind(&self) -> Option<RegionKind> {
        let kind = match self.block_type.as_str() {
            "LAYOUT_TEXT" | "LAYOUT_TITLE" | "LAYOUT_SECTION_HEADER" | "LAYOUT_HEADER"
            | "LAYOUT_FOOTER" | "LAYOUT_PAGE_NUMBER" | "LAYOUT_LIST" | "LAYOUT_KEY_VALUE" => {
                RegionKind::Paragraph
            }
            "LAYOUT_FIGURE" => RegionKind::Diagram,
            "TABLE_TITLE" | "TABLE_FOOTER" => RegionKind::Caption,
            // a merged cell spans cells that are reported on their own
            "TABLE" | "LAYOUT_TABLE" | "MERGED_CELL" => RegionKind::Unknown,
            "CELL" => match (self.row_index, self.column_index) {
                (Some(row), Some(column)) if row > 0 && column > 0 => RegionKind::TableCell {
                    row: row - 1,
                    column: column - 1,
                },
                _ => {
                    warn!(block = %self.id, "table cell without usable row/column indices");
                    RegionKind::Unknown
                }
            },
            _ => return None,
        };
        Some(kind)
    }

    fn polygon(&self) -> Vec<Point> {
        let Some(geometry) = &self.geometry else {
            return Vec::new();
        };
        if !geometry.polygon.is_empty() {
            return geometry.polygon.iter().map(|p| Point::new(p.x, p.y)).collect();
        }
        geometry
            .bounding_box
            .map(|b| BBox::new(b.left, b.top, b.left + b.width, b.top + b.height).to_polygon())
            .unwrap_or_default()
    }

    fn confidence(&self) -> f64 {
        self.confidence.map_or(1.0, |c| (c / 100.0).clamp(0.0, 1.0))
    }
}

impl TextractDocument {
    fn parents(&self) -> HashMap<&str, &str> {
        let mut parents = HashMap::new();
        for table in self.blocks.iter().filter(|b| b.block_type == "TABLE") {
            for rel in table
                .relationships
                .iter()
                .filter(|r| TABLE_PARTS.contains(&r.kind.as_str()))
            {
                for id in &rel.ids {
                    parents.insert(id.as_str(), table.id.as_str());
                }
            }
        }
        parents
    }
}

impl LayoutTrack for TextractDocument {
    fn regions(&self) -> Vec<GeometricRegion> {
        let parents = self.parents();
        self.blocks
            .iter()
            .filter_map(|block| {
                let kind = block.region_kind()?;
                let parent = parents.get(block.id.as_str()).map(|p| RegionId::from(*p));
                Some(
                    GeometricRegion::new(
                        RegionId::from(block.id.as_str()),
                        &block.polygon(),
                        kind,
                        block.confidence(),
                    )
                    .with_parent(parent),
                )
            })
            .collect()
    }
}
