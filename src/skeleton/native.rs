use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::geometry::{BBox, Point};
use crate::core::model::{GeometricRegion, RegionId, RegionKind};
use crate::skeleton::LayoutTrack;

/// `{"regions": [...]}`: the crate's own skeleton-stream schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeRegions {
    pub regions: Vec<NativeRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeKind {
    Paragraph,
    #[serde(alias = "table-cell")]
    TableCell,
    Diagram,
    Caption,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeRegion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NativeKind,
    #[serde(default)]
    pub polygon: Vec<Point>,
    /// `[x0, y0, x1, y1]`, used when `polygon` is empty.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub row: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl NativeRegion {
    fn region_kind(&self) -> RegionKind {
        match self.kind {
            NativeKind::Paragraph => RegionKind::Paragraph,
            NativeKind::Diagram => RegionKind::Diagram,
            NativeKind::Caption => RegionKind::Caption,
            NativeKind::Unknown => RegionKind::Unknown,
            NativeKind::TableCell => match (self.row, self.column) {
                (Some(row), Some(column)) => RegionKind::TableCell { row, column },
                _ => {
                    warn!(region = %self.id, "table cell without row/column");
                    RegionKind::Unknown
                }
            },
        }
    }

    fn outline(&self) -> Vec<Point> {
        match (self.polygon.is_empty(), self.bbox) {
            (true, Some([x0, y0, x1, y1])) => BBox::new(x0, y0, x1, y1).to_polygon(),
            _ => self.polygon.clone(),
        }
    }
}

impl LayoutTrack for NativeRegions {
    fn regions(&self) -> Vec<GeometricRegion> {
        self.regions
            .iter()
            .map(|raw| {
                GeometricRegion::new(
                    RegionId::from(raw.id.as_str()),
                    &raw.outline(),
                    raw.region_kind(),
                    raw.confidence,
                )
                .with_parent(raw.parent.as_deref().map(RegionId::from))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_cells_and_boxes() {
        let doc: NativeRegions = serde_json::from_str(
            r#"{"regions": [
                {"id": "p", "type": "paragraph", "polygon": [[0, 0], [10, 0], [10, 10], [0, 10]], "confidence": 0.8},
                {"id": "c", "type": "table-cell", "bbox": [0, 20, 5, 25], "row": 0, "column": 1, "parent": "t"},
                {"id": "x", "type": "table_cell", "bbox": [0, 30, 5, 35]}
            ]}"#,
        )
        .unwrap();
        let regions = doc.regions();

        assert_eq!(regions[0].kind, RegionKind::Paragraph);
        assert_eq!(regions[0].confidence, 0.8);
        assert_eq!(regions[1].kind, RegionKind::TableCell { row: 0, column: 1 });
        assert_eq!(regions[1].polygon, BBox::new(0.0, 20.0, 5.0, 25.0).to_polygon());
        assert_eq!(regions[1].parent, Some(RegionId::from("t")));
        assert_eq!(regions[2].kind, RegionKind::Unknown);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<NativeRegions>(
            r#"{"regions": [{"id": "p", "type": "sidebar"}]}"#,
        );
        assert!(parsed.is_err());
    }
}
