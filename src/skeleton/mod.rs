//! Stream A adapters: layout exports into [`GeometricRegion`]s.

pub mod native;
pub mod textract;

use serde::Deserialize;
use tracing::debug;

use crate::core::error::{FusionError, Result};
use crate::core::model::GeometricRegion;

use native::NativeRegions;
use textract::TextractDocument;

/// A skeleton-stream export that yields regions in document order.
pub trait LayoutTrack {
    fn regions(&self) -> Vec<GeometricRegion>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkeletonDocument {
    Textract(TextractDocument),
    Native(NativeRegions),
}

impl LayoutTrack for SkeletonDocument {
    fn regions(&self) -> Vec<GeometricRegion> {
        match self {
            SkeletonDocument::Textract(doc) => doc.regions(),
            SkeletonDocument::Native(doc) => doc.regions(),
        }
    }
}

/// Parses a layout-stream JSON document in any supported shape.
pub fn parse_regions(raw: &str) -> Result<Vec<GeometricRegion>> {
    let doc: SkeletonDocument = serde_json::from_str(raw).map_err(|source| {
        FusionError::InvalidDocument {
            stream: "layout",
            source,
        }
    })?;
    let regions = doc.regions();
    debug!(count = regions.len(), "parsed layout stream");
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RegionKind;

    #[test]
    fn detects_both_shapes() {
        let textract = parse_regions(
            r#"{"Blocks": [{"Id": "a", "BlockType": "LAYOUT_TEXT",
                "Geometry": {"BoundingBox": {"Width": 0.2, "Height": 0.1, "Left": 0, "Top": 0}}}]}"#,
        )
        .unwrap();
        assert_eq!(textract[0].kind, RegionKind::Paragraph);

        let native =
            parse_regions(r#"{"regions": [{"id": "d", "type": "diagram", "bbox": [0, 0, 1, 1]}]}"#)
                .unwrap();
        assert_eq!(native[0].kind, RegionKind::Diagram);
    }

    #[test]
    fn anything_else_is_fatal() {
        let err = parse_regions(r#"{"tokens": []}"#).unwrap_err();
        assert!(matches!(err, FusionError::InvalidDocument { stream: "layout", .. }));
    }
}
