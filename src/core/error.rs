//! Error taxonomy for the fusion core.
//!
//! Only [`FusionError`] is ever returned as an `Err`. Geometry problems and
//! assignment outcomes are recorded as [`Notice`]s and travel with the output.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::core::model::{RegionId, TokenId};

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("invalid {stream} document: {source}")]
    InvalidDocument {
        stream: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate region identifier: {0}")]
    DuplicateRegion(RegionId),

    #[error("invalid fusion config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FusionError>;

/// Why a polygon cannot take part in containment tests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedGeometry {
    #[error("polygon has {count} point(s), at least 3 required")]
    TooFewPoints { count: usize },

    #[error("polygon encloses no area")]
    ZeroArea,

    #[error("polygon edges cross each other")]
    SelfIntersecting,
}

impl MalformedGeometry {
    pub fn code(&self) -> &'static str {
        match self {
            MalformedGeometry::TooFewPoints { .. } => "malformed_geometry.too_few_points",
            MalformedGeometry::ZeroArea => "malformed_geometry.zero_area",
            MalformedGeometry::SelfIntersecting => "malformed_geometry.self_intersecting",
        }
    }
}

/// Reason a token ended up in the orphan bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    MalformedGeometry(MalformedGeometry),
    /// Neither buffered inclusion nor rescue found an owner.
    Unmatched,
}

impl OrphanReason {
    pub fn code(&self) -> &'static str {
        match self {
            OrphanReason::MalformedGeometry(err) => err.code(),
            OrphanReason::Unmatched => "unmatched",
        }
    }
}

impl Serialize for OrphanReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Non-fatal diagnostics surfaced in the output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Region geometry could not be used; the region is kept but claims no tokens.
    MalformedRegion {
        region: RegionId,
        reason: &'static str,
        detail: String,
    },
    /// A region received zero tokens.
    EmptyRegion { region: RegionId },
    /// A token reached the orphan bucket.
    UnmatchedToken { token: TokenId, reason: OrphanReason },
}

impl Notice {
    pub fn malformed_region(region: RegionId, err: MalformedGeometry) -> Self {
        Notice::MalformedRegion {
            region,
            reason: err.code(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphan_reason_serializes_as_code() {
        let reason = OrphanReason::MalformedGeometry(MalformedGeometry::TooFewPoints { count: 1 });
        assert_eq!(
            serde_json::to_string(&reason).unwrap(),
            "\"malformed_geometry.too_few_points\""
        );
        assert_eq!(OrphanReason::Unmatched.code(), "unmatched");
    }

    #[test]
    fn notices_are_tagged_by_kind() {
        let notice = Notice::EmptyRegion {
            region: RegionId::from("cell-1"),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "empty_region");
        assert_eq!(json["region"], "cell-1");
    }
}
