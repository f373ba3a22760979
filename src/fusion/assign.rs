use crate::core::error::OrphanReason;
use crate::core::geometry;
use crate::core::model::{LinguisticToken, RegionId};
use crate::fusion::index::RegionIndex;

/// Outcome of placing one token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment<'a> {
    /// Buffered centroid fell inside the region.
    Included(&'a RegionId),
    /// No region contained the centroid; nearest region within the rescue
    /// tolerance took it.
    Rescued(&'a RegionId),
    Orphaned(OrphanReason),
}

/// Median vertical extent of the well-formed tokens; 0 when there are none.
pub fn median_token_height(tokens: &[LinguisticToken]) -> f64 {
    let mut heights: Vec<f64> = tokens
        .iter()
        .filter(|t| geometry::validate_token_polygon(&t.polygon).is_ok())
        .map(LinguisticToken::height)
        .collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(f64::total_cmp);
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) * 0.5
    } else {
        heights[mid]
    }
}

/// Places a token by centroid inclusion, falling back to the rescue search.
pub fn assign_token<'a>(
    index: &'a RegionIndex,
    token: &LinguisticToken,
    buffer: f64,
    rescue: f64,
) -> Assignment<'a> {
    if let Err(err) = geometry::validate_token_polygon(&token.polygon) {
        return Assignment::Orphaned(OrphanReason::MalformedGeometry(err));
    }
    let Some(center) = token.centroid() else {
        return Assignment::Orphaned(OrphanReason::Unmatched);
    };

    if let Some(owner) = index.query(center, buffer).into_iter().next() {
        return Assignment::Included(owner);
    }
    match index.nearest(center, buffer, rescue) {
        Some(owner) => Assignment::Rescued(owner),
        None => Assignment::Orphaned(OrphanReason::Unmatched),
    }
}
