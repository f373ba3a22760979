//! Reading order inside a region: line band first, then left edge, then id.
//!
//! Bands are clustered from the region's own tokens. Walking the tokens top
//! to bottom, a new band opens only once a token's top is at least one band
//! height below the first top of the current band, so two words on one line
//! never split just because they straddle a multiple of the band height.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::model::{LinguisticToken, TokenId};

/// Band height actually used for clustering.
pub fn effective_band_height(configured: Option<f64>, median_token_height: f64) -> f64 {
    let band = configured.unwrap_or(median_token_height);
    if band.is_finite() && band > 0.0 {
        band
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    top: f64,
    left: f64,
    id: TokenId,
}

impl Placement {
    fn of(id: TokenId, tokens: &HashMap<TokenId, &LinguisticToken>) -> Self {
        let bbox = tokens.get(&id).and_then(|t| t.bbox());
        Self {
            top: bbox.map(|b| b.y0).unwrap_or(f64::INFINITY),
            left: bbox.map(|b| b.x0).unwrap_or(f64::INFINITY),
            id,
        }
    }

    fn vertical(&self, other: &Self) -> Ordering {
        self.top
            .total_cmp(&other.top)
            .then(self.left.total_cmp(&other.left))
            .then(self.id.cmp(&other.id))
    }
}

/// Sorts `ids` in place and returns the line band of each, index-aligned
/// with the sorted ids. Ids missing from `tokens` land in trailing bands.
pub fn sort_reading_order(
    ids: &mut [TokenId],
    tokens: &HashMap<TokenId, &LinguisticToken>,
    band_height: f64,
) -> Vec<u32> {
    let mut placed: Vec<Placement> = ids.iter().map(|id| Placement::of(*id, tokens)).collect();
    placed.sort_by(Placement::vertical);

    let mut banded: Vec<(u32, Placement)> = Vec::with_capacity(placed.len());
    let mut band = 0u32;
    let mut band_top: Option<f64> = None;
    for placement in placed {
        match band_top {
            None => band_top = Some(placement.top),
            Some(top) if placement.top - top < band_height => {}
            Some(_) => {
                band += 1;
                band_top = Some(placement.top);
            }
        }
        banded.push((band, placement));
    }

    banded.sort_by(|(band_a, a), (band_b, b)| {
        band_a
            .cmp(band_b)
            .then(a.left.total_cmp(&b.left))
            .then(a.id.cmp(&b.id))
    });
    for (slot, (_, placement)) in ids.iter_mut().zip(&banded) {
        *slot = placement.id;
    }
    banded.into_iter().map(|(band, _)| band).collect()
}
