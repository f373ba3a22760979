pub mod assign;
pub mod index;
pub mod order;

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::core::config::FusionConfig;
use crate::core::error::Notice;
use crate::core::model::{FusionMapping, LinguisticToken, Orphan, PageMetrics, RegionId, TokenId};
use crate::fusion::assign::Assignment;
use crate::fusion::index::RegionIndex;

pub trait FusionEngine {
    fn fuse(&self, index: &RegionIndex, tokens: &[LinguisticToken]) -> FusionMapping;
}

/// Assigns every token to the smallest region whose buffered outline holds
/// its centroid, with a nearest-region rescue and an orphan bucket.
#[derive(Debug, Clone, Default)]
pub struct CentroidFusionEngine {
    config: FusionConfig,
}

impl CentroidFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn metrics(&self, tokens: &[LinguisticToken]) -> PageMetrics {
        let median = assign::median_token_height(tokens);
        let buffer = self.config.tolerance_fraction * median;
        PageMetrics {
            median_token_height: median,
            tolerance_buffer: buffer,
            rescue_tolerance: self.config.rescue_multiplier * buffer,
            band_height: order::effective_band_height(self.config.band_height, median),
        }
    }
}

impl FusionEngine for CentroidFusionEngine {
    fn fuse(&self, index: &RegionIndex, tokens: &[LinguisticToken]) -> FusionMapping {
        let metrics = self.metrics(tokens);
        let mut assignments: IndexMap<RegionId, Vec<TokenId>> =
            index.iter().map(|r| (r.id.clone(), Vec::new())).collect();
        let mut orphans = Vec::new();
        let mut notices = index.notices().to_vec();

        // Token order is fixed by id so the result never depends on how the
        // stream happened to list them.
        let mut ordered: Vec<&LinguisticToken> = tokens.iter().collect();
        ordered.sort_by_key(|t| t.id);

        let mut rescued = 0usize;
        for token in &ordered {
            let assignment = assign::assign_token(
                index,
                token,
                metrics.tolerance_buffer,
                metrics.rescue_tolerance,
            );
            match assignment {
                Assignment::Included(region) | Assignment::Rescued(region) => {
                    if matches!(assignment, Assignment::Rescued(_)) {
                        debug!(token = %token.id, region = %region, "token rescued by nearest region");
                        rescued += 1;
                    }
                    if let Some(bucket) = assignments.get_mut(region) {
                        bucket.push(token.id);
                    }
                }
                Assignment::Orphaned(reason) => {
                    warn!(token = %token.id, text = %token.text, reason = reason.code(), "token left unmatched");
                    orphans.push(Orphan {
                        token: token.id,
                        reason,
                    });
                    notices.push(Notice::UnmatchedToken {
                        token: token.id,
                        reason,
                    });
                }
            }
        }

        let lookup: HashMap<TokenId, &LinguisticToken> =
            ordered.iter().map(|t| (t.id, *t)).collect();
        let mut bands = BTreeMap::new();
        for ids in assignments.values_mut() {
            let line_bands = order::sort_reading_order(ids, &lookup, metrics.band_height);
            bands.extend(ids.iter().copied().zip(line_bands));
        }

        for (region, ids) in &assignments {
            if ids.is_empty() {
                notices.push(Notice::EmptyRegion {
                    region: region.clone(),
                });
            }
        }

        info!(
            regions = index.len(),
            tokens = tokens.len(),
            rescued,
            orphans = orphans.len(),
            buffer = metrics.tolerance_buffer,
            "fused page"
        );

        FusionMapping {
            assignments,
            bands,
            orphans,
            metrics,
            notices,
        }
    }
}
