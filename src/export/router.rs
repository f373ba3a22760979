//! Serialization Router: turns a [`FusionMapping`] into a [`FusedPage`],
//! picking the serialization strategy from each region's structural type.

use std::collections::HashMap;

use crate::core::config::FusionConfig;
use crate::core::model::{
    FusedPage, FusedRegion, FusionMapping, GeometricRegion, LinguisticToken, RegionContent,
    RegionKind, TokenId, UnmatchedToken,
};
use crate::fusion::index::RegionIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Reading-order text, line break whenever the band changes.
    FlowText,
    /// One (row, column) entry; empty cells keep an empty string.
    GridEntry,
    /// Labels without an implied reading order.
    LabelSet,
}

impl Strategy {
    pub fn for_kind(kind: &RegionKind) -> Self {
        match kind {
            RegionKind::Paragraph => Strategy::FlowText,
            RegionKind::Caption => Strategy::FlowText,
            RegionKind::Unknown => Strategy::FlowText,
            RegionKind::TableCell { .. } => Strategy::GridEntry,
            RegionKind::Diagram => Strategy::LabelSet,
        }
    }
}

pub struct SerializationRouter<'a> {
    tokens: HashMap<TokenId, &'a LinguisticToken>,
}

impl<'a> SerializationRouter<'a> {
    pub fn new(tokens: &'a [LinguisticToken]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn route(
        &self,
        page: &str,
        config: &FusionConfig,
        index: &RegionIndex,
        mapping: &FusionMapping,
    ) -> FusedPage {
        let regions = index
            .iter()
            .map(|region| self.route_region(region, mapping))
            .collect();

        let unmatched_tokens = mapping
            .orphans
            .iter()
            .filter_map(|orphan| {
                self.tokens.get(&orphan.token).map(|t| UnmatchedToken {
                    id: t.id,
                    text: t.text.clone(),
                    polygon: t.polygon.clone(),
                    confidence: t.confidence,
                    reason: orphan.reason,
                })
            })
            .collect();

        FusedPage {
            page: page.to_string(),
            config: *config,
            metrics: mapping.metrics,
            regions,
            unmatched_tokens,
            notices: mapping.notices.clone(),
        }
    }

    fn route_region(&self, region: &GeometricRegion, mapping: &FusionMapping) -> FusedRegion {
        let ids = mapping.tokens_of(&region.id);
        let tokens: Vec<&LinguisticToken> =
            ids.iter().filter_map(|id| self.tokens.get(id).copied()).collect();

        let content = match Strategy::for_kind(&region.kind) {
            Strategy::FlowText => RegionContent::Text {
                text: flow_text(&tokens, mapping),
            },
            Strategy::GridEntry => {
                let (row, column) = match region.kind {
                    RegionKind::TableCell { row, column } => (row, column),
                    _ => (0, 0),
                };
                RegionContent::GridEntry {
                    row,
                    column,
                    text: join_words(&tokens),
                }
            }
            Strategy::LabelSet => RegionContent::Labels {
                labels: tokens.iter().map(|t| t.text.clone()).collect(),
            },
        };

        FusedRegion {
            id: region.id.clone(),
            kind: region.kind,
            confidence: region.confidence,
            token_confidence: mean_confidence(&tokens),
            parent: region.parent.clone(),
            polygon: region.polygon.clone(),
            token_ids: ids.to_vec(),
            content,
        }
    }

}

/// Words joined by spaces, with a line break wherever the line band the
/// fusion step recorded changes.
fn flow_text(tokens: &[&LinguisticToken], mapping: &FusionMapping) -> String {
    let mut text = String::new();
    let mut previous_band = None;
    for token in tokens {
        let band = mapping.band_of(token.id);
        match previous_band {
            None => {}
            Some(prev) if prev != band => text.push('\n'),
            Some(_) => text.push(' '),
        }
        text.push_str(&token.text);
        previous_band = Some(band);
    }
    text
}

fn join_words(tokens: &[&LinguisticToken]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mean_confidence(tokens: &[&LinguisticToken]) -> Option<f64> {
    if tokens.is_empty() {
        return None;
    }
    Some(tokens.iter().map(|t| t.confidence).sum::<f64>() / tokens.len() as f64)
}
