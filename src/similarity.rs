//! Pairwise rack similarity and recommendation ranking.
//!
//! Scores are a weighted sum of three [0, 1] terms: device-type multiset
//! overlap, macro-name set overlap, and complexity proximity. Weights are
//! caller-configurable and never silently renormalized, so a given weight
//! configuration always reproduces the same scores.

use serde::Serialize;
use thiserror::Error;

use crate::features::FeatureVector;

/// Weighting of the three similarity terms.
///
/// Weights are not required to sum to 1, but self-similarity equals 1.0
/// exactly when they do.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimilarityWeights {
    pub device_weight: f64,
    pub macro_weight: f64,
    pub complexity_weight: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            device_weight: 0.5,
            macro_weight: 0.3,
            complexity_weight: 0.2,
        }
    }
}

impl SimilarityWeights {
    /// Reject weights that break the [0, 1]-per-term scoring contract.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("device_weight", self.device_weight),
            ("macro_weight", self.macro_weight),
            ("complexity_weight", self.complexity_weight),
        ] {
            if value < 0.0 {
                return Err(ConfigurationError::NegativeWeight { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("similarity weight {name} must be >= 0, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },
}

/// One ranked candidate with the overlap that produced its score.
#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub score: f64,
    pub shared_devices: Vec<String>,
    pub shared_macros: Vec<String>,
}

/// Device-type multiset overlap: intersection size (min count per shared
/// type) over union size (max count per type). Empty multiset on either
/// side scores 0 by convention.
pub fn device_overlap(a: &FeatureVector, b: &FeatureVector) -> f64 {
    if a.device_counts.is_empty() || b.device_counts.is_empty() {
        return 0.0;
    }
    let mut intersection = 0u32;
    let mut union = 0u32;
    for (device_type, &count_a) in &a.device_counts {
        match b.device_counts.get(device_type) {
            Some(&count_b) => {
                intersection += count_a.min(count_b);
                union += count_a.max(count_b);
            }
            None => union += count_a,
        }
    }
    for (device_type, &count_b) in &b.device_counts {
        if !a.device_counts.contains_key(device_type) {
            union += count_b;
        }
    }
    f64::from(intersection) / f64::from(union)
}

/// Plain-set Jaccard over macro names.
pub fn macro_overlap(a: &FeatureVector, b: &FeatureVector) -> f64 {
    if a.macro_names.is_empty() || b.macro_names.is_empty() {
        return 0.0;
    }
    let intersection = a.macro_names.intersection(&b.macro_names).count();
    let union = a.macro_names.union(&b.macro_names).count();
    intersection as f64 / union as f64
}

/// Complexity proximity: 1 for equal device counts, approaching 0 as the
/// counts diverge.
pub fn complexity_proximity(a: u32, b: u32) -> f64 {
    let diff = f64::from(a.abs_diff(b));
    let max = f64::from(a.max(b).max(1));
    1.0 - (diff / max).min(1.0)
}

/// Weighted similarity of two feature vectors.
pub fn score(a: &FeatureVector, b: &FeatureVector, weights: &SimilarityWeights) -> f64 {
    weights.device_weight * device_overlap(a, b)
        + weights.macro_weight * macro_overlap(a, b)
        + weights.complexity_weight * complexity_proximity(a.complexity, b.complexity)
}

/// Rank `candidates` against a query rack, best first.
///
/// The query is excluded from the pool by identifier, never by content:
/// two distinct racks may legitimately be identical. Ties are broken by
/// ascending identifier so the ordering is reproducible. The returned
/// iterator is finite and re-evaluated from scratch on each call to `rank`;
/// no ranking state is carried between calls. An empty pool yields an
/// empty iterator.
pub fn rank(
    query_id: &str,
    query: &FeatureVector,
    candidates: &[(String, FeatureVector)],
    weights: &SimilarityWeights,
) -> Result<impl Iterator<Item = Recommendation>, ConfigurationError> {
    weights.validate()?;

    let mut scored: Vec<Recommendation> = candidates
        .iter()
        .filter(|(id, _)| id.as_str() != query_id)
        .map(|(id, features)| {
            let shared_devices: Vec<String> = query
                .device_counts
                .keys()
                .filter(|t| features.device_counts.contains_key(*t))
                .cloned()
                .collect();
            let shared_macros: Vec<String> = query
                .macro_names
                .intersection(&features.macro_names)
                .cloned()
                .collect();
            Recommendation {
                id: id.clone(),
                score: score(query, features, weights),
                shared_devices,
                shared_macros,
            }
        })
        .collect();

    scored.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then_with(|| x.id.cmp(&y.id))
    });
    Ok(scored.into_iter())
}
