//! Candidate and result types for locator healing

use healkit_core_types::{AttemptId, Locator};
use serde::Serialize;

use crate::similarity::IdentifierSource;
use crate::strategies::StrategyKind;

/// Where a healing candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", content = "detail", rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Deterministic rewrite of the failed value
    Strategy(StrategyKind),
    /// Identifier ranked by TF-IDF similarity
    Similarity(IdentifierSource),
}

impl CandidateOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            CandidateOrigin::Strategy(kind) => kind.name(),
            CandidateOrigin::Similarity(IdentifierSource::Id) => "similarity:id",
            CandidateOrigin::Similarity(IdentifierSource::Class) => "similarity:class",
        }
    }
}

/// Locator to probe while healing, with the score recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub locator: Locator,
    pub origin: CandidateOrigin,
    pub score: f64,
}

/// Ordered candidate list for one failed locator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealPlan {
    pub original: Locator,
    pub candidates: Vec<Candidate>,
    /// Whether page markup was available for similarity ranking.
    pub markup_ranked: bool,
}

impl HealPlan {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// How a locator was healed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealDetails {
    pub original: Locator,
    pub origin: CandidateOrigin,
    pub score: f64,
    /// Candidates probed, including the one that resolved.
    pub candidates_tried: usize,
}

/// Successful `locate` result.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<H> {
    pub handle: H,
    /// Locator that resolved: the primary one, or the healed candidate.
    pub locator: Locator,
    /// Audit attempt id, absent when the attempt insert failed.
    pub attempt_id: Option<AttemptId>,
    pub heal: Option<HealDetails>,
}

impl<H> Located<H> {
    pub fn was_healed(&self) -> bool {
        self.heal.is_some()
    }
}
