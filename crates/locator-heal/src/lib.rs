//! Self-healing element location
//!
//! A failed locator is retried through an ordered list of candidates:
//! deterministic rewrites of its value (see [`StrategyGenerator`]) followed
//! by identifiers scraped from the page and ranked by TF-IDF similarity
//! (see [`SimilarityRanker`]). Every attempt and candidate outcome is written
//! to an [`AuditRepository`](healkit_audit_store::AuditRepository).

pub mod config;
pub mod errors;
pub mod markup;
pub mod probe;
pub mod resolver;
pub mod similarity;
pub mod strategies;
pub mod types;

pub use config::{HealConfig, HealSettings, RankedSelector};
pub use errors::{ConfigError, HealError, ProbeFailure, ProbeFailureReason};
pub use markup::{MarkupElement, MarkupProbe};
pub use probe::{ElementProbe, ProbeOutcome};
pub use resolver::HealingResolver;
pub use similarity::{extract_identifiers, IdentifierSource, RankedCandidate, SimilarityRanker};
pub use strategies::{Rewrite, StrategyGenerator, StrategyKind};
pub use types::{Candidate, CandidateOrigin, HealDetails, HealPlan, Located};
