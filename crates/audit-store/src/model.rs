use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use healkit_core_types::{AttemptId, HealStatus, Locator, OutcomeId};

pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Selects stored attempts, newest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttemptQuery {
    /// Case-insensitive substring match on the element name.
    pub element_name: Option<String>,
    pub limit: usize,
}

impl Default for AttemptQuery {
    fn default() -> Self {
        Self {
            element_name: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Selects joined healing history rows, newest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub element_name: Option<String>,
    pub status: Option<HealStatus>,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            element_name: None,
            status: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// One outcome row joined with the attempt it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealingHistoryRow {
    pub outcome_id: OutcomeId,
    pub attempt_id: AttemptId,
    pub element_name: String,
    pub original: Locator,
    pub page_context: String,
    pub candidate: Locator,
    pub similarity_score: f64,
    pub status: HealStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters over the whole audit trail.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_attempts: u64,
    /// Attempts whose primary probe failed and produced outcome rows.
    pub attempts_needing_heal: u64,
    pub healed_attempts: u64,
    pub exhausted_attempts: u64,
    pub total_outcomes: u64,
    /// `healed_attempts / attempts_needing_heal`, 0 when nothing needed healing.
    pub heal_success_rate: f64,
}

impl AuditStats {
    pub fn from_counts(
        total_attempts: u64,
        attempts_needing_heal: u64,
        healed_attempts: u64,
        total_outcomes: u64,
    ) -> Self {
        let heal_success_rate = if attempts_needing_heal == 0 {
            0.0
        } else {
            healed_attempts as f64 / attempts_needing_heal as f64
        };
        Self {
            total_attempts,
            attempts_needing_heal,
            healed_attempts,
            exhausted_attempts: attempts_needing_heal.saturating_sub(healed_attempts),
            total_outcomes,
            heal_success_rate,
        }
    }
}

pub(crate) fn name_matches(element_name: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => element_name
            .to_lowercase()
            .contains(&needle.to_lowercase()),
        None => true,
    }
}
