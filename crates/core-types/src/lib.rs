//! Shared primitives for the healkit crates: locator kinds, locators,
//! repository identifiers and the two persisted audit records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown locator kind '{0}'")]
pub struct ParseLocatorKindError(pub String);

/// Closed set of locator kinds understood by the element probe.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum LocatorKind {
    Id,
    Name,
    Class,
    Css,
    Xpath,
}

impl LocatorKind {
    pub const ALL: [LocatorKind; 5] = [
        LocatorKind::Id,
        LocatorKind::Name,
        LocatorKind::Class,
        LocatorKind::Css,
        LocatorKind::Xpath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::Class => "class",
            LocatorKind::Css => "css",
            LocatorKind::Xpath => "xpath",
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorKind {
    type Err = ParseLocatorKindError;

    /// Accepts the short names plus the WebDriver spellings
    /// (`class name`, `css selector`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "id" => Ok(LocatorKind::Id),
            "name" => Ok(LocatorKind::Name),
            "class" | "class name" | "classname" => Ok(LocatorKind::Class),
            "css" | "css selector" => Ok(LocatorKind::Css),
            "xpath" => Ok(LocatorKind::Xpath),
            _ => Err(ParseLocatorKindError(raw.to_string())),
        }
    }
}

/// A (kind, value) pair identifying a UI element.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Locator {
    pub kind: LocatorKind,
    pub value: String,
}

impl Locator {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Id, value)
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Xpath, value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.value)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub i64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct OutcomeId(pub i64);

impl fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HealStatus {
    Success,
    Failed,
}

impl HealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealStatus::Success => "SUCCESS",
            HealStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for HealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown heal status '{0}'")]
pub struct ParseHealStatusError(pub String);

impl FromStr for HealStatus {
    type Err = ParseHealStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(HealStatus::Success),
            "FAILED" => Ok(HealStatus::Failed),
            _ => Err(ParseHealStatusError(raw.to_string())),
        }
    }
}

/// Insert payload for a locator attempt. One per `locate` call.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct NewLocatorAttempt {
    pub element_name: String,
    pub locator: Locator,
    /// URL of the page the primary probe ran against.
    pub page_context: String,
    pub created_at: DateTime<Utc>,
}

/// Stored locator attempt.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LocatorAttempt {
    pub id: AttemptId,
    pub element_name: String,
    pub locator: Locator,
    pub page_context: String,
    pub created_at: DateTime<Utc>,
}

impl LocatorAttempt {
    pub fn from_new(id: AttemptId, attempt: NewLocatorAttempt) -> Self {
        Self {
            id,
            element_name: attempt.element_name,
            locator: attempt.locator,
            page_context: attempt.page_context,
            created_at: attempt.created_at,
        }
    }
}

/// Insert payload for one probed healing candidate.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct NewHealingOutcome {
    pub original_attempt_id: AttemptId,
    pub candidate: Locator,
    pub similarity_score: f64,
    pub status: HealStatus,
    pub created_at: DateTime<Utc>,
}

/// Stored healing outcome row.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct HealingOutcome {
    pub id: OutcomeId,
    pub original_attempt_id: AttemptId,
    pub candidate: Locator,
    pub similarity_score: f64,
    pub status: HealStatus,
    pub created_at: DateTime<Utc>,
}

impl HealingOutcome {
    pub fn from_new(id: OutcomeId, outcome: NewHealingOutcome) -> Self {
        Self {
            id,
            original_attempt_id: outcome.original_attempt_id,
            candidate: outcome.candidate,
            similarity_score: outcome.similarity_score,
            status: outcome.status,
            created_at: outcome.created_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == HealStatus::Success
    }
}
