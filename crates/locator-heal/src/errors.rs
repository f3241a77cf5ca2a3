//! Error types for locator healing

use std::fmt;

use healkit_core_types::{AttemptId, Locator};
use serde::Serialize;
use thiserror::Error;

/// Why a probe did not yield an element.
///
/// Healing treats every reason the same way; the distinction only feeds logs
/// and the error handed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailureReason {
    /// Locator evaluated fine but matched nothing
    NoMatch,
    /// Driver-side wait expired
    Timeout,
    /// Matched element went away before it could be returned
    StaleReference,
    /// Locator syntax the probe cannot evaluate
    Unsupported,
    /// Any other driver/transport failure
    Driver,
}

impl ProbeFailureReason {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeFailureReason::NoMatch => "no-match",
            ProbeFailureReason::Timeout => "timeout",
            ProbeFailureReason::StaleReference => "stale-reference",
            ProbeFailureReason::Unsupported => "unsupported",
            ProbeFailureReason::Driver => "driver",
        }
    }

    /// Failures that may clear up on their own (worth a louder log line).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProbeFailureReason::Timeout
                | ProbeFailureReason::StaleReference
                | ProbeFailureReason::Driver
        )
    }
}

impl fmt::Display for ProbeFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A probe that did not find its element.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ProbeFailure {
    pub reason: ProbeFailureReason,
    pub message: String,
}

impl ProbeFailure {
    pub fn new(reason: ProbeFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn no_match(locator: &Locator) -> Self {
        Self::new(
            ProbeFailureReason::NoMatch,
            format!("no element matches {}", locator),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProbeFailureReason::Timeout, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProbeFailureReason::Unsupported, message)
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::new(ProbeFailureReason::Driver, message)
    }
}

/// Caller-visible failure of a `locate` call.
#[derive(Debug, Error, Clone)]
pub enum HealError {
    /// Neither the primary locator nor any candidate resolved.
    #[error("could not locate {locator}: {candidates_tried} healing candidates tried, primary probe failed ({cause})")]
    HealingExhausted {
        locator: Locator,
        /// Audit row of the failed call; `None` when it could not be written.
        attempt_id: Option<AttemptId>,
        candidates_tried: usize,
        #[source]
        cause: ProbeFailure,
    },
}

impl HealError {
    /// The failure reported by the primary probe.
    pub fn primary_failure(&self) -> &ProbeFailure {
        match self {
            HealError::HealingExhausted { cause, .. } => cause,
        }
    }

    pub fn locator(&self) -> &Locator {
        match self {
            HealError::HealingExhausted { locator, .. } => locator,
        }
    }

    pub fn attempt_id(&self) -> Option<AttemptId> {
        match self {
            HealError::HealingExhausted { attempt_id, .. } => *attempt_id,
        }
    }

    pub fn candidates_tried(&self) -> usize {
        match self {
            HealError::HealingExhausted {
                candidates_tried, ..
            } => *candidates_tried,
        }
    }
}

/// Invalid healing configuration; fatal before any `locate` call is served.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("similarity threshold must be a number within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("nominal strategy score must be a number within [0, 1], got {0}")]
    InvalidNominalScore(f64),

    #[error("strategy order must list at least one strategy")]
    EmptyStrategyOrder,

    #[error("strategy '{0}' is listed more than once")]
    DuplicateStrategy(String),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("default element name must not be blank")]
    BlankElementName,
}
