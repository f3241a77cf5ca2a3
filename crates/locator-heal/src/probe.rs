//! The element-probing capability the resolver drives.

use async_trait::async_trait;
use healkit_core_types::Locator;

use crate::errors::ProbeFailure;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome<H> {
    Found(H),
    NotFound(ProbeFailure),
}

impl<H> ProbeOutcome<H> {
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Found(_))
    }

    pub fn into_result(self) -> Result<H, ProbeFailure> {
        match self {
            ProbeOutcome::Found(handle) => Ok(handle),
            ProbeOutcome::NotFound(failure) => Err(failure),
        }
    }
}

impl<H> From<Result<H, ProbeFailure>> for ProbeOutcome<H> {
    fn from(result: Result<H, ProbeFailure>) -> Self {
        match result {
            Ok(handle) => ProbeOutcome::Found(handle),
            Err(failure) => ProbeOutcome::NotFound(failure),
        }
    }
}

/// Browser-side capability: resolve a locator against the live page.
///
/// Implementations own waiting and timeouts; the resolver calls `probe` once
/// per locator and never retries.
#[async_trait]
pub trait ElementProbe: Send + Sync {
    /// Opaque element reference handed back to the caller.
    type Handle: Send;

    async fn probe(&self, locator: &Locator) -> ProbeOutcome<Self::Handle>;

    /// URL of the current page, recorded with every attempt.
    async fn current_url(&self) -> String;

    /// Serialized page markup, consumed by similarity ranking.
    async fn page_source(&self) -> Result<String, ProbeFailure>;
}
