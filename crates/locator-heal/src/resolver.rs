//! Locate-with-healing orchestration

use std::sync::Arc;

use chrono::Utc;
use healkit_audit_store::AuditRepository;
use healkit_core_types::{AttemptId, HealStatus, Locator, NewHealingOutcome, NewLocatorAttempt};
use tracing::{debug, info, warn};

use crate::config::{HealConfig, HealSettings};
use crate::errors::{ConfigError, HealError, ProbeFailure};
use crate::probe::{ElementProbe, ProbeOutcome};
use crate::types::{Candidate, CandidateOrigin, HealDetails, HealPlan, Located};

/// Resolves locators through an [`ElementProbe`], healing failures with
/// strategy rewrites and similarity-ranked identifiers.
///
/// Every call is recorded in the audit repository. Audit writes never
/// change the outcome of a call: failures are logged and dropped.
pub struct HealingResolver<P: ElementProbe> {
    probe: Arc<P>,
    audit: Arc<dyn AuditRepository>,
    settings: HealSettings,
}

impl<P: ElementProbe> HealingResolver<P> {
    /// Validate `config` and build a resolver.
    pub fn new(
        probe: Arc<P>,
        audit: Arc<dyn AuditRepository>,
        config: &HealConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_settings(probe, audit, config.validate()?))
    }

    pub fn with_settings(
        probe: Arc<P>,
        audit: Arc<dyn AuditRepository>,
        settings: HealSettings,
    ) -> Self {
        Self {
            probe,
            audit,
            settings,
        }
    }

    pub fn probe(&self) -> &Arc<P> {
        &self.probe
    }

    pub fn settings(&self) -> &HealSettings {
        &self.settings
    }

    /// Resolve `locator`, healing it if the primary probe fails.
    ///
    /// Probes run one at a time: the primary locator, then each candidate
    /// of [`plan`](Self::plan) until one resolves.
    pub async fn locate(
        &self,
        locator: Locator,
        element_name: Option<&str>,
    ) -> Result<Located<P::Handle>, HealError> {
        let element_name = element_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.settings.default_element_name)
            .to_string();
        debug!("Locating {} ({})", element_name, locator);

        let primary = self.probe.probe(&locator).await;
        let page_context = self.probe.current_url().await;
        let attempt_id = self
            .record_attempt(NewLocatorAttempt {
                element_name: element_name.clone(),
                locator: locator.clone(),
                page_context,
                created_at: Utc::now(),
            })
            .await;

        let cause = match primary {
            ProbeOutcome::Found(handle) => {
                debug!("Primary locator resolved: {}", locator);
                return Ok(Located {
                    handle,
                    locator,
                    attempt_id,
                    heal: None,
                });
            }
            ProbeOutcome::NotFound(cause) => cause,
        };
        log_probe_failure("Primary locator", &locator, &cause);

        if !self.settings.healing_enabled {
            warn!("Healing disabled; giving up on {} ({})", element_name, locator);
            return Err(HealError::HealingExhausted {
                locator,
                attempt_id,
                candidates_tried: 0,
                cause,
            });
        }

        let plan = self.plan(&locator).await;
        info!(
            "Healing {} ({}): {} candidates",
            element_name,
            locator,
            plan.len()
        );

        for (position, candidate) in plan.candidates.iter().enumerate() {
            match self.probe.probe(&candidate.locator).await {
                ProbeOutcome::Found(handle) => {
                    self.record_outcome(
                        attempt_id,
                        &candidate.locator,
                        candidate.score,
                        HealStatus::Success,
                    )
                    .await;
                    info!(
                        "Healed {}: {} -> {} via {} (score: {:.3})",
                        element_name,
                        locator,
                        candidate.locator,
                        candidate.origin.label(),
                        candidate.score
                    );
                    return Ok(Located {
                        handle,
                        locator: candidate.locator.clone(),
                        attempt_id,
                        heal: Some(HealDetails {
                            original: locator,
                            origin: candidate.origin,
                            score: candidate.score,
                            candidates_tried: position + 1,
                        }),
                    });
                }
                ProbeOutcome::NotFound(failure) => {
                    log_probe_failure("Candidate", &candidate.locator, &failure);
                    self.record_outcome(
                        attempt_id,
                        &candidate.locator,
                        candidate.score,
                        HealStatus::Failed,
                    )
                    .await;
                }
            }
        }

        self.record_outcome(attempt_id, &locator, 0.0, HealStatus::Failed)
            .await;
        warn!(
            "Healing exhausted for {} ({}) after {} candidates",
            element_name,
            locator,
            plan.len()
        );
        Err(HealError::HealingExhausted {
            locator,
            attempt_id,
            candidates_tried: plan.len(),
            cause,
        })
    }

    /// Ordered candidates for a failed locator: strategy rewrites first,
    /// then ranked identifiers from the current page not already listed.
    pub async fn plan(&self, failed: &Locator) -> HealPlan {
        let nominal = self.settings.nominal_strategy_score;
        let mut candidates: Vec<Candidate> = self
            .settings
            .generator
            .generate(failed)
            .into_iter()
            .map(|rewrite| Candidate {
                locator: rewrite.locator,
                origin: CandidateOrigin::Strategy(rewrite.strategy),
                score: nominal,
            })
            .collect();

        let mut markup_ranked = false;
        if self.settings.similarity_enabled {
            match self.probe.page_source().await {
                Ok(markup) => {
                    markup_ranked = true;
                    let ranked = self.settings.ranker.rank(&failed.value, &markup);
                    debug!("{} ranked identifiers for {}", ranked.len(), failed);
                    for entry in ranked {
                        let locator = self.settings.ranked_selector.locator_for(&entry);
                        if locator == *failed || candidates.iter().any(|c| c.locator == locator) {
                            continue;
                        }
                        candidates.push(Candidate {
                            locator,
                            origin: CandidateOrigin::Similarity(entry.source),
                            score: entry.score,
                        });
                    }
                }
                Err(err) => {
                    warn!("Page source unavailable, skipping similarity ranking: {}", err);
                }
            }
        }

        HealPlan {
            original: failed.clone(),
            candidates,
            markup_ranked,
        }
    }

    async fn record_attempt(&self, attempt: NewLocatorAttempt) -> Option<AttemptId> {
        match self.audit.insert_attempt(attempt).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("Failed to record locator attempt: {}", err);
                None
            }
        }
    }

    async fn record_outcome(
        &self,
        attempt_id: Option<AttemptId>,
        candidate: &Locator,
        score: f64,
        status: HealStatus,
    ) {
        let Some(attempt_id) = attempt_id else {
            debug!("No attempt id; outcome for {} not recorded", candidate);
            return;
        };
        let outcome = NewHealingOutcome {
            original_attempt_id: attempt_id,
            candidate: candidate.clone(),
            similarity_score: score,
            status,
            created_at: Utc::now(),
        };
        if let Err(err) = self.audit.insert_outcome(outcome).await {
            warn!(
                "Failed to record healing outcome for attempt {}: {}",
                attempt_id, err
            );
        }
    }
}

fn log_probe_failure(what: &str, locator: &Locator, failure: &ProbeFailure) {
    if failure.reason.is_transient() {
        warn!("{} {} failed: {}", what, locator, failure);
    } else {
        debug!("{} {} failed: {}", what, locator, failure);
    }
}
