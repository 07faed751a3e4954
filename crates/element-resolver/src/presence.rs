//! Presence assertion polling loop
//!
//! Given grouped descriptors, a quorum rule, and a timeout budget, the loop
//! repeatedly captures one frame per iteration and evaluates each group's
//! strategy against it until quorum or timeout. Elapsed time is checked at
//! the top of each iteration, so a slow capture/detect round trip can
//! overrun the nominal budget by at most one in-flight call.

use crate::annotate::annotate_frame;
use crate::strategies::Strategy;
use crate::types::{ClassifiedElement, ElementStatus};
use sightline_core_types::{ElementSource, Frame, QuorumRule};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Satisfied,
    TimedOut,
}

/// Outcome of one presence assertion.
///
/// Partial progress is never discarded: `status` reflects everything found
/// by the time the loop exited, and `any_found` is the best-effort verdict
/// distinct from the quorum verdict.
#[derive(Debug, Clone)]
pub struct PresenceReport {
    /// Whether the quorum rule was satisfied.
    pub rule_satisfied: bool,

    /// Whether any element was ever found.
    pub any_found: bool,

    /// Terminal loop state.
    pub state: PollState,

    /// Per-element status at loop exit.
    pub status: ElementStatus,

    /// Wall-clock time spent polling.
    pub elapsed: Duration,

    /// When the loop exited.
    pub timestamp: SystemTime,

    /// Last captured frame with found boxes drawn in, when available.
    pub annotated: Option<Frame>,
}

impl PresenceReport {
    /// Caller-facing boolean: the quorum verdict when satisfied, otherwise
    /// the best-effort "was anything ever found".
    pub fn best_effort(&self) -> bool {
        self.rule_satisfied || self.any_found
    }
}

/// One presence assertion run. Status is fresh per run; the loop is not
/// resumable across calls.
pub struct PresenceAssertion {
    source: Arc<dyn ElementSource>,
    groups: Vec<(Arc<dyn Strategy>, Vec<ClassifiedElement>)>,
    element_names: Vec<String>,
    rule: QuorumRule,
    timeout: Duration,
    interval: Duration,
}

impl PresenceAssertion {
    pub fn new(
        source: Arc<dyn ElementSource>,
        groups: Vec<(Arc<dyn Strategy>, Vec<ClassifiedElement>)>,
        element_names: Vec<String>,
        rule: QuorumRule,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            groups,
            element_names,
            rule,
            timeout,
            interval,
        }
    }

    pub async fn run(self) -> PresenceReport {
        let started = Instant::now();
        let mut status = ElementStatus::new(self.element_names.iter().cloned());
        let mut last_frame: Option<Frame> = None;

        let state = loop {
            if started.elapsed() >= self.timeout {
                break PollState::TimedOut;
            }

            match self.source.capture().await {
                Ok(frame) => {
                    self.evaluate_groups(&frame, &mut status).await;
                    last_frame = Some(frame);
                }
                Err(err) => {
                    // Transient; wall clock still advances toward timeout.
                    warn!(error = %err, "frame capture failed; retrying next iteration");
                }
            }

            if self.rule.satisfied(status.found_count(), status.total()) {
                break PollState::Satisfied;
            }

            debug!(status = status.summary().as_str(), "quorum unmet; polling");
            // Never sleep past the deadline.
            let remaining = self.timeout.saturating_sub(started.elapsed());
            tokio::time::sleep(self.interval.min(remaining)).await;
        };

        let annotated = last_frame
            .as_ref()
            .and_then(|frame| annotate_frame(frame, &status.found_bboxes()).ok());

        let rule_satisfied = state == PollState::Satisfied;
        let any_found = status.any_found();
        info!(
            rule = self.rule.name(),
            satisfied = rule_satisfied,
            status = status.summary().as_str(),
            "presence assertion finished"
        );

        PresenceReport {
            rule_satisfied,
            any_found,
            state,
            status,
            elapsed: started.elapsed(),
            timestamp: SystemTime::now(),
            annotated,
        }
    }

    /// Evaluate every group with still-unfound members against one frame.
    /// Under ANY the first find short-circuits the remaining groups.
    async fn evaluate_groups(&self, frame: &Frame, status: &mut ElementStatus) {
        for (strategy, members) in &self.groups {
            let pending: Vec<ClassifiedElement> = members
                .iter()
                .filter(|element| !status.is_found(&element.raw))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }

            for (name, hit) in strategy.check_group(frame, &pending).await {
                if let Some(hit) = hit {
                    debug!(
                        element = name.as_str(),
                        strategy = strategy.name(),
                        "element found"
                    );
                    status.mark_found(&name, hit.bbox);
                }
            }

            if self.rule == QuorumRule::Any && status.any_found() {
                return;
            }
        }
    }
}
