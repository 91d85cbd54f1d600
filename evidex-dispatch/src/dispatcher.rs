// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Evidence dispatcher
//!
//! ```text
//!                      ┌──── Discard ───▶ Discarded
//! record ─▶ Pending ───┤
//!            (policy)  └──── Keep ──────▶ Distributed ─┬─▶ translation
//!                                                      └─▶ aggregation
//! ```
//!
//! OCR and intelligence queues are fed by type-specific processing elsewhere,
//! never by the dispatcher.

use crate::policy::{PolicyEvaluator, Verdict};
use crate::queue::{QueueKind, QueueSet};
use evidex_core::{Evidence, Result, ScopeNode};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Queues a kept record is distributed to, in order
pub const DISTRIBUTION: [QueueKind; 2] = [QueueKind::Translation, QueueKind::Aggregation];

/// Per-record dispatch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchState {
    Pending,
    Discarded,
    Distributed,
}

impl DispatchState {
    /// Apply a verdict. Only `Pending` accepts one; terminal states return
    /// `None`.
    pub fn on_verdict(self, verdict: Verdict) -> Option<DispatchState> {
        match self {
            DispatchState::Pending => Some(DispatchOutcome::from(verdict).into()),
            DispatchState::Discarded | DispatchState::Distributed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, DispatchState::Pending)
    }
}

/// Terminal outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    Discarded,
    Distributed,
}

impl From<Verdict> for DispatchOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Keep => DispatchOutcome::Distributed,
            Verdict::Discard => DispatchOutcome::Discarded,
        }
    }
}

impl From<DispatchOutcome> for DispatchState {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Discarded => DispatchState::Discarded,
            DispatchOutcome::Distributed => DispatchState::Distributed,
        }
    }
}

/// Statistics for the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub total_received: u64,
    pub total_kept: u64,
    pub total_discarded: u64,
    pub total_failed: u64,
}

#[derive(Default)]
struct DispatchStatsInternal {
    received: AtomicU64,
    kept: AtomicU64,
    discarded: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStatsInternal {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            total_received: self.received.load(Ordering::Relaxed),
            total_kept: self.kept.load(Ordering::Relaxed),
            total_discarded: self.discarded.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Routes freshly captured records through the policy and, when kept, to
/// the downstream queues.
///
/// Holds no per-record state; concurrent dispatches only share the counters.
pub struct EvidenceDispatcher<P> {
    policy: Arc<P>,
    queues: QueueSet,
    stats: Arc<DispatchStatsInternal>,
}

impl<P> Clone for EvidenceDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            queues: self.queues.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<P: PolicyEvaluator> EvidenceDispatcher<P> {
    pub fn new(policy: Arc<P>, queues: QueueSet) -> Self {
        Self {
            policy,
            queues,
            stats: Arc::new(DispatchStatsInternal::default()),
        }
    }

    /// Dispatch one record owned by `scope`.
    ///
    /// The policy is consulted exactly once. Collaborator errors abort the
    /// dispatch and are returned as is; nothing is retried, and a failed
    /// enqueue skips the remaining queues.
    pub fn dispatch(&self, scope: &ScopeNode, record: &Evidence) -> Result<DispatchOutcome> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let verdict = match self.policy.evaluate(scope, record) {
            Ok(verdict) => verdict,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(record = %record.id, scope = %scope.id, error = %e, "policy evaluation failed");
                return Err(e);
            }
        };
        debug!(record = %record.id, scope = %scope.id, ?verdict, "policy verdict");

        match DispatchOutcome::from(verdict) {
            DispatchOutcome::Distributed => {
                for kind in DISTRIBUTION {
                    if let Err(e) = self.queues.get(kind).enqueue(record.reference()) {
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(record = %record.id, queue = %kind, error = %e, "enqueue failed");
                        return Err(e);
                    }
                }
                self.stats.kept.fetch_add(1, Ordering::Relaxed);
                info!(record = %record.id, scope = %scope.id, "evidence distributed");
                Ok(DispatchOutcome::Distributed)
            }
            DispatchOutcome::Discarded => {
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(record = %record.id, scope = %scope.id, "evidence discarded");
                Ok(DispatchOutcome::Discarded)
            }
        }
    }

    /// Get current statistics.
    pub fn stats(&self) -> DispatchStats {
        self.stats.snapshot()
    }
}
