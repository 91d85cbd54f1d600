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

//! Evidex Dispatch
//!
//! Post-ingestion routing: a policy decides whether a captured record is
//! kept, and kept records are handed to the translation and aggregation
//! queues.

pub mod dispatcher;
pub mod policy;
pub mod queue;

pub use dispatcher::{
    DispatchOutcome, DispatchState, DispatchStats, EvidenceDispatcher, DISTRIBUTION,
};
pub use policy::{PolicyEvaluator, Verdict};
pub use queue::{Ack, ChannelQueue, EvidenceQueue, QueueKind, QueueReceivers, QueueSet};
