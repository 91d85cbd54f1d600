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

//! Evidex Query
//!
//! Compiles loosely typed evidence criteria into storage-ready predicates.
//!
//! ## Pipeline
//!
//! ```text
//! payload ──normalize──▶ Criteria ──resolve target──▶ ScopeNode
//!                                     │
//!            ┌────────────────────────┼──────────────────────┐
//!            ▼                        ▼                      ▼
//!     window / scope /          keyword extractor     position extractor
//!     agent / type clauses      (info + note)         (lat / lon / r)
//!            └─────────────▶ FilterBuilder ◀─────────────────┘
//!                                     │
//!                                     ▼
//!                             CompiledPredicate
//! ```
//!
//! ## Example
//!
//! ```
//! use evidex_core::ScopeNode;
//! use evidex_query::{FilterCompiler, InMemoryRegistry};
//! use std::sync::Arc;
//!
//! let registry = InMemoryRegistry::new();
//! let op = ScopeNode::operation("op", "Operation");
//! registry.insert(op.clone()).unwrap();
//! registry.insert(op.child("t1", "Target").unwrap()).unwrap();
//!
//! let compiler = FilterCompiler::new(Arc::new(registry));
//! let outcome = compiler
//!     .compile(r#"{"target":"t1","from":"24h","info":"john dorian skype"}"#)
//!     .unwrap();
//! assert!(outcome.predicate().is_some());
//! ```

pub mod compiler;
pub mod criteria;
pub mod histogram;
pub mod keywords;
pub mod position;
pub mod predicate;
pub mod registry;
pub mod resolver;
pub mod store;

pub use compiler::{CompileOutcome, Compiled, FilterCompiler};
pub use criteria::{Criteria, CriteriaPayload, TimeBound};
pub use histogram::{count_by_type, TypeHistogram};
pub use keywords::{filter_for_keywords, filter_for_notes, line_keywords};
pub use position::{filter_for_position, parse_position};
pub use predicate::{
    CompiledPredicate, Condition, Field, FilterBuilder, FilterSlot, Predicate, Proximity,
    PROXIMITY_KEY,
};
pub use registry::InMemoryRegistry;
pub use resolver::{EntityRegistry, Resolution, ScopeResolver};
pub use store::{EvidenceStore, InMemoryEvidenceStore};
