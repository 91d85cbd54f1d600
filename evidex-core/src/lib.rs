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

//! Evidex Core
//!
//! Scope hierarchy, evidence records and the shared error, configuration and
//! logging plumbing used by the query and dispatch crates.

pub mod config;
pub mod error;
pub mod evidence;
pub mod family;
pub mod scope;
pub mod telemetry;
pub mod tokenize;

pub use config::{DispatchConfig, EvidexConfig, LoggingConfig, QueryConfig};
pub use error::{EvidexError, Result};
pub use evidence::{DateField, Evidence, EvidenceRef, GeoPoint, InfoText};
pub use family::TypeFamily;
pub use scope::{ScopeId, ScopeKind, ScopeNode};
pub use telemetry::init_tracing;
pub use tokenize::{keyword_set, tokenize};
