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

//! Scope resolution
//!
//! A missing or unknown target is an ordinary state while the operator is
//! still filling in the criteria, so neither is an error here. Only failures
//! of the registry itself propagate.

use crate::criteria::Criteria;
use evidex_core::{Result, ScopeId, ScopeNode};
use std::sync::Arc;
use tracing::debug;

/// Lookup of scope nodes by id
pub trait EntityRegistry: Send + Sync {
    /// `Ok(None)` when the id is unknown
    fn resolve(&self, id: &ScopeId) -> Result<Option<ScopeNode>>;
}

/// Outcome of resolving the criteria target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No target given, or the target does not exist
    NotApplicable,
    Resolved(ScopeNode),
}

impl Resolution {
    pub fn scope(&self) -> Option<&ScopeNode> {
        match self {
            Resolution::NotApplicable => None,
            Resolution::Resolved(scope) => Some(scope),
        }
    }
}

/// Resolves the `target` of a criteria object
pub struct ScopeResolver<R> {
    registry: Arc<R>,
}

impl<R> Clone for ScopeResolver<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<R: EntityRegistry> ScopeResolver<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, criteria: &Criteria) -> Result<Resolution> {
        let Some(target) = criteria.target() else {
            return Ok(Resolution::NotApplicable);
        };

        match self.registry.resolve(target)? {
            Some(scope) => Ok(Resolution::Resolved(scope)),
            None => {
                debug!(target = %target, "target not found in registry");
                Ok(Resolution::NotApplicable)
            }
        }
    }
}
