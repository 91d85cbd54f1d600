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

//! Filter compilation
//!
//! Turns criteria into a [`CompiledPredicate`] restricted to the resolved
//! target. A missing or unknown target yields [`CompileOutcome::NoScope`]:
//! the caller should not run a query yet.

use crate::criteria::{Criteria, CriteriaPayload};
use crate::keywords::{filter_for_keywords, filter_for_notes};
use crate::position::filter_for_position;
use crate::predicate::{CompiledPredicate, Condition, Field, FilterBuilder, FilterSlot, Predicate};
use crate::resolver::{EntityRegistry, Resolution, ScopeResolver};
use chrono::{DateTime, Utc};
use evidex_core::{QueryConfig, Result, ScopeNode};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// A predicate together with the scope it was compiled for
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub predicate: CompiledPredicate,
    pub scope: ScopeNode,
}

/// Result of one compile call
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    Compiled(Compiled),
    /// No target given, or the target is unknown
    NoScope,
}

impl CompileOutcome {
    pub fn predicate(&self) -> Option<&CompiledPredicate> {
        match self {
            CompileOutcome::Compiled(compiled) => Some(&compiled.predicate),
            CompileOutcome::NoScope => None,
        }
    }

    pub fn scope(&self) -> Option<&ScopeNode> {
        match self {
            CompileOutcome::Compiled(compiled) => Some(&compiled.scope),
            CompileOutcome::NoScope => None,
        }
    }

    pub fn is_no_scope(&self) -> bool {
        matches!(self, CompileOutcome::NoScope)
    }
}

/// Compiles criteria against an entity registry
pub struct FilterCompiler<R> {
    resolver: ScopeResolver<R>,
    config: QueryConfig,
}

impl<R: EntityRegistry> FilterCompiler<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self::with_config(registry, QueryConfig::default())
    }

    pub fn with_config(registry: Arc<R>, config: QueryConfig) -> Self {
        Self {
            resolver: ScopeResolver::new(registry),
            config,
        }
    }

    /// Compile a payload, resolving relative ranges against the current time
    pub fn compile(&self, payload: impl Into<CriteriaPayload>) -> Result<CompileOutcome> {
        self.compile_at(payload, Utc::now())
    }

    /// Compile a payload with an explicit clock
    pub fn compile_at(
        &self,
        payload: impl Into<CriteriaPayload>,
        now: DateTime<Utc>,
    ) -> Result<CompileOutcome> {
        let criteria = Criteria::normalize(payload)?;
        self.compile_criteria(&criteria, now)
    }

    /// Compile the criteria found under the `"filter"` request parameter.
    /// Parameters without one compile to `NoScope`.
    pub fn compile_params(&self, params: &Value) -> Result<CompileOutcome> {
        match Criteria::from_params(params)? {
            Some(criteria) => self.compile_criteria(&criteria, Utc::now()),
            None => {
                debug!("no filter in request parameters");
                Ok(CompileOutcome::NoScope)
            }
        }
    }

    /// Compile already normalized criteria
    ///
    /// # Edge Cases:
    /// - No target, or unknown target: `NoScope`
    /// - Unknown agent: the agent clause is still emitted
    /// - No date bounds: the window clause names the date field with open bounds
    /// - `info` and `note` keyword clauses share one disjunction
    /// - Type names are lower-cased, matching records case-insensitively
    pub fn compile_criteria(&self, criteria: &Criteria, now: DateTime<Utc>) -> Result<CompileOutcome> {
        if criteria.target().is_none() {
            debug!("criteria without target");
            return Ok(CompileOutcome::NoScope);
        }

        let scope = match self.resolver.resolve(criteria)? {
            Resolution::Resolved(scope) => scope,
            Resolution::NotApplicable => return Ok(CompileOutcome::NoScope),
        };

        let mut builder = FilterBuilder::new();

        let date = criteria.date().unwrap_or(self.config.default_date_field);
        builder.set(
            FilterSlot::Window,
            Predicate::field(
                Field::from(date),
                Condition::Range {
                    gte: criteria.from().resolve(now),
                    lte: criteria.to().resolve(now),
                },
            ),
        );

        builder.set(
            FilterSlot::Scope,
            Predicate::field(Field::Path, Condition::Eq(scope.id.to_string())),
        );

        if let Some(agent) = criteria.agent() {
            builder.set(
                FilterSlot::Agent,
                Predicate::field(Field::Agent, Condition::Eq(agent.to_string())),
            );
        }

        if !criteria.types().is_empty() {
            let types = criteria
                .types()
                .iter()
                .map(|name| name.trim().to_ascii_lowercase())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            builder.set(
                FilterSlot::Type,
                Predicate::field(Field::Type, Condition::In(types)),
            );
        }

        let info_clauses = filter_for_keywords(criteria.info(), &mut builder, &self.config);
        let positioned = filter_for_position(criteria.info(), &mut builder);
        let note_clauses = filter_for_notes(criteria.note(), &mut builder, &self.config);

        debug!(
            scope = %scope.id,
            kind = %scope.kind,
            date = %date,
            info_clauses,
            note_clauses,
            positioned,
            entries = builder.len(),
            "compiled filter"
        );

        Ok(CompileOutcome::Compiled(Compiled {
            predicate: builder.build(),
            scope,
        }))
    }
}
