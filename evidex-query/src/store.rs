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

//! Evidence store interface and an in-memory implementation

use crate::predicate::CompiledPredicate;
use evidex_core::{Evidence, Result, ScopeNode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage collaborator consuming compiled predicates
pub trait EvidenceStore: Send + Sync {
    /// Records matching the predicate
    fn find(&self, predicate: &CompiledPredicate) -> Result<Vec<Evidence>>;

    /// Record counts per raw `type` tag over the scope's whole subtree
    fn count_by_raw_type(&self, scope: &ScopeNode) -> Result<HashMap<String, u64>>;
}

/// Append-only in-memory store. Evaluates predicates record by record.
#[derive(Clone, Default)]
pub struct InMemoryEvidenceStore {
    records: Arc<RwLock<Vec<Evidence>>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Evidence) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl EvidenceStore for InMemoryEvidenceStore {
    fn find(&self, predicate: &CompiledPredicate) -> Result<Vec<Evidence>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|record| predicate.matches(record))
            .cloned()
            .collect())
    }

    fn count_by_raw_type(&self, scope: &ScopeNode) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for record in self.records.read().iter().filter(|r| scope.contains(&r.path)) {
            *counts.entry(record.evidence_type.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
