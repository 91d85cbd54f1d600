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

//! Evidence counts per canonical type family

use crate::store::EvidenceStore;
use evidex_core::{Result, ScopeNode, TypeFamily};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Count per family. Every family of the enumeration is present, with zero
/// when nothing was captured; raw types outside it never appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeHistogram(BTreeMap<TypeFamily, u64>);

impl TypeHistogram {
    pub fn empty() -> Self {
        Self(TypeFamily::ALL.iter().map(|family| (*family, 0)).collect())
    }

    /// Count of a family by name, `None` for names outside the enumeration
    pub fn get(&self, name: &str) -> Option<u64> {
        TypeFamily::from_raw(name).map(|family| self.count(family))
    }

    pub fn count(&self, family: TypeFamily) -> u64 {
        self.0.get(&family).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeFamily, u64)> + '_ {
        self.0.iter().map(|(family, count)| (*family, *count))
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    fn add(&mut self, family: TypeFamily, count: u64) {
        *self.0.entry(family).or_insert(0) += count;
    }
}

impl Default for TypeHistogram {
    fn default() -> Self {
        Self::empty()
    }
}

/// Count the evidence under `scope` (whole subtree) per canonical family
pub fn count_by_type<S: EvidenceStore + ?Sized>(store: &S, scope: &ScopeNode) -> Result<TypeHistogram> {
    let mut histogram = TypeHistogram::empty();
    let mut skipped = 0u64;

    for (raw, count) in store.count_by_raw_type(scope)? {
        match TypeFamily::from_raw(&raw) {
            Some(family) => histogram.add(family, count),
            None => skipped += count,
        }
    }

    debug!(
        scope = %scope.id,
        counted = histogram.total(),
        skipped,
        "type histogram"
    );
    Ok(histogram)
}
