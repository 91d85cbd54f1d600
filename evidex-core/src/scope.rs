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

//! Scope hierarchy: operations own targets, targets own agents.
//!
//! Every node carries the ordered ids of its ancestors (`path`). The path is
//! the only structural information the query layer needs: a record belongs to
//! a scope when the scope id appears in the record's lineage.

use crate::error::{EvidexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a node in the scope hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Level of a node in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Operation,
    Target,
    Agent,
}

impl ScopeKind {
    /// Number of ancestors a node of this kind has
    pub fn depth(self) -> usize {
        match self {
            ScopeKind::Operation => 0,
            ScopeKind::Target => 1,
            ScopeKind::Agent => 2,
        }
    }

    /// Kind of the nodes directly below this one, if any
    pub fn child_kind(self) -> Option<ScopeKind> {
        match self {
            ScopeKind::Operation => Some(ScopeKind::Target),
            ScopeKind::Target => Some(ScopeKind::Agent),
            ScopeKind::Agent => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Operation => "operation",
            ScopeKind::Target => "target",
            ScopeKind::Agent => "agent",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the operation/target/agent tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeNode {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub name: String,
    /// Ancestor ids, root first
    #[serde(default)]
    pub path: Vec<ScopeId>,
}

impl ScopeNode {
    /// Create a root operation node
    pub fn operation(id: impl Into<ScopeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ScopeKind::Operation,
            name: name.into(),
            path: Vec::new(),
        }
    }

    /// Create a child of this node. The child's path is this node's lineage.
    pub fn child(&self, id: impl Into<ScopeId>, name: impl Into<String>) -> Result<Self> {
        let kind = self.kind.child_kind().ok_or_else(|| {
            EvidexError::InvalidScope(format!("{} {} cannot have children", self.kind, self.id))
        })?;
        let id = id.into();
        if self.lineage().any(|ancestor| *ancestor == id) {
            return Err(EvidexError::InvalidScope(format!(
                "{} would appear twice in its own path",
                id
            )));
        }

        Ok(Self {
            id,
            kind,
            name: name.into(),
            path: self.lineage().cloned().collect(),
        })
    }

    /// Ancestors followed by the node itself
    pub fn lineage(&self) -> impl Iterator<Item = &ScopeId> {
        self.path.iter().chain(std::iter::once(&self.id))
    }

    /// Whether a record or node with the given lineage sits in this subtree
    pub fn contains(&self, lineage: &[ScopeId]) -> bool {
        let depth = self.path.len();
        lineage.len() > depth && lineage[depth] == self.id && lineage[..depth] == self.path[..]
    }

    /// Direct parent id, `None` for operations
    pub fn parent_id(&self) -> Option<&ScopeId> {
        self.path.last()
    }

    pub fn is_leaf(&self) -> bool {
        self.kind.child_kind().is_none()
    }

    /// Check the path invariants for nodes that did not come from `child()`
    pub fn validate(&self) -> Result<()> {
        if self.path.len() != self.kind.depth() {
            return Err(EvidexError::InvalidScope(format!(
                "{} {} has {} ancestors, expected {}",
                self.kind,
                self.id,
                self.path.len(),
                self.kind.depth()
            )));
        }

        let mut seen = HashSet::with_capacity(self.path.len() + 1);
        for id in self.lineage() {
            if !seen.insert(id) {
                return Err(EvidexError::InvalidScope(format!(
                    "cycle in path of {}: {} repeats",
                    self.id, id
                )));
            }
        }
        Ok(())
    }
}
