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

//! In-memory entity registry

use crate::resolver::EntityRegistry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use evidex_core::{EvidexError, Result, ScopeId, ScopeKind, ScopeNode};
use std::sync::Arc;
use tracing::info;

/// Thread-safe scope registry keyed by id.
///
/// Nodes must be inserted parent first; the registry refuses nodes whose
/// path does not match the lineage of their registered parent.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    nodes: Arc<DashMap<ScopeId, ScopeNode>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node
    ///
    /// # Edge Cases:
    /// - Duplicate id: rejected, existing node is kept
    /// - Unknown parent: rejected
    /// - Path not matching the parent lineage: rejected
    pub fn insert(&self, node: ScopeNode) -> Result<()> {
        node.validate()?;

        match node.parent_id() {
            // the parent guard must be released before `entry` locks a shard
            Some(parent_id) => {
                let parent = self
                    .nodes
                    .get(parent_id)
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| {
                        EvidexError::InvalidScope(format!(
                            "parent {} of {} is not registered",
                            parent_id, node.id
                        ))
                    })?;
                let fits = parent.lineage().eq(node.path.iter())
                    && parent.kind.child_kind() == Some(node.kind);
                if !fits {
                    return Err(EvidexError::InvalidScope(format!(
                        "{} {} does not fit under {} {}",
                        node.kind, node.id, parent.kind, parent.id
                    )));
                }
            }
            None if node.kind != ScopeKind::Operation => {
                return Err(EvidexError::InvalidScope(format!(
                    "{} {} has no parent",
                    node.kind, node.id
                )));
            }
            None => {}
        }

        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(_) => Err(EvidexError::InvalidScope(format!(
                "{} is already registered",
                node.id
            ))),
            Entry::Vacant(slot) => {
                info!(id = %node.id, kind = %node.kind, "registered scope");
                slot.insert(node);
                Ok(())
            }
        }
    }

    /// Direct children of a node
    pub fn children(&self, id: &ScopeId) -> Vec<ScopeNode> {
        let mut children: Vec<ScopeNode> = self
            .nodes
            .iter()
            .filter(|entry| entry.parent_id() == Some(id))
            .map(|entry| entry.value().clone())
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl EntityRegistry for InMemoryRegistry {
    fn resolve(&self, id: &ScopeId) -> Result<Option<ScopeNode>> {
        Ok(self.nodes.get(id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_resolve() {
        let registry = InMemoryRegistry::new();
        let op = ScopeNode::operation("op", "op");
        let target = op.child("t", "t").unwrap();
        registry.insert(op).unwrap();
        registry.insert(target.clone()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve(&ScopeId::from("t")).unwrap(), Some(target));
        assert_eq!(registry.resolve(&ScopeId::from("missing")).unwrap(), None);
    }

    #[test]
    fn test_parent_must_exist() {
        let registry = InMemoryRegistry::new();
        let target = ScopeNode::operation("op", "op").child("t", "t").unwrap();
        assert!(registry.insert(target).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_path_must_match_parent() {
        let registry = InMemoryRegistry::new();
        let op1 = ScopeNode::operation("op1", "op1");
        let op2 = ScopeNode::operation("op2", "op2");
        registry.insert(op1.clone()).unwrap();
        registry.insert(op2).unwrap();

        let mut target = op1.child("t", "t").unwrap();
        registry.insert(target.clone()).unwrap();

        let mut agent = target.child("a", "a").unwrap();
        agent.path[0] = ScopeId::from("op2");
        assert!(registry.insert(agent).is_err());

        target.id = ScopeId::from("t2");
        target.kind = ScopeKind::Agent;
        assert!(registry.insert(target).is_err());
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = InMemoryRegistry::new();
        registry.insert(ScopeNode::operation("op", "first")).unwrap();
        assert!(registry.insert(ScopeNode::operation("op", "second")).is_err());
        let kept = registry.resolve(&ScopeId::from("op")).unwrap().unwrap();
        assert_eq!(kept.name, "first");
    }

    #[test]
    fn test_children() {
        let registry = InMemoryRegistry::new();
        let op = ScopeNode::operation("op", "op");
        registry.insert(op.clone()).unwrap();
        registry.insert(op.child("t2", "t2").unwrap()).unwrap();
        registry.insert(op.child("t1", "t1").unwrap()).unwrap();

        let ids: Vec<String> = registry
            .children(&ScopeId::from("op"))
            .into_iter()
            .map(|node| node.id.to_string())
            .collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }
}
