//! In-memory hierarchy snapshot with depth-bounded walks
//!
//! Structural checks (depth limits, cycle prevention, subtree collection) run
//! against a [`HierarchySnapshot`] loaded inside the mutation's transaction.
//! Every walk is an iterative loop with a hop guard: a corrupted parent chain
//! that loops back on itself yields [`HierarchyError::Cycle`] rather than
//! spinning forever.

use crate::models::Item;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Structural problems found while walking a snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Item {0} is not part of this list")]
    UnknownItem(String),

    #[error("Parent chain of item {item_id} does not terminate")]
    Cycle { item_id: String },

    #[error("Item {item_id} references missing parent {parent_id}")]
    DanglingParent { item_id: String, parent_id: String },
}

/// The structural facts about one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub is_completed: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Item> for HierarchyNode {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            parent_id: item.parent_item_id.clone(),
            is_completed: item.is_completed,
            order: item.order,
            created_at: item.created_at,
        }
    }
}

/// Parent/child index over every item of one list
#[derive(Debug, Clone, Default)]
pub struct HierarchySnapshot {
    nodes: HashMap<String, HierarchyNode>,
    /// Child ids per parent (None = roots), in display order
    children: HashMap<Option<String>, Vec<String>>,
}

impl HierarchySnapshot {
    pub fn from_nodes(nodes: impl IntoIterator<Item = HierarchyNode>) -> Self {
        let nodes: HashMap<String, HierarchyNode> =
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        let mut children: HashMap<Option<String>, Vec<String>> = HashMap::new();
        for node in nodes.values() {
            children
                .entry(node.parent_id.clone())
                .or_default()
                .push(node.id.clone());
        }
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let (a, b) = (&nodes[a], &nodes[b]);
                (a.order, a.created_at, &a.id).cmp(&(b.order, b.created_at, &b.id))
            });
        }

        Self { nodes, children }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HierarchyNode> {
        self.nodes.get(id)
    }

    fn node(&self, id: &str) -> Result<&HierarchyNode, HierarchyError> {
        self.nodes
            .get(id)
            .ok_or_else(|| HierarchyError::UnknownItem(id.to_string()))
    }

    /// No legitimate chain is longer than the number of items
    fn hop_limit(&self) -> usize {
        self.nodes.len() + 1
    }

    /// Children of `parent` (None = roots) in display order
    pub fn children_of(&self, parent: Option<&str>) -> &[String] {
        self.children
            .get(&parent.map(str::to_string))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first (the item itself excluded)
    pub fn ancestors(&self, id: &str) -> Result<Vec<String>, HierarchyError> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?;
        let limit = self.hop_limit();

        while let Some(parent_id) = current.parent_id.as_deref() {
            if chain.len() >= limit {
                return Err(HierarchyError::Cycle {
                    item_id: id.to_string(),
                });
            }
            current = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| HierarchyError::DanglingParent {
                    item_id: current.id.clone(),
                    parent_id: parent_id.to_string(),
                })?;
            if current.id == id {
                return Err(HierarchyError::Cycle {
                    item_id: id.to_string(),
                });
            }
            chain.push(current.id.clone());
        }

        Ok(chain)
    }

    /// Depth of `id` (root = 1)
    pub fn depth_of(&self, id: &str) -> Result<usize, HierarchyError> {
        Ok(self.ancestors(id)?.len() + 1)
    }

    /// Every descendant of `id`, breadth-first (the item itself excluded)
    pub fn descendants(&self, id: &str) -> Result<Vec<String>, HierarchyError> {
        self.node(id)?;
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut out = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(Some(current)) {
                if !seen.insert(child.as_str()) {
                    return Err(HierarchyError::Cycle {
                        item_id: child.clone(),
                    });
                }
                out.push(child.clone());
                queue.push_back(child.as_str());
            }
        }

        Ok(out)
    }

    /// Height of the subtree rooted at `id` (a leaf has height 1)
    pub fn subtree_height(&self, id: &str) -> Result<usize, HierarchyError> {
        self.node(id)?;
        let limit = self.hop_limit();
        let mut height = 0;
        let mut level: Vec<&str> = vec![id];

        while !level.is_empty() {
            height += 1;
            if height > limit {
                return Err(HierarchyError::Cycle {
                    item_id: id.to_string(),
                });
            }
            level = level
                .iter()
                .flat_map(|current| self.children_of(Some(*current)))
                .map(String::as_str)
                .collect();
        }

        Ok(height)
    }

    /// Whether `candidate` sits somewhere below `ancestor`
    pub fn is_descendant(&self, ancestor: &str, candidate: &str) -> Result<bool, HierarchyError> {
        Ok(self.ancestors(candidate)?.iter().any(|a| a == ancestor))
    }

    /// Depth-first traversal of the whole list: `(id, level)` pairs
    ///
    /// Fails if any item is unreachable from a root, which only happens when
    /// the parent links form a cycle.
    pub fn flatten(&self) -> Result<Vec<(String, usize)>, HierarchyError> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(&str, usize)> = self
            .children_of(None)
            .iter()
            .rev()
            .map(|id| (id.as_str(), 1))
            .collect();

        while let Some((id, level)) = stack.pop() {
            if out.len() >= self.nodes.len() {
                return Err(HierarchyError::Cycle {
                    item_id: id.to_string(),
                });
            }
            out.push((id.to_string(), level));
            for child in self.children_of(Some(id)).iter().rev() {
                stack.push((child.as_str(), level + 1));
            }
        }

        if out.len() != self.nodes.len() {
            let reached: HashSet<&str> = out.iter().map(|(id, _)| id.as_str()).collect();
            let stranded = self
                .nodes
                .values()
                .find(|n| !reached.contains(n.id.as_str()))
                .map(|n| n.id.clone())
                .unwrap_or_default();
            return Err(match self.nodes.get(&stranded).and_then(|n| n.parent_id.clone()) {
                Some(parent_id) if !self.nodes.contains_key(&parent_id) => {
                    HierarchyError::DanglingParent {
                        item_id: stranded,
                        parent_id,
                    }
                }
                _ => HierarchyError::Cycle { item_id: stranded },
            });
        }

        Ok(out)
    }
}
