//! Hierarchy resolver.
//!
//! Rebuilds a competency tree under a root item (a course or a pathway) from
//! the flat `isChildOf`/`isPartOf` associations of a package. An edge
//! "A isChildOf B" reads as "B has child A".
//!
//! The tree lives in an arena (`Vec<HierarchyNode>`) in breadth-first order.
//! Parent links are arena indices, so they are lookups, not ownership.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::{debug, instrument, trace, warn};

use casegraph_shared::{CaseGraphError, Item, ItemKind, Result};

use crate::index::PackageIndex;

/// Position of a node in the [`Hierarchy`] arena.
pub type NodeIdx = usize;

/// One competency in a resolved tree.
#[derive(Debug, Clone)]
pub struct HierarchyNode<'a> {
    pub item: &'a Item,
    /// `None` for top children (their parent is the root item).
    pub parent: Option<NodeIdx>,
    /// Children in association declaration order.
    pub children: Vec<NodeIdx>,
    /// 1 for top children.
    pub depth: usize,
    /// First `sequenceNumber` declared for this item on a hierarchical edge.
    pub sequence_number: Option<&'a str>,
}

/// A hierarchical edge the traversal refused to follow because its child was
/// already placed elsewhere in the tree (a cycle or a second parent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    pub parent: String,
    pub child: String,
}

/// A competency tree under one root item.
#[derive(Debug, Clone)]
pub struct Hierarchy<'a> {
    root: &'a Item,
    nodes: Vec<HierarchyNode<'a>>,
    top: Vec<NodeIdx>,
    dropped: Vec<DroppedEdge>,
}

impl<'a> Hierarchy<'a> {
    /// The item the traversal started from. Not a tree node itself.
    pub fn root(&self) -> &'a Item {
        self.root
    }

    /// All nodes in breadth-first order.
    pub fn nodes(&self) -> &[HierarchyNode<'a>] {
        &self.nodes
    }

    pub fn node(&self, idx: NodeIdx) -> &HierarchyNode<'a> {
        &self.nodes[idx]
    }

    /// Arena indices of the depth-1 nodes, in presentation order.
    pub fn top_indices(&self) -> &[NodeIdx] {
        &self.top
    }

    /// Depth-1 nodes, in presentation order.
    pub fn top_children(&self) -> impl Iterator<Item = &HierarchyNode<'a>> {
        self.top.iter().map(|&idx| &self.nodes[idx])
    }

    /// Immediate children of a node.
    pub fn children(&self, idx: NodeIdx) -> impl Iterator<Item = &HierarchyNode<'a>> {
        self.nodes[idx].children.iter().map(|&c| &self.nodes[c])
    }

    /// Parent competency of a node, `None` for top children.
    pub fn parent(&self, idx: NodeIdx) -> Option<&HierarchyNode<'a>> {
        self.nodes[idx].parent.map(|p| &self.nodes[p])
    }

    /// Find a node by item identifier.
    pub fn find(&self, id: &str) -> Option<NodeIdx> {
        self.nodes.iter().position(|n| n.item.identifier == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges skipped by the cycle guard.
    pub fn dropped_edges(&self) -> &[DroppedEdge] {
        &self.dropped
    }
}

/// Resolve the competency tree under `root_id`.
///
/// Breadth-first; each item is placed at most once. Only competencies become
/// nodes. A root with no qualifying children yields an empty tree.
#[instrument(skip(index))]
pub fn resolve<'a>(index: &PackageIndex<'a>, root_id: &str) -> Result<Hierarchy<'a>> {
    let root = index
        .item(root_id)
        .ok_or_else(|| CaseGraphError::malformed(format!("unknown root item '{root_id}'")))?;

    let mut nodes: Vec<HierarchyNode<'a>> = Vec::new();
    let mut top: Vec<NodeIdx> = Vec::new();
    let mut dropped: Vec<DroppedEdge> = Vec::new();
    let mut placed: HashMap<&'a str, NodeIdx> = HashMap::new();
    let mut visited: HashSet<&'a str> = HashSet::from([root.identifier.as_str()]);
    let mut queue: VecDeque<(Option<NodeIdx>, &'a str)> =
        VecDeque::from([(None, root.identifier.as_str())]);

    while let Some((parent_idx, parent_id)) = queue.pop_front() {
        for assoc in index.children_of(parent_id) {
            let Some(child) = index.item(assoc.origin.trim()) else {
                continue;
            };
            let child_id = child.identifier.as_str();

            if child.kind != ItemKind::Competency {
                trace!(parent = parent_id, child = child_id, kind = ?child.kind, "skipping non-competency child");
                continue;
            }

            if !visited.insert(child_id) {
                let same_edge = placed
                    .get(child_id)
                    .is_some_and(|&idx| nodes[idx].parent == parent_idx);
                if !same_edge {
                    warn!(parent = parent_id, child = child_id, "dropping edge to an already placed item");
                    dropped.push(DroppedEdge {
                        parent: parent_id.to_string(),
                        child: child_id.to_string(),
                    });
                }
                continue;
            }

            let depth = parent_idx.map_or(1, |p| nodes[p].depth + 1);
            let idx = nodes.len();
            nodes.push(HierarchyNode {
                item: child,
                parent: parent_idx,
                children: Vec::new(),
                depth,
                sequence_number: first_sequence_number(index, child_id),
            });
            placed.insert(child_id, idx);

            match parent_idx {
                Some(p) => nodes[p].children.push(idx),
                None => top.push(idx),
            }
            queue.push_back((Some(idx), child_id));
        }
    }

    debug!(
        root = %root.identifier,
        nodes = nodes.len(),
        top = top.len(),
        dropped = dropped.len(),
        "hierarchy resolved"
    );

    Ok(Hierarchy {
        root,
        nodes,
        top,
        dropped,
    })
}

/// Courses a pathway prepares for: its course children plus the course
/// children of each of its parents. Sorted by identifier, no duplicates.
pub fn related_courses<'a>(index: &PackageIndex<'a>, pathway_id: &str) -> Vec<&'a Item> {
    let mut targets: BTreeMap<&'a str, &'a Item> = BTreeMap::new();

    let mut add_courses_under = |parent: &str| {
        let courses = index
            .children_of(parent)
            .filter_map(|assoc| index.item(assoc.origin.trim()))
            .filter(|item| item.kind == ItemKind::Course);
        for item in courses {
            targets.insert(item.identifier.as_str(), item);
        }
    };

    add_courses_under(pathway_id);
    for assoc in index.parents_of(pathway_id) {
        add_courses_under(assoc.destination.trim());
    }

    targets.into_values().collect()
}

fn first_sequence_number<'a>(index: &PackageIndex<'a>, child_id: &str) -> Option<&'a str> {
    index
        .parents_of(child_id)
        .filter_map(|a| a.sequence_number.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
