//! Nested merger-tree view of the progenitor relation, for diagnostics and
//! plotting.

use std::fmt::Write as _;

use ahash::AHashSet;

use super::host::require_host;
use super::mass::host_mass;
use super::progenitors::direct_progenitors;
use crate::catalog::{HaloCatalog, NodeId};
use crate::error::{HaloError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergerTree {
    /// Host with no progenitors.
    Leaf(NodeId),
    /// Host with one child per direct progenitor host, ascending by id.
    Internal {
        id: NodeId,
        children: Vec<MergerTree>,
    },
}

impl MergerTree {
    pub fn id(&self) -> NodeId {
        match self {
            MergerTree::Leaf(id) | MergerTree::Internal { id, .. } => *id,
        }
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        match self {
            MergerTree::Leaf(_) => 1,
            MergerTree::Internal { children, .. } => {
                1 + children.iter().map(MergerTree::node_count).sum::<usize>()
            }
        }
    }

    /// Levels below and including the root; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            MergerTree::Leaf(_) => 1,
            MergerTree::Internal { children, .. } => {
                1 + children.iter().map(MergerTree::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Builds the merger tree rooted at main halo `root`.
pub fn build_tree(catalog: &HaloCatalog, root: NodeId) -> Result<MergerTree> {
    require_host(catalog, root)?;
    let mut on_path = AHashSet::default();
    let tree = build_node(catalog, root, &mut on_path)?;
    tracing::debug!(root, nodes = tree.node_count(), depth = tree.depth(), "built merger tree");
    Ok(tree)
}

fn build_node(
    catalog: &HaloCatalog,
    id: NodeId,
    on_path: &mut AHashSet<NodeId>,
) -> Result<MergerTree> {
    let bound = catalog.len();
    if on_path.len() > bound || !on_path.insert(id) {
        return Err(HaloError::CycleDetected { id, bound });
    }
    let progenitors = direct_progenitors(catalog, id)?;
    let node = if progenitors.is_empty() {
        MergerTree::Leaf(id)
    } else {
        let children = progenitors
            .into_iter()
            .map(|p| build_node(catalog, p, on_path))
            .collect::<Result<Vec<_>>>()?;
        MergerTree::Internal { id, children }
    };
    on_path.remove(&id);
    Ok(node)
}

/// Every id in the tree, root first, in depth-first pre-order.
pub fn flatten(tree: &MergerTree) -> Vec<NodeId> {
    fn walk(node: &MergerTree, out: &mut Vec<NodeId>) {
        match node {
            MergerTree::Leaf(id) => out.push(*id),
            MergerTree::Internal { id, children } => {
                out.push(*id);
                for child in children {
                    walk(child, out);
                }
            }
        }
    }
    let mut out = Vec::with_capacity(tree.node_count());
    walk(tree, &mut out);
    out
}

/// Indented listing, one node per line: `id snap=<s> mass=<m>`.
pub fn render_text(tree: &MergerTree, catalog: &HaloCatalog) -> Result<String> {
    fn walk(
        node: &MergerTree,
        catalog: &HaloCatalog,
        level: usize,
        out: &mut String,
    ) -> Result<()> {
        let id = node.id();
        let snap = catalog.get(id)?.snapshot_number;
        let mass = host_mass(catalog, id)?;
        let _ = writeln!(out, "{:indent$}{id} snap={snap} mass={mass}", "", indent = 4 * level);
        if let MergerTree::Internal { children, .. } = node {
            for child in children {
                walk(child, catalog, level + 1, out)?;
            }
        }
        Ok(())
    }
    let mut out = String::new();
    walk(tree, catalog, 0, &mut out)?;
    Ok(out)
}

/// Graphviz digraph with edges pointing from progenitor to descendant.
pub fn render_dot(tree: &MergerTree, catalog: &HaloCatalog) -> Result<String> {
    let mut out = String::from("digraph merger_tree {\n\trankdir=BT;\n");
    let mut labelled = AHashSet::default();
    let mut edges = AHashSet::default();
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
        let id = node.id();
        if labelled.insert(id) {
            let rec = catalog.get(id)?;
            let mass = host_mass(catalog, id)?;
            let _ = writeln!(
                out,
                "\t{id} [label=\"{id}\\nsnap {}\\nmass {mass}\"];",
                rec.snapshot_number
            );
        }
        if let MergerTree::Internal { children, .. } = node {
            // a repeated edge means a repeated subtree
            for child in children.iter().rev() {
                if edges.insert((child.id(), id)) {
                    let _ = writeln!(out, "\t{} -> {id};", child.id());
                    stack.push(child);
                }
            }
        }
    }
    out.push_str("}\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{diamond, scenario};
    use crate::genealogy::progenitors::{PathPolicy, progenitor_hosts};
    use itertools::Itertools;

    #[test]
    fn builds_nested_tree() {
        let cat = scenario();
        let tree = build_tree(&cat, 1).unwrap();
        assert_eq!(
            tree,
            MergerTree::Internal {
                id: 1,
                children: vec![MergerTree::Internal {
                    id: 2,
                    children: vec![MergerTree::Leaf(4)],
                }],
            }
        );
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 3);
        assert_eq!(flatten(&tree), vec![1, 2, 4]);
    }

    #[test]
    fn subhalo_root_is_invalid() {
        let cat = scenario();
        assert!(matches!(build_tree(&cat, 3), Err(HaloError::InvalidHalo(3))));
        assert!(matches!(build_tree(&cat, 77), Err(HaloError::NotFound(77))));
    }

    #[test]
    fn flatten_matches_progenitor_closure() {
        let cat = diamond();
        let flat = flatten(&build_tree(&cat, 1).unwrap());

        let mut per_path = vec![1];
        per_path.extend(progenitor_hosts(&cat, 1, PathPolicy::PerPath).unwrap());
        assert_eq!(flat, per_path);

        let mut distinct = vec![1];
        distinct.extend(progenitor_hosts(&cat, 1, PathPolicy::Distinct).unwrap());
        assert_eq!(
            flat.iter().copied().sorted().dedup().collect::<Vec<_>>(),
            distinct.into_iter().sorted().collect::<Vec<_>>()
        );
    }

    #[test]
    fn text_rendering_indents_by_depth() {
        let cat = scenario();
        let text = render_text(&build_tree(&cat, 1).unwrap(), &cat).unwrap();
        assert_eq!(
            text,
            "1 snap=2 mass=150\n    2 snap=1 mass=120\n        4 snap=0 mass=35\n"
        );
    }

    #[test]
    fn dot_rendering_has_edges_towards_descendants() {
        let cat = diamond();
        let dot = render_dot(&build_tree(&cat, 1).unwrap(), &cat).unwrap();
        assert!(dot.starts_with("digraph merger_tree {"));
        assert!(dot.contains("\t10 -> 1;"));
        assert!(dot.contains("\t20 -> 11;"));
        assert_eq!(dot.matches("\t20 [label=").count(), 1);
    }

    #[test]
    fn shared_subtree_edges_are_written_once() {
        // 20 feeds both 10 and 11, and 30 feeds 20
        let cat = HaloCatalog::from_rows(&[
            [1, -1, 3, 100, 1, -1, 1],
            [10, 1, 2, 40, 10, 1, 1],
            [11, 1, 2, 30, 11, 1, 1],
            [20, 10, 1, 8, 20, 10, 1],
            [21, 11, 1, 2, 20, 11, 0],
            [30, 20, 0, 5, 30, 20, 1],
        ])
        .unwrap();
        let dot = render_dot(&build_tree(&cat, 1).unwrap(), &cat).unwrap();
        assert_eq!(dot.matches("\t30 -> 20;").count(), 1);
        assert_eq!(dot.matches("\t20 -> 10;").count(), 1);
        assert_eq!(dot.matches("\t20 -> 11;").count(), 1);
        assert_eq!(dot.matches("\t30 [label=").count(), 1);
    }

    #[test]
    fn descendant_cycle_fails_tree_build() {
        let cat = HaloCatalog::from_rows(&[
            [1, 2, 0, 10, 1, 2, 1],
            [2, 1, 1, 10, 2, 1, 1],
        ])
        .unwrap();
        assert!(matches!(build_tree(&cat, 1), Err(HaloError::CycleDetected { .. })));

        let cat = HaloCatalog::from_rows(&[[1, 1, 0, 10, 1, 1, 1]]).unwrap();
        assert!(matches!(build_tree(&cat, 1), Err(HaloError::CycleDetected { id: 1, .. })));
    }
}
