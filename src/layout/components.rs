//! Per-node state kept alongside the tree structure.
//!
//! Each component reacts to structural [`TreeEvent`]s, which keeps sizes,
//! active panes and the id index consistent no matter which operation moved
//! things around.

use slotmap::SecondaryMap;
use tracing::trace;

use crate::common::collections::HashMap;
use crate::layout::{NodeKind, sizes};
use crate::model::tree::{self, NodeId, NodeMap, Tree};

#[derive(Copy, Clone, Debug)]
enum TreeEvent {
    AddedToParent(NodeId),
    RemovingFromParent(NodeId),
    RemovedFromForest(NodeId),
}

#[derive(Default)]
pub(crate) struct Components {
    pub nodes: Nodes,
    pub sizing: Sizing,
    pub tabs: Tabs,
    /// Nodes touched since the last notification flush.
    pub dirty: Vec<NodeId>,
}

impl tree::Observer for Components {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::AddedToParent(node))
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::RemovingFromParent(node))
    }

    fn removed_child(tree: &mut Tree<Self>, parent: NodeId) {
        if parent.is_empty(&tree.map) {
            // The root layout is allowed to be empty.
            if parent.parent(&tree.map).is_some() {
                trace!(
                    id = tree.data.nodes.id(parent),
                    "pruning empty {}",
                    tree.data.nodes.kind(parent)
                );
                parent.detach(tree).remove();
            }
            return;
        }
        if tree.data.nodes.kind(parent).is_split() {
            tree.data.sizing.renormalize(&tree.map, parent);
        }
    }

    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::RemovedFromForest(node))
    }
}

impl Components {
    fn dispatch_event(&mut self, map: &NodeMap, event: TreeEvent) {
        self.sizing.handle_event(map, &self.nodes, event);
        self.tabs.handle_event(map, &self.nodes, event);
        match event {
            TreeEvent::AddedToParent(node) | TreeEvent::RemovingFromParent(node) => {
                self.dirty.push(node);
                self.dirty.extend(node.parent(map));
            }
            TreeEvent::RemovedFromForest(_) => {}
        }
        self.nodes.handle_event(event);
    }

    pub fn mark(&mut self, node: NodeId) { self.dirty.push(node); }
}

/// Identity of every node: its string id, kind, and for panes the location.
#[derive(Default)]
pub(crate) struct Nodes {
    kinds: SecondaryMap<NodeId, NodeKind>,
    ids: SecondaryMap<NodeId, String>,
    index: HashMap<String, NodeId>,
    locations: SecondaryMap<NodeId, String>,
}

impl Nodes {
    pub fn register(&mut self, node: NodeId, id: String, kind: NodeKind) {
        let existing = self.index.insert(id.clone(), node);
        assert!(existing.is_none(), "Attempted to reuse node id {id:?} for {node:?}");
        self.ids.insert(node, id);
        self.kinds.insert(node, kind);
    }

    pub fn kind(&self, node: NodeId) -> NodeKind { self.kinds[node] }

    pub fn id(&self, node: NodeId) -> &str { &self.ids[node] }

    pub fn lookup(&self, id: &str) -> Option<NodeId> { self.index.get(id).copied() }

    pub fn contains_id(&self, id: &str) -> bool { self.index.contains_key(id) }

    pub fn len(&self) -> usize { self.index.len() }

    pub fn location(&self, node: NodeId) -> Option<&str> {
        self.locations.get(node).map(String::as_str)
    }

    pub fn set_location(&mut self, node: NodeId, location: String) {
        self.locations.insert(node, location);
    }

    fn handle_event(&mut self, event: TreeEvent) {
        if let TreeEvent::RemovedFromForest(node) = event {
            if let Some(id) = self.ids.remove(node) {
                self.index.remove(&id);
            }
            self.kinds.remove(node);
            self.locations.remove(node);
        }
    }
}

/// Relative size of each child of a layout or row, in [`sizes::TOTAL`] units.
#[derive(Default)]
pub(crate) struct Sizing {
    shares: SecondaryMap<NodeId, u32>,
}

impl Sizing {
    fn handle_event(&mut self, map: &NodeMap, nodes: &Nodes, event: TreeEvent) {
        match event {
            TreeEvent::AddedToParent(node) => {
                let parent = node.parent(map).expect("added_to_parent on a root node");
                if !nodes.kind(parent).is_split() {
                    return;
                }
                let children: Vec<NodeId> = parent.children(map).collect();
                let index = children.iter().position(|&c| c == node).unwrap_or(children.len());
                let others: Vec<u32> =
                    children.iter().filter(|&&c| c != node).map(|&c| self.share(c)).collect();
                let updated = sizes::insert(&others, index);
                for (child, share) in std::iter::zip(children, updated) {
                    self.shares.insert(child, share);
                }
            }
            // Siblings are renormalized once the child is actually gone.
            TreeEvent::RemovingFromParent(_) => {}
            TreeEvent::RemovedFromForest(node) => {
                self.shares.remove(node);
            }
        }
    }

    pub fn share(&self, node: NodeId) -> u32 { self.shares.get(node).copied().unwrap_or(0) }

    pub fn shares(&self, map: &NodeMap, parent: NodeId) -> Vec<u32> {
        parent.children(map).map(|c| self.share(c)).collect()
    }

    pub fn set_shares(&mut self, map: &NodeMap, parent: NodeId, shares: &[u32]) {
        let children: Vec<NodeId> = parent.children(map).collect();
        assert_eq!(children.len(), shares.len(), "share count must match child count");
        for (child, &share) in std::iter::zip(children, shares) {
            self.shares.insert(child, share);
        }
    }

    pub fn renormalize(&mut self, map: &NodeMap, parent: NodeId) {
        let shares = sizes::rescale(&self.shares(map, parent));
        self.set_shares(map, parent, &shares);
    }
}

/// The active pane of every non-empty panel.
#[derive(Default)]
pub(crate) struct Tabs {
    active: SecondaryMap<NodeId, NodeId>,
}

impl Tabs {
    fn handle_event(&mut self, map: &NodeMap, nodes: &Nodes, event: TreeEvent) {
        match event {
            TreeEvent::AddedToParent(node) => {
                let parent = node.parent(map).expect("added_to_parent on a root node");
                if nodes.kind(parent) == NodeKind::Panel && !self.active.contains_key(parent) {
                    self.active.insert(parent, node);
                }
            }
            TreeEvent::RemovingFromParent(node) => {
                let parent = node.parent(map).expect("removing_from_parent on a root node");
                if self.active.get(parent) == Some(&node) {
                    match node.next_sibling(map).or(node.prev_sibling(map)) {
                        Some(sibling) => {
                            self.active.insert(parent, sibling);
                        }
                        None => {
                            self.active.remove(parent);
                        }
                    }
                }
            }
            TreeEvent::RemovedFromForest(node) => {
                self.active.remove(node);
            }
        }
    }

    pub fn active(&self, panel: NodeId) -> Option<NodeId> { self.active.get(panel).copied() }

    /// Returns whether the active pane changed.
    pub fn activate(&mut self, panel: NodeId, pane: NodeId) -> bool {
        self.active.insert(panel, pane) != Some(pane)
    }
}
