use std::ops::Deref;

use crate::layout::{NodeDto, NodeKind, PanelTree};
use crate::model::tree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sibling {
    Before,
    After,
}

/// Read-only handle to a node, valid while the tree is borrowed.
#[derive(Clone, Copy)]
pub struct NodeHandle<'a> {
    tree: &'a PanelTree,
    node: NodeId,
}

impl<'a> NodeHandle<'a> {
    pub fn id(&self) -> &'a str { self.tree.id_of(self.node) }

    pub fn kind(&self) -> NodeKind { self.tree.kind_of(self.node) }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node.parent(self.tree.map()).map(|p| self.tree.node_ref(p))
    }

    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let tree = self.tree;
        self.node.children(tree.map()).map(|c| tree.node_ref(c)).collect()
    }

    /// The adjacent child of the same parent, if any.
    pub fn sibling(&self, direction: Sibling) -> Option<NodeRef<'a>> {
        let map = self.tree.map();
        let sibling = match direction {
            Sibling::Before => self.node.prev_sibling(map),
            Sibling::After => self.node.next_sibling(map),
        };
        sibling.map(|s| self.tree.node_ref(s))
    }

    pub fn to_json(&self) -> NodeDto { self.tree.dto_for(self.node) }
}

impl std::fmt::Debug for NodeHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?})", self.kind(), self.id())
    }
}

/// A node, discriminated by kind.
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Layout(LayoutRef<'a>),
    Row(RowRef<'a>),
    Panel(PanelRef<'a>),
    Pane(PaneRef<'a>),
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a PanelTree, node: NodeId) -> Self {
        let handle = NodeHandle { tree, node };
        match tree.kind_of(node) {
            NodeKind::Layout => NodeRef::Layout(LayoutRef(handle)),
            NodeKind::Row => NodeRef::Row(RowRef(handle)),
            NodeKind::Panel => NodeRef::Panel(PanelRef(handle)),
            NodeKind::Pane => NodeRef::Pane(PaneRef(handle)),
        }
    }

    pub fn as_layout(self) -> Option<LayoutRef<'a>> {
        if let NodeRef::Layout(layout) = self { Some(layout) } else { None }
    }

    pub fn as_row(self) -> Option<RowRef<'a>> {
        if let NodeRef::Row(row) = self { Some(row) } else { None }
    }

    pub fn as_panel(self) -> Option<PanelRef<'a>> {
        if let NodeRef::Panel(panel) = self { Some(panel) } else { None }
    }

    pub fn as_pane(self) -> Option<PaneRef<'a>> {
        if let NodeRef::Pane(pane) = self { Some(pane) } else { None }
    }
}

impl<'a> Deref for NodeRef<'a> {
    type Target = NodeHandle<'a>;

    fn deref(&self) -> &Self::Target {
        match self {
            NodeRef::Layout(LayoutRef(h))
            | NodeRef::Row(RowRef(h))
            | NodeRef::Panel(PanelRef(h))
            | NodeRef::Pane(PaneRef(h)) => h,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutRef<'a>(NodeHandle<'a>);

#[derive(Clone, Copy, Debug)]
pub struct RowRef<'a>(NodeHandle<'a>);

#[derive(Clone, Copy, Debug)]
pub struct PanelRef<'a>(NodeHandle<'a>);

#[derive(Clone, Copy, Debug)]
pub struct PaneRef<'a>(NodeHandle<'a>);

impl<'a> LayoutRef<'a> {
    pub fn rows(&self) -> Vec<RowRef<'a>> {
        self.0.children().into_iter().filter_map(NodeRef::as_row).collect()
    }

    pub fn sizes(&self) -> Vec<f64> { self.0.tree.percentages(self.0.node) }

    pub fn is_root(&self) -> bool { self.0.node.parent(self.0.tree.map()).is_none() }
}

impl<'a> RowRef<'a> {
    pub fn sizes(&self) -> Vec<f64> { self.0.tree.percentages(self.0.node) }

    pub fn layout(&self) -> Option<LayoutRef<'a>> { self.0.parent().and_then(NodeRef::as_layout) }
}

impl<'a> PanelRef<'a> {
    pub fn panes(&self) -> Vec<PaneRef<'a>> {
        self.0.children().into_iter().filter_map(NodeRef::as_pane).collect()
    }

    pub fn active_pane(&self) -> Option<PaneRef<'a>> {
        self.0.tree.active_of(self.0.node).map(|p| PaneRef(NodeHandle { tree: self.0.tree, node: p }))
    }

    pub fn row(&self) -> Option<RowRef<'a>> { self.0.parent().and_then(NodeRef::as_row) }
}

impl<'a> PaneRef<'a> {
    pub fn location(&self) -> &'a str { self.0.tree.location_of(self.0.node) }

    pub fn panel(&self) -> Option<PanelRef<'a>> { self.0.parent().and_then(NodeRef::as_panel) }

    pub fn is_active(&self) -> bool {
        self.0
            .node
            .parent(self.0.tree.map())
            .is_some_and(|panel| self.0.tree.active_of(panel) == Some(self.0.node))
    }
}

impl<'a> Deref for LayoutRef<'a> {
    type Target = NodeHandle<'a>;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<'a> Deref for RowRef<'a> {
    type Target = NodeHandle<'a>;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<'a> Deref for PanelRef<'a> {
    type Target = NodeHandle<'a>;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<'a> Deref for PaneRef<'a> {
    type Target = NodeHandle<'a>;

    fn deref(&self) -> &Self::Target { &self.0 }
}
