use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::common::collections::HashSet;
use crate::common::config::{Config, LayoutSettings};
use crate::layout::components::Components;
use crate::layout::error::{LayoutError, Result};
use crate::layout::notify::{Delivery, Subscriptions};
use crate::layout::view::{LayoutRef, NodeRef};
use crate::layout::{
    DragPayload, DropSide, IdGenerator, NodeDto, NodeKind, Observed, PaneDto, PanelDto,
    PanelLayoutDto, PanelRowDto, Sibling, SubscriptionId, sizes,
};
use crate::model::tree::{NodeId, NodeMap, Tree};

#[derive(Clone, Copy)]
enum Placement {
    Root,
    Append(NodeId),
    Before(NodeId),
    After(NodeId),
}

/// A panel layout: a tree of layouts, rows, panels and panes.
///
/// All nodes are addressed by their string id. Every mutator leaves the tree
/// fully consistent (sizes summing to 100, empty containers pruned, an active
/// pane in every panel) and then notifies subscribers before returning.
pub struct PanelTree {
    tree: Tree<Components>,
    root: NodeId,
    settings: LayoutSettings,
    ids: Box<dyn IdGenerator>,
    subscriptions: Subscriptions,
}

impl PanelTree {
    /// An empty layout with default settings.
    pub fn new() -> Self { Self::with_config(&Config::default()) }

    pub fn with_config(config: &Config) -> Self {
        Self::with_id_generator(config.layout.clone(), config.layout.id_strategy.generator())
    }

    pub fn with_id_generator(settings: LayoutSettings, ids: Box<dyn IdGenerator>) -> Self {
        let mut this = Self::bare(settings, ids);
        this.root = this.attach_new(NodeKind::Layout, Placement::Root);
        this.tree.data.dirty.clear();
        this
    }

    pub fn from_json(dto: &NodeDto) -> Result<Self> { Self::from_json_with(dto, &Config::default()) }

    pub fn from_json_with(dto: &NodeDto, config: &Config) -> Result<Self> {
        Self::from_json_with_ids(dto, config.layout.clone(), config.layout.id_strategy.generator())
    }

    /// Builds a tree from a document, assigning missing ids from `ids`.
    ///
    /// The document is validated as a whole first; on error nothing is built.
    pub fn from_json_with_ids(
        dto: &NodeDto,
        settings: LayoutSettings,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self> {
        if let Err(err) = dto.validate(None) {
            warn!(%err, "rejected layout document");
            return Err(err);
        }
        let mut reserved = HashSet::default();
        collect_ids(dto, &mut reserved);

        let mut this = Self::bare(settings, ids);
        this.root = this.build(dto, Placement::Root, &reserved);
        this.tree.data.dirty.clear();
        debug!(nodes = this.len(), panes = this.pane_count(), "loaded layout");
        Ok(this)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_str_with(json, &Config::default())
    }

    pub fn from_json_str_with(json: &str, config: &Config) -> Result<Self> {
        let dto: NodeDto = serde_json::from_str(json)?;
        Self::from_json_with(&dto, config)
    }

    fn bare(settings: LayoutSettings, ids: Box<dyn IdGenerator>) -> Self {
        PanelTree {
            tree: Tree::with_observer(Components::default()),
            root: NodeId::default(),
            settings,
            ids,
            subscriptions: Subscriptions::default(),
        }
    }

    fn build(&mut self, dto: &NodeDto, at: Placement, reserved: &HashSet<&str>) -> NodeId {
        let kind = dto.kind();
        let id = match dto.id() {
            Some(id) => id.to_owned(),
            None => self.fresh_id(kind, reserved),
        };
        let node = self.attach(at);
        self.tree.data.nodes.register(node, id, kind);
        if let NodeDto::Pane(pane) = dto {
            self.tree.data.nodes.set_location(node, pane.location.clone());
        }

        for child in dto.children() {
            self.build(child, Placement::Append(node), reserved);
        }

        if kind.is_split() {
            let shares = match dto.sizes() {
                Some(values) => sizes::from_percentages(values).expect("sizes were validated"),
                None => sizes::equal(dto.children().len()),
            };
            self.tree.data.sizing.set_shares(&self.tree.map, node, &shares);
        }
        if let NodeDto::Panel(PanelDto { active_pane_id: Some(active), .. }) = dto {
            let pane = self.tree.data.nodes.lookup(active).expect("active pane was validated");
            self.tree.data.tabs.activate(node, pane);
        }
        node
    }

    /// Creates an empty node with a generated id.
    fn attach_new(&mut self, kind: NodeKind, at: Placement) -> NodeId {
        let id = self.fresh_id(kind, &HashSet::default());
        let node = self.attach(at);
        self.tree.data.nodes.register(node, id, kind);
        node
    }

    fn attach(&mut self, at: Placement) -> NodeId {
        let node = self.tree.mk_node();
        match at {
            Placement::Root => node.into_root(),
            Placement::Append(parent) => node.push_back(parent),
            Placement::Before(sibling) => node.insert_before(sibling),
            Placement::After(sibling) => node.insert_after(sibling),
        }
    }

    fn fresh_id(&mut self, kind: NodeKind, reserved: &HashSet<&str>) -> String {
        loop {
            let id = self.ids.next_id(kind);
            if !self.tree.data.nodes.contains_id(&id) && !reserved.contains(id.as_str()) {
                return id;
            }
            trace!(%id, "generated id already in use");
        }
    }

    pub fn to_json(&self) -> NodeDto { self.dto_for(self.root) }

    pub fn node_to_json(&self, id: &str) -> Result<NodeDto> { Ok(self.dto_for(self.lookup(id)?)) }

    pub fn to_json_string(&self) -> Result<String> { Ok(serde_json::to_string(&self.to_json())?) }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    pub(crate) fn dto_for(&self, node: NodeId) -> NodeDto {
        let id = Some(self.id_of(node).to_owned());
        match self.kind_of(node) {
            NodeKind::Layout => PanelLayoutDto {
                id,
                children: self.child_dtos(node),
                sizes: Some(self.percentages(node)),
            }
            .into(),
            NodeKind::Row => PanelRowDto {
                id,
                children: self.child_dtos(node),
                sizes: Some(self.percentages(node)),
            }
            .into(),
            NodeKind::Panel => PanelDto {
                id,
                children: self.child_dtos(node),
                active_pane_id: self.active_of(node).map(|p| self.id_of(p).to_owned()),
            }
            .into(),
            NodeKind::Pane => PaneDto {
                id,
                location: self.location_of(node).to_owned(),
            }
            .into(),
        }
    }

    fn child_dtos(&self, node: NodeId) -> Vec<NodeDto> {
        node.children(self.map()).map(|c| self.dto_for(c)).collect()
    }
}

// Queries.
impl PanelTree {
    pub fn root_id(&self) -> &str { self.id_of(self.root) }

    pub fn root(&self) -> LayoutRef<'_> {
        match self.node_ref(self.root) {
            NodeRef::Layout(layout) => layout,
            other => panic!("root is a {}", other.kind()),
        }
    }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize { self.tree.data.nodes.len() }

    /// Whether the root layout has no rows.
    pub fn is_empty(&self) -> bool { self.root.is_empty(self.map()) }

    pub fn contains(&self, id: &str) -> bool { self.tree.data.nodes.contains_id(id) }

    pub fn node(&self, id: &str) -> Option<NodeRef<'_>> {
        self.tree.data.nodes.lookup(id).map(|node| self.node_ref(node))
    }

    pub fn kind(&self, id: &str) -> Option<NodeKind> {
        self.tree.data.nodes.lookup(id).map(|node| self.kind_of(node))
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        let node = self.tree.data.nodes.lookup(id)?;
        node.parent(self.map()).map(|p| self.id_of(p))
    }

    /// Ids of the children of `id`, empty for panes and unknown ids.
    pub fn children(&self, id: &str) -> Vec<&str> {
        let Some(node) = self.tree.data.nodes.lookup(id) else {
            return Vec::new();
        };
        node.children(self.map()).map(|c| self.id_of(c)).collect()
    }

    pub fn sibling(&self, id: &str, direction: Sibling) -> Option<&str> {
        let node = self.tree.data.nodes.lookup(id)?;
        let sibling = match direction {
            Sibling::Before => node.prev_sibling(self.map()),
            Sibling::After => node.next_sibling(self.map()),
        };
        sibling.map(|s| self.id_of(s))
    }

    /// Child sizes of a layout or row, as percentages summing to 100.
    pub fn sizes(&self, id: &str) -> Option<Vec<f64>> {
        let node = self.tree.data.nodes.lookup(id)?;
        self.kind_of(node).is_split().then(|| self.percentages(node))
    }

    /// Child sizes of a layout or row in [`sizes::TOTAL`] units.
    pub fn size_shares(&self, id: &str) -> Option<Vec<u32>> {
        let node = self.tree.data.nodes.lookup(id)?;
        self.kind_of(node)
            .is_split()
            .then(|| self.tree.data.sizing.shares(self.map(), node))
    }

    pub fn active_pane(&self, panel: &str) -> Option<&str> {
        let node = self.tree.data.nodes.lookup(panel)?;
        self.active_of(node).map(|p| self.id_of(p))
    }

    pub fn location(&self, pane: &str) -> Option<&str> {
        let node = self.tree.data.nodes.lookup(pane)?;
        self.tree.data.nodes.location(node)
    }

    pub fn pane_count(&self) -> usize { self.pane_nodes().count() }

    /// Ids of all panes in document order.
    pub fn pane_ids(&self) -> Vec<&str> { self.pane_nodes().map(|p| self.id_of(p)).collect() }

    pub fn find_panes_by_location(&self, location: &str) -> Vec<&str> {
        self.pane_nodes()
            .filter(|&p| self.tree.data.nodes.location(p) == Some(location))
            .map(|p| self.id_of(p))
            .collect()
    }

    fn pane_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root
            .traverse_preorder(self.map())
            .filter(|&node| self.kind_of(node) == NodeKind::Pane)
    }

    pub(crate) fn map(&self) -> &NodeMap { &self.tree.map }

    pub(crate) fn node_ref(&self, node: NodeId) -> NodeRef<'_> { NodeRef::new(self, node) }

    pub(crate) fn id_of(&self, node: NodeId) -> &str { self.tree.data.nodes.id(node) }

    pub(crate) fn kind_of(&self, node: NodeId) -> NodeKind { self.tree.data.nodes.kind(node) }

    pub(crate) fn active_of(&self, panel: NodeId) -> Option<NodeId> { self.tree.data.tabs.active(panel) }

    pub(crate) fn location_of(&self, pane: NodeId) -> &str {
        self.tree.data.nodes.location(pane).expect("pane without a location")
    }

    pub(crate) fn percentages(&self, node: NodeId) -> Vec<f64> {
        self.tree.data.sizing.shares(self.map(), node).into_iter().map(sizes::to_percent).collect()
    }

    fn lookup(&self, id: &str) -> Result<NodeId> {
        self.tree.data.nodes.lookup(id).ok_or_else(|| LayoutError::UnknownNode(id.to_owned()))
    }

    fn lookup_as(&self, id: &str, kind: NodeKind) -> Result<NodeId> {
        let node = self.lookup(id)?;
        self.expect_kind(id, node, kind.name(), |k| k == kind)
    }

    fn lookup_split(&self, id: &str) -> Result<NodeId> {
        let node = self.lookup(id)?;
        self.expect_kind(id, node, "layout or row", NodeKind::is_split)
    }

    fn expect_kind(
        &self,
        id: &str,
        node: NodeId,
        expected: &'static str,
        accept: impl Fn(NodeKind) -> bool,
    ) -> Result<NodeId> {
        let found = self.kind_of(node);
        if accept(found) {
            return Ok(node);
        }
        warn!(id, %found, expected, "operation on the wrong kind of node");
        Err(LayoutError::WrongKind { id: id.to_owned(), expected, found })
    }

    fn child_of(&self, parent_id: &str, parent: NodeId, id: &str) -> Result<NodeId> {
        let node = self.lookup(id)?;
        if node.parent(self.map()) != Some(parent) {
            return Err(LayoutError::NotAChild {
                parent: parent_id.to_owned(),
                node: id.to_owned(),
            });
        }
        Ok(node)
    }
}

// Structural mutation.
impl PanelTree {
    /// Inserts `row` into `layout` at `index` (appending if `None` or past
    /// the end), returning the new row's id.
    pub fn add_row(&mut self, layout: &str, row: PanelRowDto, index: Option<usize>) -> Result<String> {
        let layout = self.lookup_as(layout, NodeKind::Layout)?;
        self.insert_dto(layout, &row.into(), index)
    }

    pub fn remove_row(&mut self, layout: &str, row: &str) -> Result<()> {
        let parent = self.lookup_as(layout, NodeKind::Layout)?;
        let row = self.child_of(layout, parent, row)?;
        self.remove_node(row);
        Ok(())
    }

    /// Inserts a panel or nested layout into `row`.
    pub fn add_panel(
        &mut self,
        row: &str,
        child: impl Into<NodeDto>,
        index: Option<usize>,
    ) -> Result<String> {
        let row = self.lookup_as(row, NodeKind::Row)?;
        self.insert_dto(row, &child.into(), index)
    }

    /// Removes a panel or nested layout from `row`.
    pub fn remove_panel(&mut self, row: &str, id: &str) -> Result<()> {
        let parent = self.lookup_as(row, NodeKind::Row)?;
        let child = self.child_of(row, parent, id)?;
        self.remove_node(child);
        Ok(())
    }

    /// Inserts a pane into `panel` and makes it the active one.
    pub fn add_pane(&mut self, panel: &str, pane: PaneDto, index: Option<usize>) -> Result<String> {
        let panel = self.lookup_as(panel, NodeKind::Panel)?;
        let id = self.insert_dto_quietly(panel, &pane.into(), index)?;
        let pane = self.lookup(&id)?;
        self.activate(panel, pane);
        self.flush_notifications();
        Ok(id)
    }

    pub fn remove_pane(&mut self, panel: &str, pane: &str) -> Result<()> {
        let parent = self.lookup_as(panel, NodeKind::Panel)?;
        let pane = self.child_of(panel, parent, pane)?;
        self.remove_node(pane);
        Ok(())
    }

    /// Removes a pane from whichever panel holds it.
    pub fn close_pane(&mut self, pane: &str) -> Result<()> {
        let node = self.lookup_as(pane, NodeKind::Pane)?;
        let panel = node.parent(self.map()).expect("pane outside a panel");
        let panel = self.id_of(panel).to_owned();
        self.remove_pane(&panel, pane)
    }

    /// Makes `pane` the visible tab of `panel`. Does nothing if `pane` is not
    /// one of the panel's panes.
    pub fn set_active_pane(&mut self, panel: &str, pane: &str) -> Result<()> {
        let panel_node = self.lookup_as(panel, NodeKind::Panel)?;
        let pane_node = self
            .tree
            .data
            .nodes
            .lookup(pane)
            .filter(|p| p.parent(self.map()) == Some(panel_node));
        match pane_node {
            Some(pane_node) => {
                self.activate(panel_node, pane_node);
                self.flush_notifications();
            }
            None => debug!(panel, pane, "ignoring activation of a pane outside the panel"),
        }
        Ok(())
    }

    fn insert_dto(&mut self, parent: NodeId, dto: &NodeDto, index: Option<usize>) -> Result<String> {
        let id = self.insert_dto_quietly(parent, dto, index)?;
        self.flush_notifications();
        Ok(id)
    }

    fn insert_dto_quietly(
        &mut self,
        parent: NodeId,
        dto: &NodeDto,
        index: Option<usize>,
    ) -> Result<String> {
        let nodes = &self.tree.data.nodes;
        if let Err(err) = dto.validate_against(Some(self.kind_of(parent)), |id| nodes.contains_id(id)) {
            warn!(%err, parent = self.id_of(parent), "rejected insertion");
            return Err(err);
        }
        let mut reserved = HashSet::default();
        collect_ids(dto, &mut reserved);

        let at = match index.and_then(|i| parent.children(self.map()).nth(i)) {
            Some(sibling) => Placement::Before(sibling),
            None => Placement::Append(parent),
        };
        let node = self.build(dto, at, &reserved);
        trace!(id = self.id_of(node), parent = self.id_of(parent), "inserted {}", dto.kind());
        Ok(self.id_of(node).to_owned())
    }

    fn remove_node(&mut self, node: NodeId) {
        trace!(id = self.id_of(node), "removing {}", self.kind_of(node));
        node.detach(&mut self.tree).remove();
        self.flush_notifications();
    }

    fn activate(&mut self, panel: NodeId, pane: NodeId) {
        if self.tree.data.tabs.activate(panel, pane) {
            self.tree.data.mark(panel);
        }
    }
}

// Sizing.
impl PanelTree {
    /// Replaces the child sizes of a layout or row.
    ///
    /// The values are normalized to sum to 100; they must match the child
    /// count, be finite and non-negative, and not all be zero.
    pub fn resize(&mut self, container: &str, new_sizes: &[f64]) -> Result<()> {
        let node = self.lookup_split(container)?;
        let count = node.children(self.map()).count();
        if new_sizes.len() != count {
            return Err(LayoutError::SizesLengthMismatch {
                path: container.to_owned(),
                expected: count,
                found: new_sizes.len(),
            });
        }
        let shares = sizes::from_percentages(new_sizes).map_err(|reason| {
            LayoutError::InvalidSizes {
                path: container.to_owned(),
                sizes: new_sizes.to_vec(),
                reason,
            }
        })?;
        self.tree.data.sizing.set_shares(&self.tree.map, node, &shares);
        self.tree.data.mark(node);
        self.flush_notifications();
        Ok(())
    }

    /// Moves the boundary after child `boundary` by `delta_percent`, growing
    /// the child before it when positive.
    ///
    /// Neither adjoining child is pushed below the configured minimum size.
    /// Returns the delta actually applied, in percent.
    pub fn resize_boundary(&mut self, container: &str, boundary: usize, delta_percent: f64) -> Result<f64> {
        let node = self.lookup_split(container)?;
        let mut shares = self.tree.data.sizing.shares(self.map(), node);
        if boundary >= shares.len().saturating_sub(1) {
            return Err(LayoutError::InvalidBoundary { boundary, count: shares.len() });
        }
        if !delta_percent.is_finite() {
            return Err(LayoutError::InvalidSizes {
                path: container.to_owned(),
                sizes: vec![delta_percent],
                reason: "sizes must be finite",
            });
        }
        let delta = sizes::delta_from_percent(delta_percent);
        let applied = sizes::move_boundary(&mut shares, boundary, delta, self.settings.min_share());
        if applied != delta {
            debug!(container, boundary, delta, applied, "boundary move clamped");
        }
        if applied != 0 {
            self.tree.data.sizing.set_shares(&self.tree.map, node, &shares);
            self.tree.data.mark(node);
            self.flush_notifications();
        }
        Ok(sizes::delta_to_percent(applied))
    }
}

// Drag and drop.
impl PanelTree {
    /// Moves the dragged pane, or every pane of the dragged panel, into the
    /// tab bar of `panel` before `before` (at the end if `None`).
    ///
    /// A `before` that is not one of the panel's panes is treated as `None`.
    /// Dropping a pane onto its current position or a panel onto itself does
    /// nothing.
    pub fn add_to_tab_bar_from_drop(
        &mut self,
        panel: &str,
        payload: &DragPayload,
        before: Option<&str>,
    ) -> Result<()> {
        let target = self.lookup_as(panel, NodeKind::Panel)?;
        let before = self.resolve_before(target, before);
        match payload {
            DragPayload::Pane { pane_id } => {
                let pane = self.lookup_as(pane_id, NodeKind::Pane)?;
                if !self.move_pane(pane, target, before) {
                    debug!(pane = pane_id.as_str(), panel, "pane dropped onto its own position");
                    return Ok(());
                }
                self.activate(target, pane);
            }
            DragPayload::Panel { panel_id } => {
                let source = self.lookup_as(panel_id, NodeKind::Panel)?;
                if source == target {
                    debug!(panel, "panel dropped onto itself");
                    return Ok(());
                }
                let active = self.active_of(source);
                let panes: Vec<NodeId> = source.children(self.map()).collect();
                for pane in panes {
                    self.move_pane(pane, target, before);
                }
                if let Some(active) = active {
                    self.activate(target, active);
                }
            }
        }
        self.flush_notifications();
        Ok(())
    }

    /// Splits `panel` by dropping the payload on one of its edges.
    ///
    /// Left and right drops place a new panel beside the target in its row.
    /// Top and bottom drops replace the target with a nested layout of two
    /// rows, one holding the target and one the new panel. Returns the id of
    /// the new panel, or `None` if the drop would split a panel by its own
    /// entire content.
    pub fn split_from_drop(
        &mut self,
        panel: &str,
        payload: &DragPayload,
        side: DropSide,
    ) -> Result<Option<String>> {
        let target = self.lookup_as(panel, NodeKind::Panel)?;
        let (moving, active) = match payload {
            DragPayload::Pane { pane_id } => {
                let pane = self.lookup_as(pane_id, NodeKind::Pane)?;
                (vec![pane], Some(pane))
            }
            DragPayload::Panel { panel_id } => {
                let source = self.lookup_as(panel_id, NodeKind::Panel)?;
                (source.children(self.map()).collect::<Vec<_>>(), self.active_of(source))
            }
        };
        let map = self.map();
        if moving.iter().all(|p| p.parent(map) == Some(target))
            && moving.len() == target.children(map).count()
        {
            debug!(panel, ?side, "panel split by its own content");
            return Ok(None);
        }

        let new_panel = if side.is_horizontal() {
            let at = if side.is_leading() {
                Placement::Before(target)
            } else {
                Placement::After(target)
            };
            self.attach_new(NodeKind::Panel, at)
        } else {
            self.wrap_in_layout(target, side)
        };
        for pane in moving {
            self.move_pane(pane, new_panel, None);
        }
        if let Some(active) = active {
            self.activate(new_panel, active);
        }
        let id = self.id_of(new_panel).to_owned();
        trace!(%id, panel, ?side, "split panel");
        self.flush_notifications();
        Ok(Some(id))
    }

    /// Replaces `target` in its row with a two-row layout holding it, and
    /// returns a new empty panel in the other row.
    fn wrap_in_layout(&mut self, target: NodeId, side: DropSide) -> NodeId {
        let row = target.parent(self.map()).expect("panel outside a row");
        let row_shares = self.tree.data.sizing.shares(self.map(), row);

        let layout = self.attach_new(NodeKind::Layout, Placement::Before(target));
        let upper = self.attach_new(NodeKind::Row, Placement::Append(layout));
        let lower = self.attach_new(NodeKind::Row, Placement::Append(layout));
        let (target_row, new_row) = if side.is_leading() { (lower, upper) } else { (upper, lower) };
        target.detach(&mut self.tree).push_back(target_row);

        // The layout now sits exactly where the target was.
        self.tree.data.sizing.set_shares(&self.tree.map, row, &row_shares);
        self.attach_new(NodeKind::Panel, Placement::Append(new_row))
    }

    /// Returns whether anything moved.
    fn move_pane(&mut self, pane: NodeId, panel: NodeId, before: Option<NodeId>) -> bool {
        let map = self.map();
        if before == Some(pane) {
            return false;
        }
        if pane.parent(map) == Some(panel) && pane.next_sibling(map) == before {
            return false;
        }
        let detached = pane.detach(&mut self.tree);
        match before {
            Some(sibling) => detached.insert_before(sibling),
            None => detached.push_back(panel),
        };
        // Reordering within a panel fires no structural events.
        self.tree.data.mark(panel);
        true
    }

    fn resolve_before(&self, panel: NodeId, before: Option<&str>) -> Option<NodeId> {
        let id = before?;
        let node = self
            .tree
            .data
            .nodes
            .lookup(id)
            .filter(|n| n.parent(self.map()) == Some(panel));
        if node.is_none() {
            debug!(before = id, "drop position is not in the target panel, appending");
        }
        node
    }
}

// Subscriptions.
impl PanelTree {
    /// Calls `callback` after every mutation of the node `id` or its subtree.
    pub fn subscribe(
        &mut self,
        id: &str,
        mut callback: impl FnMut(&PanelTree) + 'static,
    ) -> Result<SubscriptionId> {
        let node = self.lookup(id)?;
        Ok(self.subscriptions.insert(
            node,
            Box::new(move |tree| {
                callback(tree);
                Delivery::Keep
            }),
        ))
    }

    /// Returns whether the subscription was still registered.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.subscriptions.remove(subscription)
    }

    pub fn subscription_count(&self) -> usize { self.subscriptions.len() }

    /// Evaluates `accessor` for `id` now and again whenever that node or its
    /// subtree changes.
    ///
    /// Holding the [`Observed::get`] borrow across a mutation panics.
    pub fn observe<T: 'static>(
        &mut self,
        id: &str,
        accessor: impl Fn(&PanelTree, &str) -> T + 'static,
    ) -> Result<Observed<T>> {
        let node = self.lookup(id)?;
        let value = Rc::new(RefCell::new(accessor(self, id)));
        let cell = Rc::downgrade(&value);
        let id = id.to_owned();
        let subscription = self.subscriptions.insert(
            node,
            Box::new(move |tree| {
                let Some(cell) = cell.upgrade() else {
                    return Delivery::Drop;
                };
                *cell.borrow_mut() = accessor(tree, &id);
                Delivery::Keep
            }),
        );
        Ok(Observed { value, subscription })
    }

    /// Notifies subscribers of every node touched since the last flush, and
    /// of their ancestors, once each.
    fn flush_notifications(&mut self) {
        let dirty = std::mem::take(&mut self.tree.data.dirty);
        self.subscriptions.forget_removed(&self.tree.map);
        if dirty.is_empty() || self.subscriptions.is_empty() {
            return;
        }
        let map = &self.tree.map;
        let mut seen = HashSet::default();
        let nodes: Vec<NodeId> = dirty
            .iter()
            .flat_map(|&node| node.ancestors(map))
            .filter(|&node| seen.insert(node))
            .collect();

        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        let delivered = subscriptions.deliver(&nodes, self);
        self.subscriptions = subscriptions;
        trace!(nodes = nodes.len(), delivered, "delivered notifications");
    }
}

impl PanelTree {
    /// Verifies every structural invariant, describing the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let map = self.map();
        let nodes = &self.tree.data.nodes;
        if self.root.parent(map).is_some() || self.kind_of(self.root) != NodeKind::Layout {
            return Err("root must be a parentless layout".into());
        }
        let mut count = 0;
        for node in self.root.traverse_preorder(map) {
            count += 1;
            let id = nodes.id(node);
            let kind = nodes.kind(node);
            if nodes.lookup(id) != Some(node) {
                return Err(format!("{id}: id index is out of date"));
            }
            if let Some(parent) = node.parent(map) {
                if !self.kind_of(parent).can_contain(kind) {
                    return Err(format!("{id}: a {kind} inside a {}", self.kind_of(parent)));
                }
            }
            let children = node.children(map).count();
            if node != self.root && kind != NodeKind::Pane && children == 0 {
                return Err(format!("{id}: empty {kind} was not pruned"));
            }
            if kind.is_split() {
                let shares = self.tree.data.sizing.shares(map, node);
                let total: u32 = shares.iter().sum();
                if children > 0 && total != sizes::TOTAL {
                    return Err(format!("{id}: sizes {shares:?} do not sum to {}", sizes::TOTAL));
                }
            }
            match (kind, self.active_of(node)) {
                (NodeKind::Panel, Some(active)) if active.parent(map) != Some(node) => {
                    return Err(format!("{id}: active pane is not a child"));
                }
                (NodeKind::Panel, None) => return Err(format!("{id}: panel has no active pane")),
                (NodeKind::Pane, _) if nodes.location(node).is_none() => {
                    return Err(format!("{id}: pane has no location"));
                }
                _ => {}
            }
        }
        if count != nodes.len() || count != map.len() {
            return Err(format!(
                "{count} reachable nodes, {} registered, {} allocated",
                nodes.len(),
                map.len()
            ));
        }
        Ok(())
    }
}

impl Default for PanelTree {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for PanelTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelTree")
            .field("root", &self.root_id())
            .field("nodes", &self.len())
            .field("panes", &self.pane_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

fn collect_ids<'a>(dto: &'a NodeDto, out: &mut HashSet<&'a str>) {
    out.extend(dto.id());
    for child in dto.children() {
        collect_ids(child, out);
    }
}
