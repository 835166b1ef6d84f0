use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

/// N-ary tree stored in a slotmap arena.
///
/// Structure lives in [`NodeMap`]; everything else about a node is kept by the
/// observer `O` in side tables keyed by [`NodeId`].
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: NodeMap::new(), data } }

    pub fn mk_node(&mut self) -> UnattachedNode<'_, O> {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        UnattachedNode { id, tree: self }
    }
}

/// Links of every node in the arena.
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

impl NodeId {
    #[track_caller]
    pub fn detach<O: Observer>(self, tree: &mut Tree<O>) -> DetachedNode<'_, O> {
        DetachedNode { id: self, tree }
    }

    pub fn parent(self, map: &NodeMap) -> Option<NodeId> { map.map.get(self).and_then(|n| n.parent) }

    pub fn children(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = map.map.get(self).and_then(|n| n.first_child);
        std::iter::from_fn(move || {
            let id = cur?;
            cur = id.next_sibling(map);
            Some(id)
        })
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(self).filter(|&n| map.contains(n));
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| n.parent(map));
            node
        })
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal { top: self, cur: Some(self).filter(|&n| map.contains(n)), map }
    }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.next_sibling)
    }

    pub fn prev_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.prev_sibling)
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.first_child)
    }

    pub fn last_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.last_child)
    }

    pub fn is_empty(self, map: &NodeMap) -> bool {
        map.map.get(self).is_none_or(|n| n.first_child.is_none())
    }

    /// Position of this node among its siblings.
    pub fn index_in_parent(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.children(map).position(|c| c == self)
    }
}

/// Hooks invoked as the structure of the tree changes.
///
/// `removed_child` runs after the child has been unlinked and may itself
/// restructure the tree, which is how empty containers get pruned.
pub trait Observer
where Self: Sized {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removed_child(tree: &mut Tree<Self>, parent: NodeId);
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removing_from_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removed_child(_tree: &mut Tree<Self>, _parent: NodeId) {}

    fn removed_from_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
}

#[must_use = "Unattached nodes should be inserted into the tree or kept as its root"]
pub struct UnattachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> UnattachedNode<'a, O> {
    /// Keeps the node as a parentless root.
    pub fn into_root(self) -> NodeId { self.id }

    #[track_caller]
    pub fn push_back(self, parent: NodeId) -> NodeId {
        self.id.link_under_back(parent, &mut self.tree.map);
        self.tree.data.added_to_parent(&self.tree.map, self.id);
        self.id
    }

    #[track_caller]
    pub fn insert_before(self, sibling: NodeId) -> NodeId {
        self.id.link_before(sibling, &mut self.tree.map);
        self.tree.data.added_to_parent(&self.tree.map, self.id);
        self.id
    }

    #[track_caller]
    pub fn insert_after(self, sibling: NodeId) -> NodeId {
        self.id.link_after(sibling, &mut self.tree.map);
        self.tree.data.added_to_parent(&self.tree.map, self.id);
        self.id
    }
}

#[must_use = "Detached nodes should be reattached to the tree or removed"]
pub struct DetachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> DetachedNode<'a, O> {
    #[track_caller]
    pub fn push_back(self, parent: NodeId) -> NodeId {
        self.reattach(parent, |id, map| id.link_under_back(parent, map))
    }

    #[track_caller]
    pub fn insert_before(self, sibling: NodeId) -> NodeId {
        let parent = sibling.parent(&self.tree.map).expect("cannot make a sibling of a root node");
        self.reattach(parent, |id, map| id.link_before(sibling, map))
    }

    #[track_caller]
    pub fn insert_after(self, sibling: NodeId) -> NodeId {
        let parent = sibling.parent(&self.tree.map).expect("cannot make a sibling of a root node");
        self.reattach(parent, |id, map| id.link_after(sibling, map))
    }

    /// Unlinks the node and deletes it together with its subtree.
    #[track_caller]
    pub fn remove(self) {
        let tree = self.tree;
        let Some(parent) = self.id.parent(&tree.map) else {
            panic!("remove called on root node {:?}", self.id);
        };
        tree.data.removing_from_parent(&tree.map, self.id);
        tree.map.unlink(self.id);
        O::removed_child(tree, parent);
        let doomed: Vec<NodeId> = self.id.traverse_preorder(&tree.map).collect();
        for node in doomed {
            tree.data.removed_from_forest(&tree.map, node);
        }
        for node in self.id.traverse_preorder(&tree.map).collect::<Vec<_>>() {
            tree.map.map.remove(node);
        }
    }

    fn reattach(self, new_parent: NodeId, link: impl FnOnce(NodeId, &mut NodeMap)) -> NodeId {
        let tree = self.tree;
        assert!(
            !new_parent.ancestors(&tree.map).any(|a| a == self.id),
            "cannot move {:?} underneath itself",
            self.id
        );
        let old_parent = self.id.parent(&tree.map);
        let changes_parent = old_parent != Some(new_parent);
        if changes_parent && old_parent.is_some() {
            tree.data.removing_from_parent(&tree.map, self.id);
        }
        tree.map.unlink(self.id);
        link(self.id, &mut tree.map);
        if changes_parent {
            tree.data.added_to_parent(&tree.map, self.id);
            if let Some(old) = old_parent {
                O::removed_child(tree, old);
            }
        }
        self.id
    }
}

#[derive(Default, PartialEq, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

impl NodeId {
    fn link_under_back(self, parent: NodeId, map: &mut NodeMap) {
        assert_ne!(self, parent, "cannot attach a node to itself");
        let prev = {
            let parent_node = &mut map[parent];
            parent_node.first_child.get_or_insert(self);
            parent_node.last_child.replace(self)
        };
        map[self].parent = Some(parent);
        if let Some(prev) = prev {
            map[prev].next_sibling = Some(self);
            map[self].prev_sibling = Some(prev);
        }
    }

    #[track_caller]
    fn link_before(self, next: NodeId, map: &mut NodeMap) {
        let parent = next.parent(map).expect("cannot make a sibling of a root node");
        let prev = map[next].prev_sibling.replace(self);
        map[self].parent = Some(parent);
        map[self].next_sibling = Some(next);
        map[self].prev_sibling = prev;
        match prev {
            Some(prev) => map[prev].next_sibling = Some(self),
            None => map[parent].first_child = Some(self),
        }
    }

    #[track_caller]
    fn link_after(self, prev: NodeId, map: &mut NodeMap) {
        let parent = prev.parent(map).expect("cannot make a sibling of a root node");
        let next = map[prev].next_sibling.replace(self);
        map[self].parent = Some(parent);
        map[self].prev_sibling = Some(prev);
        map[self].next_sibling = next;
        match next {
            Some(next) => map[next].prev_sibling = Some(self),
            None => map[parent].last_child = Some(self),
        }
    }
}

impl NodeMap {
    fn unlink(&mut self, id: NodeId) {
        let Some(node) = self.map.get(id) else {
            return;
        };
        let (prev, next, parent) = (node.prev_sibling, node.next_sibling, node.parent);
        if let Some(prev) = prev {
            self[prev].next_sibling = next;
        }
        if let Some(next) = next {
            self[next].prev_sibling = prev;
        }
        if let Some(parent) = parent {
            let parent_node = &mut self[parent];
            if parent_node.first_child == Some(id) {
                parent_node.first_child = next;
            }
            if parent_node.last_child == Some(id) {
                parent_node.last_child = prev;
            }
        }
        let node = &mut self[id];
        node.prev_sibling = None;
        node.next_sibling = None;
        node.parent = None;
    }
}

struct PreorderTraversal<'a> {
    top: NodeId,
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        if let Some(child) = node.first_child(self.map) {
            self.cur = Some(child);
        } else {
            self.cur = None;
            for ancestor in node.ancestors(self.map) {
                if ancestor == self.top {
                    break;
                }
                if let Some(sibling) = ancestor.next_sibling(self.map) {
                    self.cur = Some(sibling);
                    break;
                }
            }
        }
        Some(node)
    }
}
