use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use slotmap::{SecondaryMap, SlotMap};

use crate::layout::PanelTree;
use crate::model::tree::{NodeId, NodeMap};

slotmap::new_key_type! {
    /// Handle returned by [`PanelTree::subscribe`], used to unsubscribe.
    pub struct SubscriptionId;
}

pub(crate) enum Delivery {
    Keep,
    Drop,
}

type Callback = Box<dyn FnMut(&PanelTree) -> Delivery>;

struct Subscription {
    node: NodeId,
    callback: Callback,
}

/// Callbacks registered per node.
///
/// Delivery happens from [`PanelTree`] after each mutation has fully
/// completed; callbacks only get shared access, so they cannot mutate the
/// tree while it is notifying.
#[derive(Default)]
pub(crate) struct Subscriptions {
    entries: SlotMap<SubscriptionId, Subscription>,
    by_node: SecondaryMap<NodeId, Vec<SubscriptionId>>,
}

impl Subscriptions {
    pub fn insert(&mut self, node: NodeId, callback: Callback) -> SubscriptionId {
        let id = self.entries.insert(Subscription { node, callback });
        if let Some(entry) = self.by_node.entry(node) {
            entry.or_default().push(id);
        }
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(subscription) = self.entries.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_node.get_mut(subscription.node) {
            ids.retain(|&s| s != id);
            if ids.is_empty() {
                self.by_node.remove(subscription.node);
            }
        }
        true
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Drops every subscription whose node is no longer in the tree.
    pub fn forget_removed(&mut self, map: &NodeMap) {
        let gone: Vec<NodeId> = self.by_node.keys().filter(|&node| !map.contains(node)).collect();
        for node in gone {
            for id in self.by_node.remove(node).unwrap_or_default() {
                self.entries.remove(id);
            }
        }
    }

    /// Runs the callbacks of `nodes`, returning how many were invoked.
    pub fn deliver(&mut self, nodes: &[NodeId], tree: &PanelTree) -> usize {
        let mut delivered = 0;
        for &node in nodes {
            let Some(ids) = self.by_node.get(node).cloned() else {
                continue;
            };
            for id in ids {
                let Some(subscription) = self.entries.get_mut(id) else {
                    continue;
                };
                delivered += 1;
                if let Delivery::Drop = (subscription.callback)(tree) {
                    self.remove(id);
                }
            }
        }
        delivered
    }
}

/// A value derived from a node and kept current as the node changes.
///
/// Dropping the last handle ends the subscription at the next notification.
pub struct Observed<T> {
    pub(crate) value: Rc<RefCell<T>>,
    pub(crate) subscription: SubscriptionId,
}

impl<T> Observed<T> {
    pub fn get(&self) -> Ref<'_, T> { self.value.borrow() }

    pub fn subscription(&self) -> SubscriptionId { self.subscription }
}

impl<T: Clone> Observed<T> {
    pub fn value(&self) -> T { self.value.borrow().clone() }
}

impl<T: fmt::Debug> fmt::Debug for Observed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observed").field(&*self.value.borrow()).finish()
    }
}
