use uuid::Uuid;

use crate::layout::NodeKind;

/// Source of ids for nodes created without one.
///
/// Generators don't need to know which ids are taken; the tree retries until
/// it gets an unused one.
pub trait IdGenerator {
    fn next_id(&mut self, kind: NodeKind) -> String;
}

/// Random v4 UUIDs.
#[derive(Default, Debug, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self, _kind: NodeKind) -> String { Uuid::new_v4().to_string() }
}

/// Predictable ids such as `pane-3`, numbered per tree.
#[derive(Default, Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, kind: NodeKind) -> String {
        self.next += 1;
        format!("{kind}-{}", self.next)
    }
}
