use std::fmt;

use serde::{Deserialize, Serialize};

/// The four node kinds of a panel layout.
///
/// Kinds strictly alternate: a layout holds rows, a row holds panels or
/// nested layouts, a panel holds panes, and a pane is a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Layout,
    Row,
    Panel,
    Pane,
}

impl NodeKind {
    pub fn can_contain(self, child: NodeKind) -> bool {
        use NodeKind::*;
        matches!(
            (self, child),
            (Layout, Row) | (Row, Panel) | (Row, Layout) | (Panel, Pane)
        )
    }

    /// Whether children of this kind carry relative sizes.
    pub fn is_split(self) -> bool { matches!(self, NodeKind::Layout | NodeKind::Row) }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Layout => "layout",
            NodeKind::Row => "row",
            NodeKind::Panel => "panel",
            NodeKind::Pane => "pane",
        }
    }

    /// Tag used for this kind in the document format.
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Layout => "panelLayout",
            NodeKind::Row => "panelRow",
            NodeKind::Panel => "panel",
            NodeKind::Pane => "pane",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}
