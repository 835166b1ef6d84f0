use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What is being dragged: a single pane (a tab) or a whole panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DragPayload {
    #[serde(rename_all = "camelCase")]
    Pane { pane_id: String },
    #[serde(rename_all = "camelCase")]
    Panel { panel_id: String },
}

impl DragPayload {
    pub fn pane(id: impl Into<String>) -> Self { DragPayload::Pane { pane_id: id.into() } }

    pub fn panel(id: impl Into<String>) -> Self { DragPayload::Panel { panel_id: id.into() } }

    /// Recognizes a payload in arbitrary drag data, rejecting anything that is
    /// not exactly a pane or panel payload.
    pub fn from_value(value: &Value) -> Option<Self> { Self::deserialize(value).ok() }

    pub fn is_pane(&self) -> bool { matches!(self, DragPayload::Pane { .. }) }

    pub fn is_panel(&self) -> bool { matches!(self, DragPayload::Panel { .. }) }

    /// Id of the dragged node.
    pub fn source_id(&self) -> &str {
        match self {
            DragPayload::Pane { pane_id } => pane_id,
            DragPayload::Panel { panel_id } => panel_id,
        }
    }
}

/// Edge of a panel a payload was dropped on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl DropSide {
    /// Whether the dropped content ends up before the target.
    pub fn is_leading(self) -> bool { matches!(self, DropSide::Left | DropSide::Top) }

    /// Whether the drop splits the target's row rather than the panel itself.
    pub fn is_horizontal(self) -> bool { matches!(self, DropSide::Left | DropSide::Right) }
}
