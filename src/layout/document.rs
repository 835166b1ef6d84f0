//! The persisted document format of a panel layout.
//!
//! ```json
//! { "kind": "panelLayout", "id": "…", "sizes": [35, 65], "children": [
//!     { "kind": "panelRow", "sizes": [50, 50], "children": [
//!         { "kind": "panel", "activePaneId": "p1", "children": [
//!             { "kind": "pane", "id": "p1", "location": "notesTool:noteId=12345" }
//!         ] },
//!         …
//! ```
//!
//! Ids and sizes are optional on input. Output from the model always carries
//! both, so a serialized tree reloads into an identical one.

use serde::{Deserialize, Serialize};

use crate::common::collections::HashSet;
use crate::layout::error::{LayoutError, Result};
use crate::layout::{NodeKind, sizes};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeDto {
    PanelLayout(PanelLayoutDto),
    PanelRow(PanelRowDto),
    Panel(PanelDto),
    Pane(PaneDto),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelLayoutDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelRowDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pane_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaneDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location: String,
}

impl PanelLayoutDto {
    pub fn new(rows: impl IntoIterator<Item = PanelRowDto>) -> Self {
        PanelLayoutDto {
            children: rows.into_iter().map(NodeDto::PanelRow).collect(),
            ..Default::default()
        }
    }

    pub fn with_sizes(mut self, sizes: impl Into<Vec<f64>>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }
}

impl PanelRowDto {
    /// Accepts panels and nested layouts.
    pub fn new(children: impl IntoIterator<Item = NodeDto>) -> Self {
        PanelRowDto {
            children: children.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_sizes(mut self, sizes: impl Into<Vec<f64>>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }
}

impl PanelDto {
    pub fn new(panes: impl IntoIterator<Item = PaneDto>) -> Self {
        PanelDto {
            children: panes.into_iter().map(NodeDto::Pane).collect(),
            ..Default::default()
        }
    }
}

impl PaneDto {
    pub fn new(location: impl Into<String>) -> Self {
        PaneDto { id: None, location: location.into() }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<PanelLayoutDto> for NodeDto {
    fn from(dto: PanelLayoutDto) -> Self { NodeDto::PanelLayout(dto) }
}

impl From<PanelRowDto> for NodeDto {
    fn from(dto: PanelRowDto) -> Self { NodeDto::PanelRow(dto) }
}

impl From<PanelDto> for NodeDto {
    fn from(dto: PanelDto) -> Self { NodeDto::Panel(dto) }
}

impl From<PaneDto> for NodeDto {
    fn from(dto: PaneDto) -> Self { NodeDto::Pane(dto) }
}

impl NodeDto {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeDto::PanelLayout(_) => NodeKind::Layout,
            NodeDto::PanelRow(_) => NodeKind::Row,
            NodeDto::Panel(_) => NodeKind::Panel,
            NodeDto::Pane(_) => NodeKind::Pane,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            NodeDto::PanelLayout(dto) => dto.id.as_deref(),
            NodeDto::PanelRow(dto) => dto.id.as_deref(),
            NodeDto::Panel(dto) => dto.id.as_deref(),
            NodeDto::Pane(dto) => dto.id.as_deref(),
        }
    }

    pub fn children(&self) -> &[NodeDto] {
        match self {
            NodeDto::PanelLayout(dto) => &dto.children,
            NodeDto::PanelRow(dto) => &dto.children,
            NodeDto::Panel(dto) => &dto.children,
            NodeDto::Pane(_) => &[],
        }
    }

    pub fn sizes(&self) -> Option<&[f64]> {
        match self {
            NodeDto::PanelLayout(dto) => dto.sizes.as_deref(),
            NodeDto::PanelRow(dto) => dto.sizes.as_deref(),
            NodeDto::Panel(_) | NodeDto::Pane(_) => None,
        }
    }

    /// Number of panes in this subtree.
    pub fn pane_count(&self) -> usize {
        match self {
            NodeDto::Pane(_) => 1,
            _ => self.children().iter().map(NodeDto::pane_count).sum(),
        }
    }

    /// Checks that this subtree is well formed and may be placed under a node
    /// of kind `parent` (`None` for the document root).
    pub fn validate(&self, parent: Option<NodeKind>) -> Result<()> {
        self.validate_against(parent, |_| false)
    }

    /// Like [`NodeDto::validate`], additionally rejecting ids for which
    /// `taken` returns true.
    pub(crate) fn validate_against(
        &self,
        parent: Option<NodeKind>,
        taken: impl Fn(&str) -> bool,
    ) -> Result<()> {
        let mut seen = HashSet::default();
        self.check(parent, "$", &mut seen, &taken)
    }

    fn check<'a>(
        &'a self,
        parent: Option<NodeKind>,
        path: &str,
        seen: &mut HashSet<&'a str>,
        taken: &dyn Fn(&str) -> bool,
    ) -> Result<()> {
        let kind = self.kind();
        let placeable = match parent {
            Some(parent) => parent.can_contain(kind),
            None => kind == NodeKind::Layout,
        };
        if !placeable {
            return Err(LayoutError::KindMismatch {
                path: path.to_owned(),
                parent,
                child: kind,
            });
        }

        let children = self.children();
        if parent.is_some() && kind != NodeKind::Pane && children.is_empty() {
            return Err(LayoutError::EmptyContainer {
                path: path.to_owned(),
                kind,
            });
        }

        if let Some(id) = self.id() {
            if taken(id) || !seen.insert(id) {
                return Err(LayoutError::DuplicateId {
                    path: path.to_owned(),
                    id: id.to_owned(),
                });
            }
        }

        if let Some(values) = self.sizes() {
            if values.len() != children.len() {
                return Err(LayoutError::SizesLengthMismatch {
                    path: path.to_owned(),
                    expected: children.len(),
                    found: values.len(),
                });
            }
            sizes::from_percentages(values).map_err(|reason| LayoutError::InvalidSizes {
                path: path.to_owned(),
                sizes: values.to_vec(),
                reason,
            })?;
        }

        if let NodeDto::Panel(PanelDto { active_pane_id: Some(active), .. }) = self {
            if !children.iter().any(|c| c.id() == Some(active.as_str())) {
                return Err(LayoutError::UnknownActivePane {
                    path: path.to_owned(),
                    id: active.clone(),
                });
            }
        }

        for (i, child) in children.iter().enumerate() {
            child.check(Some(kind), &format!("{path}.children[{i}]"), seen, taken)?;
        }
        Ok(())
    }
}
