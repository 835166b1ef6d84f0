//! The panel layout model.
//!
//! A [`PanelTree`] holds layouts, rows, panels and panes in strict
//! alternation: a layout stacks rows, a row places panels or nested layouts
//! side by side, and a panel shows one of its panes as the active tab.

mod components;
mod document;
mod drag;
pub mod error;
mod ids;
mod kind;
mod model;
mod notify;
pub mod sizes;
mod view;

pub use document::{NodeDto, PaneDto, PanelDto, PanelLayoutDto, PanelRowDto};
pub use drag::{DragPayload, DropSide};
pub use error::LayoutError;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use kind::NodeKind;
pub use model::PanelTree;
pub use notify::{Observed, SubscriptionId};
pub use view::{LayoutRef, NodeHandle, NodeRef, PaneRef, PanelRef, RowRef, Sibling};
