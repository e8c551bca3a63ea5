//! # Gizmo System
//!
//! Manipulation gizmos and the selection tool that drives them.
//!
//! ## Key Components
//!
//! - [`ManipulationGizmo`] - Interface for gizmos editing a node's transform
//! - [`TranslateGizmo`] - Axis and free-plane translation handles
//! - [`SelectionTool`] - Pointer hit testing and click/drag state machine
//!
//! ## Usage
//!
//! ```rust
//! use vantage::config::SelectionConfig;
//! use vantage::gfx::gizmos::{SelectionTool, TranslateGizmo};
//! use vantage::gfx::scene::SceneGraph;
//!
//! let mut graph = SceneGraph::new();
//! let mut tool = SelectionTool::new(Box::new(TranslateGizmo::new()), &SelectionConfig::default());
//! tool.install(&mut graph);
//! assert!(tool.selected().is_none());
//! ```

pub mod selection_tool;
pub mod traits;
pub mod translate_gizmo;

// Re-export main types
pub use selection_tool::{
    resolve_hits, GestureOutcome, HitResolution, ObserverId, SelectionChange, SelectionTool,
    ToolState,
};
pub use traits::{GizmoEvent, ManipulationGizmo};
pub use translate_gizmo::{HandleAxis, TranslateGizmo};
