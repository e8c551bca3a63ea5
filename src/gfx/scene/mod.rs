//! # Scene Management Module
//!
//! Arena-backed scene graph, CPU meshes and the vertex format they upload to.
//!
//! ## Key Components
//!
//! - [`SceneGraph`] - Node hierarchy addressed by generational [`NodeId`]s
//! - [`SceneNode`] - Transform, optional mesh and selection flags
//! - [`ModelNode`] - Detached node tree produced by model parsers
//! - [`Mesh`] - Immutable triangle mesh shared between nodes
//! - [`Vertex3D`] - GPU vertex layout with position and normal
//!
//! ## Usage
//!
//! ```rust
//! use vantage::gfx::scene::{ModelNode, SceneGraph};
//!
//! let mut graph = SceneGraph::new();
//! let root = graph.add_tree(&ModelNode::new("model"), None);
//! assert!(graph.contains(root));
//! ```

pub mod graph;
pub mod mesh;
pub mod node;
pub mod vertex;

// Re-export main types
pub use graph::{NodeId, SceneGraph};
pub use mesh::Mesh;
pub use node::{ModelNode, SceneNode, Transform, DEFAULT_NODE_COLOR};
pub use vertex::Vertex3D;
