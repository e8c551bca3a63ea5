use crate::gfx::scene::{Mesh, ModelNode};

/// Bare triangle geometry, as produced by STL and PLY parsers
#[derive(Debug, Clone)]
pub struct Geometry {
    pub name: String,
    pub mesh: Mesh,
    pub selectable: bool,
}

/// Scene-style result carrying a default scene plus every scene in the file
#[derive(Debug, Clone)]
pub struct SceneAsset {
    pub scene: ModelNode,
    pub scenes: Vec<ModelNode>,
}

/// Typed parser result; shapes pass through the loader untouched apart from
/// the selectable pass
#[derive(Debug, Clone)]
pub enum ModelData {
    /// Node group (OBJ, FBX)
    Group(ModelNode),
    /// Scene container (GLTF, Collada)
    Scene(SceneAsset),
    /// Single object hierarchy (Rhino3dm)
    Object(ModelNode),
    /// Raw geometry (STL, PLY)
    Geometry(Geometry),
}

impl ModelData {
    /// Mark the result selectable
    ///
    /// Node results are marked recursively; for scene results only the
    /// default scene is walked. Raw geometry carries the flag itself.
    pub fn mark_selectable(&mut self) {
        match self {
            ModelData::Group(root) | ModelData::Object(root) => {
                root.visit_mut(&mut |node| node.selectable = true)
            }
            ModelData::Scene(asset) => asset
                .scene
                .visit_mut(&mut |node| node.selectable = true),
            ModelData::Geometry(geometry) => geometry.selectable = true,
        }
    }

    /// Whether every node (or the geometry) is selectable
    pub fn is_selectable(&self) -> bool {
        let all_selectable = |root: &ModelNode| {
            let mut all = true;
            root.visit(&mut |node| all &= node.selectable);
            all
        };
        match self {
            ModelData::Group(root) | ModelData::Object(root) => all_selectable(root),
            ModelData::Scene(asset) => all_selectable(&asset.scene),
            ModelData::Geometry(geometry) => geometry.selectable,
        }
    }

    /// Convert into a node tree ready for [`SceneGraph::add_tree`]
    ///
    /// Raw geometry becomes a single mesh node inheriting its flag.
    ///
    /// [`SceneGraph::add_tree`]: crate::gfx::scene::SceneGraph::add_tree
    pub fn into_node(self) -> ModelNode {
        match self {
            ModelData::Group(root) | ModelData::Object(root) => root,
            ModelData::Scene(asset) => asset.scene,
            ModelData::Geometry(geometry) => {
                let mut node = ModelNode::with_mesh(geometry.name, geometry.mesh);
                node.selectable = geometry.selectable;
                node
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_marked_recursively() {
        let mut data = ModelData::Group(
            ModelNode::new("group")
                .with_child(ModelNode::new("a").with_child(ModelNode::new("a.1")))
                .with_child(ModelNode::new("b")),
        );
        assert!(!data.is_selectable());
        data.mark_selectable();
        assert!(data.is_selectable());
    }

    #[test]
    fn test_scene_marks_default_scene_only() {
        let mut data = ModelData::Scene(SceneAsset {
            scene: ModelNode::new("main").with_child(ModelNode::new("child")),
            scenes: vec![ModelNode::new("alt")],
        });
        data.mark_selectable();
        assert!(data.is_selectable());
        let ModelData::Scene(asset) = data else {
            unreachable!()
        };
        assert!(!asset.scenes[0].selectable);
    }

    #[test]
    fn test_geometry_flag_survives_conversion() {
        let mut data = ModelData::Geometry(Geometry {
            name: "part".to_string(),
            mesh: Mesh::from_vertices(Vec::new(), Vec::new()),
            selectable: false,
        });
        data.mark_selectable();
        let node = data.into_node();
        assert_eq!(node.name, "part");
        assert!(node.selectable);
        assert!(node.mesh.is_some());
    }
}
