use std::path::Path;

use cgmath::{Quaternion, Vector3};

use crate::gfx::scene::{Mesh, ModelNode, Transform};
use crate::loading::error::ParseError;
use crate::loading::model::{ModelData, SceneAsset};

/// Parse glTF 2.0 (`.gltf` or `.glb`) into a scene asset
///
/// External buffers are resolved relative to `source`. Only triangle-list
/// primitives are imported.
pub fn parse(bytes: &[u8], source: &Path) -> Result<ModelData, ParseError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, source.parent(), blob)?;

    let scenes: Vec<ModelNode> = document
        .scenes()
        .map(|scene| {
            let mut root = ModelNode::new(scene.name().unwrap_or("Scene"));
            root.children = scene
                .nodes()
                .map(|node| convert_node(&node, &buffers))
                .collect();
            root
        })
        .collect();

    let default_index = document
        .default_scene()
        .map(|scene| scene.index())
        .unwrap_or(0);
    let scene = scenes
        .get(default_index)
        .cloned()
        .ok_or(ParseError::Empty("glTF"))?;

    Ok(ModelData::Scene(SceneAsset { scene, scenes }))
}

fn convert_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> ModelNode {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));
    let mut model = ModelNode::new(name);

    let (translation, rotation, scale) = node.transform().decomposed();
    model.transform = Transform {
        position: Vector3::from(translation),
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: Vector3::from(scale),
    };

    if let Some(mesh) = node.mesh() {
        let mut primitives: Vec<ModelNode> = mesh
            .primitives()
            .filter(|primitive| primitive.mode() == gltf::mesh::Mode::Triangles)
            .enumerate()
            .filter_map(|(index, primitive)| {
                let mesh = read_primitive(&primitive, buffers)?;
                let mut child = ModelNode::with_mesh(format!("{}_{index}", model.name), mesh);
                let [r, g, b, a] = primitive
                    .material()
                    .pbr_metallic_roughness()
                    .base_color_factor();
                child.color = [r, g, b, a];
                Some(child)
            })
            .collect();

        // A single primitive lives on the node itself
        if primitives.len() == 1 {
            let only = primitives.remove(0);
            model.mesh = only.mesh;
            model.color = only.color;
        } else {
            model.children.extend(primitives);
        }
    }

    model
        .children
        .extend(node.children().map(|child| convert_node(&child, buffers)));
    model
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<Mesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

    let positions: Vec<f32> = reader.read_positions()?.flatten().collect();
    let normals: Vec<f32> = reader
        .read_normals()
        .map(|normals| normals.flatten().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..(positions.len() / 3) as u32).collect(),
    };

    let mesh = Mesh::new(positions, normals, indices);
    (!mesh.is_empty()).then_some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One triangle with positions in an embedded base64 buffer
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "name": "Main", "nodes": [0] } ],
        "nodes": [ { "name": "Tri", "mesh": 0, "translation": [0.0, 1.0, 0.0] } ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "buffers": [ {
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        } ],
        "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 36 } ],
        "accessors": [ {
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        } ]
    }"#;

    #[test]
    fn test_parse_embedded_triangle() {
        let data = parse(TRIANGLE_GLTF.as_bytes(), Path::new("tri.gltf")).unwrap();
        let ModelData::Scene(asset) = data else {
            panic!("expected a scene");
        };
        assert_eq!(asset.scene.name, "Main");
        assert_eq!(asset.scenes.len(), 1);

        let node = &asset.scene.children[0];
        assert_eq!(node.name, "Tri");
        assert_eq!(node.transform.position, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(node.mesh.as_ref().unwrap().triangle_count(), 1);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            parse(b"{ not gltf", Path::new("broken.gltf")),
            Err(ParseError::Gltf(_))
        ));
    }
}
