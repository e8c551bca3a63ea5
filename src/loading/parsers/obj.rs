use std::io::{BufReader, Cursor};
use std::path::Path;

use log::warn;

use crate::gfx::scene::{Mesh, ModelNode, DEFAULT_NODE_COLOR};
use crate::loading::error::ParseError;
use crate::loading::model::ModelData;

/// Parse Wavefront OBJ into a node group, one child per object
///
/// Material libraries are resolved next to `source`; a missing library only
/// costs the diffuse colors.
pub fn parse(bytes: &[u8], source: &Path) -> Result<ModelData, ParseError> {
    let base = source.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut reader = BufReader::new(Cursor::new(bytes));

    let (models, materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |mtl_path| tobj::load_mtl(base.join(mtl_path)),
    )?;

    let materials = materials.unwrap_or_else(|err| {
        warn!("No usable MTL for {}: {err}", source.display());
        Vec::new()
    });

    let group_name = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("OBJ")
        .to_string();
    let mut group = ModelNode::new(group_name);

    for (index, model) in models.into_iter().enumerate() {
        let mesh = model.mesh;
        if mesh.indices.is_empty() {
            continue;
        }

        let color = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .map(|mtl| {
                let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
                [diffuse[0], diffuse[1], diffuse[2], mtl.dissolve.unwrap_or(1.0)]
            })
            .unwrap_or(DEFAULT_NODE_COLOR);

        let name = if model.name.is_empty() {
            format!("object_{index}")
        } else {
            model.name
        };
        let mut child = ModelNode::with_mesh(
            name,
            Mesh::new(mesh.positions, mesh.normals, mesh.indices),
        );
        child.color = color;
        group.children.push(child);
    }

    if group.children.is_empty() {
        return Err(ParseError::Empty("OBJ"));
    }
    Ok(ModelData::Group(group))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    #[test]
    fn test_parse_triangulates_into_group() {
        let data = parse(QUAD.as_bytes(), Path::new("models/quad.obj")).unwrap();
        let ModelData::Group(group) = data else {
            panic!("expected a group");
        };
        assert_eq!(group.name, "quad");
        assert_eq!(group.children.len(), 1);
        let mesh = group.children[0].mesh.as_ref().unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(group.children[0].color, DEFAULT_NODE_COLOR);
    }

    #[test]
    fn test_empty_obj_is_an_error() {
        assert!(matches!(
            parse(b"# nothing here\n", Path::new("empty.obj")),
            Err(ParseError::Empty("OBJ"))
        ));
    }
}
