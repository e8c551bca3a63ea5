//! STL parser for binary and ASCII files
use std::path::Path;

use cgmath::{InnerSpace, Vector3};
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::gfx::scene::Mesh;
use crate::loading::error::ParseError;
use crate::loading::model::{Geometry, ModelData};

type Facet = ([f32; 3], [[f32; 3]; 3]);

/// Parse an STL file into raw geometry
pub fn parse(bytes: &[u8], source: &Path) -> Result<ModelData, ParseError> {
    let facets = parse_facets(bytes)?;
    if facets.is_empty() {
        return Err(ParseError::Empty("STL"));
    }

    let name = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("STL")
        .to_string();
    Ok(ModelData::Geometry(Geometry {
        name,
        mesh: facets_to_mesh(&facets),
        selectable: false,
    }))
}

/// Detect the flavour and parse every facet
pub fn parse_facets(bytes: &[u8]) -> Result<Vec<Facet>, ParseError> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    if bytes.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(bytes) {
            if let Ok((_, facets)) = ascii_stl(text) {
                return Ok(facets);
            }
        }
    }
    binary_stl(bytes)
        .map(|(_, facets)| facets)
        .map_err(|err| ParseError::malformed("STL", format!("{err:?}")))
}

fn binary_stl(input: &[u8]) -> IResult<&[u8], Vec<Facet>> {
    let (input, _header) = take(80usize)(input)?;
    let (input, triangle_count) = le_u32(input)?;
    count(binary_facet, triangle_count as usize)(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    let (input, normal) = binary_vector(input)?;
    let (input, a) = binary_vector(input)?;
    let (input, b) = binary_vector(input)?;
    let (input, c) = binary_vector(input)?;
    // Attribute byte count
    let (input, _) = take(2usize)(input)?;
    Ok((input, (normal, [a, b, c])))
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, [x, y, z]))
}

fn ascii_stl(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional name up to the end of the line
    let (input, _) = not_line_ending(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, facets))
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, (normal, [a, b, c])))
}

fn ascii_vertex(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    ascii_vector(input)
}

fn ascii_vector(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, x) = preceded(multispace1, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, [x, y, z]))
}

/// Flat-shaded mesh with three vertices per facet
///
/// Zero normals, which many exporters write, are recomputed from the winding.
fn facets_to_mesh(facets: &[Facet]) -> Mesh {
    let mut positions = Vec::with_capacity(facets.len() * 9);
    let mut normals = Vec::with_capacity(facets.len() * 9);

    for (normal, corners) in facets {
        let mut n = Vector3::from(*normal);
        if n.magnitude2() < 1e-12 {
            let [a, b, c] = (*corners).map(Vector3::from);
            n = (b - a).cross(c - a);
        }
        let n = if n.magnitude2() > 0.0 {
            n.normalize()
        } else {
            Vector3::unit_z()
        };

        for corner in corners {
            positions.extend_from_slice(corner);
            normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
    }

    let indices = (0..(positions.len() / 3) as u32).collect();
    Mesh::new(positions, normals, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII: &str = "solid part exported by hand
  facet normal 0 0 0
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1 0 0
    endloop
  endfacet
endsolid part
";

    fn binary(triangles: u32, header: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; 80];
        data[..header.len()].copy_from_slice(header);
        data.extend_from_slice(&triangles.to_le_bytes());
        for _ in 0..triangles {
            for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn test_ascii_with_solid_name() {
        let facets = parse_facets(ASCII.as_bytes()).unwrap();
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[1].0, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_zero_normals_are_recomputed() {
        let facets = parse_facets(ASCII.as_bytes()).unwrap();
        let mesh = facets_to_mesh(&facets);
        assert_eq!(mesh.vertices()[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let data = binary(2, b"solid but actually binary");
        let facets = parse_facets(&data).unwrap();
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].1[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_truncated_binary_is_an_error() {
        let mut data = binary(3, b"");
        data.truncate(data.len() - 10);
        assert!(matches!(
            parse_facets(&data),
            Err(ParseError::Malformed { format: "STL", .. })
        ));
    }

    #[test]
    fn test_parse_names_geometry_after_file() {
        let data = parse(&binary(1, b""), Path::new("parts/bracket.stl")).unwrap();
        let ModelData::Geometry(geometry) = data else {
            panic!("expected geometry");
        };
        assert_eq!(geometry.name, "bracket");
        assert!(!geometry.selectable);
    }
}
