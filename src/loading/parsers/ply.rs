//! PLY parser for ASCII and binary (little/big endian) files
use std::path::Path;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{line_ending, multispace0, not_line_ending, space0, space1, u64 as decimal},
    combinator::{map, value},
    number::complete as number,
    number::Endianness,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::gfx::scene::Mesh;
use crate::loading::error::ParseError;
use crate::loading::model::{Geometry, ModelData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Binary(Endianness),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq)]
enum Property {
    Scalar { name: String, ty: ScalarType },
    List { name: String, count: ScalarType, item: ScalarType },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
}

#[derive(Clone)]
enum HeaderLine {
    Skip,
    Element(String, usize),
    Property(Property),
    End,
}

/// Parse a PLY file into raw geometry; polygons are fan-triangulated
pub fn parse(bytes: &[u8], source: &Path) -> Result<ModelData, ParseError> {
    let (body, header) =
        header(bytes).map_err(|err| ParseError::malformed("PLY", format!("bad header: {err:?}")))?;
    let mesh = read_body(body, &header)?;
    if mesh.is_empty() {
        return Err(ParseError::Empty("PLY"));
    }

    let name = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("PLY")
        .to_string();
    Ok(ModelData::Geometry(Geometry {
        name,
        mesh,
        selectable: false,
    }))
}

fn header(input: &[u8]) -> IResult<&[u8], Header> {
    let (input, _) = terminated(tag("ply"), line_ending)(input)?;
    let (mut input, encoding) = format_line(input)?;

    let mut elements: Vec<Element> = Vec::new();
    loop {
        let (rest, line) = header_line(input)?;
        input = rest;
        match line {
            HeaderLine::Skip => {}
            HeaderLine::Element(name, count) => elements.push(Element {
                name,
                count,
                properties: Vec::new(),
            }),
            HeaderLine::Property(property) => {
                // Properties before any element are ignored
                if let Some(element) = elements.last_mut() {
                    element.properties.push(property);
                }
            }
            HeaderLine::End => break,
        }
    }

    Ok((input, Header { encoding, elements }))
}

fn format_line(input: &[u8]) -> IResult<&[u8], Encoding> {
    let (input, _) = tuple((tag("format"), space1))(input)?;
    let (input, encoding) = alt((
        value(Encoding::Ascii, tag("ascii")),
        value(
            Encoding::Binary(Endianness::Little),
            tag("binary_little_endian"),
        ),
        value(Encoding::Binary(Endianness::Big), tag("binary_big_endian")),
    ))(input)?;
    let (input, _) = terminated(not_line_ending, line_ending)(input)?;
    Ok((input, encoding))
}

fn word(input: &[u8]) -> IResult<&[u8], String> {
    map(take_till1(|c: u8| c.is_ascii_whitespace()), |bytes: &[u8]| {
        String::from_utf8_lossy(bytes).into_owned()
    })(input)
}

fn scalar_type(input: &[u8]) -> IResult<&[u8], ScalarType> {
    alt((
        value(ScalarType::I8, alt((tag("int8"), tag("char")))),
        value(ScalarType::U8, alt((tag("uint8"), tag("uchar")))),
        value(ScalarType::I16, alt((tag("int16"), tag("short")))),
        value(ScalarType::U16, alt((tag("uint16"), tag("ushort")))),
        value(ScalarType::I32, alt((tag("int32"), tag("int")))),
        value(ScalarType::U32, alt((tag("uint32"), tag("uint")))),
        value(ScalarType::F32, alt((tag("float32"), tag("float")))),
        value(ScalarType::F64, alt((tag("float64"), tag("double")))),
    ))(input)
}

fn header_line(input: &[u8]) -> IResult<&[u8], HeaderLine> {
    terminated(
        alt((
            value(HeaderLine::End, tag("end_header")),
            value(
                HeaderLine::Skip,
                tuple((alt((tag("comment"), tag("obj_info"))), not_line_ending)),
            ),
            map(
                tuple((tag("element"), space1, word, space1, decimal)),
                |(_, _, name, _, count)| HeaderLine::Element(name, count as usize),
            ),
            map(
                tuple((
                    tag("property"),
                    space1,
                    tag("list"),
                    space1,
                    scalar_type,
                    space1,
                    scalar_type,
                    space1,
                    word,
                )),
                |(_, _, _, _, count, _, item, _, name)| {
                    HeaderLine::Property(Property::List { name, count, item })
                },
            ),
            map(
                tuple((tag("property"), space1, scalar_type, space1, word)),
                |(_, _, ty, _, name)| HeaderLine::Property(Property::Scalar { name, ty }),
            ),
        )),
        tuple((space0, line_ending)),
    )(input)
}

fn scalar(input: &[u8], ty: ScalarType, encoding: Encoding) -> IResult<&[u8], f64> {
    match encoding {
        Encoding::Ascii => preceded(multispace0, number::double)(input),
        Encoding::Binary(endian) => match ty {
            ScalarType::I8 => map(number::i8, f64::from)(input),
            ScalarType::U8 => map(number::u8, f64::from)(input),
            ScalarType::I16 => map(number::i16(endian), f64::from)(input),
            ScalarType::U16 => map(number::u16(endian), f64::from)(input),
            ScalarType::I32 => map(number::i32(endian), f64::from)(input),
            ScalarType::U32 => map(number::u32(endian), f64::from)(input),
            ScalarType::F32 => map(number::f32(endian), f64::from)(input),
            ScalarType::F64 => number::f64(endian)(input),
        },
    }
}

fn read_body(mut input: &[u8], header: &Header) -> Result<Mesh, ParseError> {
    let truncated = |element: &str| ParseError::malformed("PLY", format!("truncated {element} data"));

    let mut positions: Vec<f32> = Vec::new();
    let mut normals: Vec<f32> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for element in &header.elements {
        let column = |name: &str| element.properties.iter().position(|p| p.name() == name);
        let xyz = [column("x"), column("y"), column("z")];
        let nxyz = [column("nx"), column("ny"), column("nz")];
        let has_normals = nxyz.iter().all(Option::is_some);

        for _ in 0..element.count {
            let mut row: Vec<f64> = Vec::with_capacity(element.properties.len());
            let mut polygon: Vec<u32> = Vec::new();

            for property in &element.properties {
                match property {
                    Property::Scalar { ty, .. } => {
                        let (rest, v) = scalar(input, *ty, header.encoding)
                            .map_err(|_| truncated(&element.name))?;
                        input = rest;
                        row.push(v);
                    }
                    Property::List { name, count, item } => {
                        let (rest, n) = scalar(input, *count, header.encoding)
                            .map_err(|_| truncated(&element.name))?;
                        input = rest;
                        let is_face_list = name == "vertex_indices" || name == "vertex_index";
                        for _ in 0..(n.max(0.0) as usize) {
                            let (rest, v) = scalar(input, *item, header.encoding)
                                .map_err(|_| truncated(&element.name))?;
                            input = rest;
                            if is_face_list {
                                polygon.push(v.max(0.0) as u32);
                            }
                        }
                        // Lists take a placeholder slot so columns stay aligned
                        row.push(0.0);
                    }
                }
            }

            if element.name == "vertex" {
                for axis in xyz {
                    positions.push(axis.map(|i| row[i] as f32).unwrap_or(0.0));
                }
                if has_normals {
                    for axis in nxyz.iter().flatten() {
                        normals.push(row[*axis] as f32);
                    }
                }
            } else if element.name == "face" {
                for i in 1..polygon.len().saturating_sub(1) {
                    indices.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
        }
    }

    Ok(Mesh::new(positions, normals, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_QUAD: &str = "ply
format ascii 1.0
comment a unit quad
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
";

    fn binary_triangle() -> Vec<u8> {
        let mut data = b"ply\nformat binary_little_endian 1.0\nelement vertex 3\n\
property float x\nproperty float y\nproperty float z\n\
property float nx\nproperty float ny\nproperty float nz\n\
element face 1\nproperty list uchar uint vertex_indices\nend_header\n"
            .to_vec();
        let vertices = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        for v in vertices {
            for c in v.into_iter().chain([0.0, 0.0, 1.0]) {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        data.push(3);
        for i in 0u32..3 {
            data.extend_from_slice(&i.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_header() {
        let (_, header) = header(ASCII_QUAD.as_bytes()).unwrap();
        assert_eq!(header.encoding, Encoding::Ascii);
        assert_eq!(header.elements.len(), 2);
        assert_eq!(header.elements[0].count, 4);
        assert_eq!(
            header.elements[1].properties[0],
            Property::List {
                name: "vertex_indices".to_string(),
                count: ScalarType::U8,
                item: ScalarType::I32,
            }
        );
    }

    #[test]
    fn test_ascii_quad_is_fan_triangulated() {
        let data = parse(ASCII_QUAD.as_bytes(), Path::new("quad.ply")).unwrap();
        let ModelData::Geometry(geometry) = data else {
            panic!("expected geometry");
        };
        assert_eq!(geometry.mesh.triangle_count(), 2);
        assert_eq!(geometry.mesh.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_binary_little_endian_with_normals() {
        let data = parse(&binary_triangle(), Path::new("tri.ply")).unwrap();
        let ModelData::Geometry(geometry) = data else {
            panic!("expected geometry");
        };
        assert_eq!(geometry.mesh.triangle_count(), 1);
        assert_eq!(geometry.mesh.vertices()[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(geometry.mesh.vertices()[1].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_truncated_body_is_an_error() {
        let mut data = binary_triangle();
        data.truncate(data.len() - 3);
        assert!(matches!(
            parse(&data, Path::new("tri.ply")),
            Err(ParseError::Malformed { format: "PLY", .. })
        ));
    }

    #[test]
    fn test_missing_magic_is_an_error() {
        assert!(parse(b"solid not a ply", Path::new("x.ply")).is_err());
    }
}
