//! # Primitive Shape Generation
//!
//! All shapes are generated with outward normals and counter-clockwise winding.

use super::GeometryData;
use std::f32::consts::PI;

/// Generate a unit cube centered at the origin
///
/// Returns a cube with vertices from -0.5 to 0.5 on all axes.
pub fn generate_cube() -> GeometryData {
    generate_box([0.5, 0.5, 0.5])
}

/// Generate an axis-aligned box centered at the origin
///
/// Each face gets its own four vertices so normals stay flat.
pub fn generate_box(half_extents: [f32; 3]) -> GeometryData {
    let [hx, hy, hz] = half_extents;
    let mut data = GeometryData::new();

    // (normal, four corners counter-clockwise seen from outside)
    #[rustfmt::skip]
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0],  [[-hx, -hy,  hz], [ hx, -hy,  hz], [ hx,  hy,  hz], [-hx,  hy,  hz]]),
        ([0.0, 0.0, -1.0], [[-hx, -hy, -hz], [-hx,  hy, -hz], [ hx,  hy, -hz], [ hx, -hy, -hz]]),
        ([-1.0, 0.0, 0.0], [[-hx, -hy, -hz], [-hx, -hy,  hz], [-hx,  hy,  hz], [-hx,  hy, -hz]]),
        ([1.0, 0.0, 0.0],  [[ hx, -hy,  hz], [ hx, -hy, -hz], [ hx,  hy, -hz], [ hx,  hy,  hz]]),
        ([0.0, 1.0, 0.0],  [[-hx,  hy,  hz], [ hx,  hy,  hz], [ hx,  hy, -hz], [-hx,  hy, -hz]]),
        ([0.0, -1.0, 0.0], [[-hx, -hy, -hz], [ hx, -hy, -hz], [ hx, -hy,  hz], [-hx, -hy,  hz]]),
    ];

    for (normal, corners) in faces {
        let base = data.vertices.len() as u32;
        for corner in corners {
            data.vertices.push(corner);
            data.normals.push(normal);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

/// Generate a UV sphere with specified resolution
///
/// # Arguments
/// * `longitude_segments` - Number of vertical segments (longitude lines)
/// * `latitude_segments` - Number of horizontal segments (latitude lines)
///
/// Returns a sphere of radius 1.0 centered at the origin.
pub fn generate_sphere(longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let point = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            data.vertices.push(point);
            // Normal is same as position for unit sphere
            data.normals.push(point);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.indices
                .extend_from_slice(&[first, first + 1, second, second, first + 1, second + 1]);
        }
    }

    data
}
