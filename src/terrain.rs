use crate::model::Vertex;
use crate::world::{ConfigError, HeightField, validate_spacing};
use glam::Vec3;

/// Texture repeats once every `1 / TEXTURE_TILING` world units.
pub const TEXTURE_TILING: f32 = 0.1;

/// CPU-side terrain geometry, handed verbatim to the GPU upload step.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Bytes needed for the (vertex, index) buffers of a `size` x `size` grid.
pub fn buffer_sizes(size: u32) -> (u64, u64) {
    let side = size as u64 + 1;
    let quads = size as u64 * size as u64;
    (
        side * side * std::mem::size_of::<Vertex>() as u64,
        6 * quads * std::mem::size_of::<u32>() as u64,
    )
}

/// Rejects grids whose buffers would exceed the device's `max_buffer_size`.
pub fn ensure_fits_buffer_limit(size: u32, max_buffer_size: u64) -> Result<(), ConfigError> {
    let (vertex_bytes, index_bytes) = buffer_sizes(size);
    let bytes = vertex_bytes.max(index_bytes);
    if bytes > max_buffer_size {
        return Err(ConfigError::ExceedsBufferLimit { size, bytes, limit: max_buffer_size });
    }
    Ok(())
}

/// Samples `field` on a `size` x `size` quad grid centred on the origin.
///
/// Vertex `(i, j)` lives at index `j * (size + 1) + i`, with `i` running along X
/// and `j` along Z. Normals use central differences, falling back to one-sided
/// differences on the outer ring, so border normals are slightly flattened.
pub fn build_terrain_mesh(
    size: u32,
    spacing: f32,
    field: &HeightField,
) -> Result<TerrainMesh, ConfigError> {
    if size == 0 {
        return Err(ConfigError::InvalidGridSize(0));
    }
    validate_spacing(spacing)?;

    let n = size as usize;
    let side = n + 1;
    let half = size as f32 * 0.5;
    let world = |k: usize| (k as f32 - half) * spacing;

    let mut elevations = Vec::with_capacity(side * side);
    for j in 0..side {
        for i in 0..side {
            elevations.push(field.height(world(i), world(j)));
        }
    }
    let elevation = |i: usize, j: usize| elevations[j * side + i];

    let mut vertices = Vec::with_capacity(side * side);
    for j in 0..side {
        for i in 0..side {
            let (x, z) = (world(i), world(j));
            let y = elevation(i, j);

            let (i_lo, i_hi) = (i.saturating_sub(1), (i + 1).min(n));
            let (j_lo, j_hi) = (j.saturating_sub(1), (j + 1).min(n));

            let along_z = Vec3::new(
                0.0,
                elevation(i, j_hi) - elevation(i, j_lo),
                (j_hi - j_lo) as f32 * spacing,
            );
            let along_x = Vec3::new(
                (i_hi - i_lo) as f32 * spacing,
                elevation(i_hi, j) - elevation(i_lo, j),
                0.0,
            );
            let normal = along_z.cross(along_x).normalize();

            vertices.push(Vertex {
                position: [x, y, z],
                normal: normal.to_array(),
                tex_coords: [x * TEXTURE_TILING, z * TEXTURE_TILING],
            });
        }
    }

    let mut indices = Vec::with_capacity(6 * n * n);
    for j in 0..n {
        for i in 0..n {
            let top_left = (j * side + i) as u32;
            let top_right = top_left + 1;
            let bottom_left = top_left + side as u32;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }

    log::debug!(
        "built terrain mesh: {} vertices, {} indices",
        vertices.len(),
        indices.len()
    );

    Ok(TerrainMesh { vertices, indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::TerrainConfig;

    fn field(amplitude: f32) -> HeightField {
        HeightField::new(TerrainConfig::new(100, 1.0, amplitude).unwrap())
    }

    fn position(mesh: &TerrainMesh, index: u32) -> Vec3 {
        Vec3::from_array(mesh.vertices[index as usize].position)
    }

    #[test]
    fn two_by_two_grid_counts() {
        let mesh = build_terrain_mesh(2, 1.0, &field(1.5)).unwrap();
        assert_eq!(mesh.vertices.len(), 9);
        assert_eq!(mesh.indices.len(), 24);
    }

    #[test]
    fn buffer_sizes_match_built_mesh() {
        let mesh = build_terrain_mesh(7, 1.0, &field(1.5)).unwrap();
        let (vertex_bytes, index_bytes) = buffer_sizes(7);
        assert_eq!(vertex_bytes as usize, bytemuck::cast_slice::<Vertex, u8>(&mesh.vertices).len());
        assert_eq!(index_bytes as usize, bytemuck::cast_slice::<u32, u8>(&mesh.indices).len());
    }

    #[test]
    fn oversized_grid_rejected_against_default_device_limit() {
        let limit = wgpu::Limits::default().max_buffer_size;
        assert_eq!(ensure_fits_buffer_limit(100, limit), Ok(()));
        assert_eq!(ensure_fits_buffer_limit(2895, limit), Ok(()));
        assert!(matches!(
            ensure_fits_buffer_limit(2896, limit),
            Err(ConfigError::ExceedsBufferLimit { size: 2896, .. })
        ));
        assert_eq!(
            ensure_fits_buffer_limit(3000, limit),
            Err(ConfigError::ExceedsBufferLimit { size: 3000, bytes: 288_192_032, limit })
        );
    }

    #[test]
    fn rejects_invalid_dimensions() {
        assert_eq!(
            build_terrain_mesh(0, 1.0, &field(1.5)).unwrap_err(),
            ConfigError::InvalidGridSize(0)
        );
        assert_eq!(
            build_terrain_mesh(4, -1.0, &field(1.5)).unwrap_err(),
            ConfigError::InvalidSpacing(-1.0)
        );
    }

    #[test]
    fn grid_is_centred_and_sampled_from_field() {
        let hf = field(1.5);
        let mesh = build_terrain_mesh(4, 2.5, &hf).unwrap();

        assert_eq!(mesh.vertices[0].position[0], -5.0);
        assert_eq!(mesh.vertices[0].position[2], -5.0);
        let last = mesh.vertices.last().unwrap();
        assert_eq!(last.position[0], 5.0);
        assert_eq!(last.position[2], 5.0);

        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert_eq!(y, hf.height(x, z));
            assert_eq!(v.tex_coords, [x * TEXTURE_TILING, z * TEXTURE_TILING]);
        }
    }

    #[test]
    fn normals_are_unit_length() {
        let mesh = build_terrain_mesh(64, 0.75, &field(3.0)).unwrap();
        for v in &mesh.vertices {
            let len = Vec3::from_array(v.normal).length();
            assert!((len - 1.0).abs() < 1e-5, "normal length {len}");
            assert!(v.normal[1] > 0.0);
        }
    }

    #[test]
    fn indices_in_range_and_winding_faces_up() {
        let n = 16;
        let mesh = build_terrain_mesh(n, 1.0, &field(1.5)).unwrap();
        let vertex_count = ((n + 1) * (n + 1)) as u32;
        assert_eq!(mesh.indices.len(), (6 * n * n) as usize);
        assert!(mesh.indices.iter().all(|&idx| idx < vertex_count));

        for tri in mesh.indices.chunks_exact(3) {
            let (a, b, c) = (position(&mesh, tri[0]), position(&mesh, tri[1]), position(&mesh, tri[2]));
            let face = (b - a).cross(c - a);
            assert!(face.y > 0.0, "triangle {tri:?} faces down");
        }
    }

    #[test]
    fn flat_interior_normal_points_up() {
        // Mid-grid on a gentle field the central difference is close to +Y.
        let mesh = build_terrain_mesh(2, 0.01, &field(0.001)).unwrap();
        let centre = Vec3::from_array(mesh.vertices[4].normal);
        assert!(centre.dot(Vec3::Y) > 0.999);
    }

    #[test]
    fn border_normals_use_one_sided_differences() {
        let hf = field(1.5);
        let n = 8u32;
        let s = 1.0;
        let mesh = build_terrain_mesh(n, s, &hf).unwrap();

        // Vertex (0, 3): clamped on X, central on Z.
        let side = (n + 1) as usize;
        let (i, j) = (0usize, 3usize);
        let world = |k: usize| (k as f32 - n as f32 * 0.5) * s;
        let h = |i: usize, j: usize| hf.height(world(i), world(j));
        let along_z = Vec3::new(0.0, h(i, j + 1) - h(i, j - 1), 2.0 * s);
        let along_x = Vec3::new(s, h(i + 1, j) - h(i, j), 0.0);
        let expected = along_z.cross(along_x).normalize();

        let actual = Vec3::from_array(mesh.vertices[j * side + i].normal);
        assert!((actual - expected).length() < 1e-6);
    }

    #[test]
    fn mesh_is_deterministic() {
        let a = build_terrain_mesh(10, 1.0, &field(1.5)).unwrap();
        let b = build_terrain_mesh(10, 1.0, &field(1.5)).unwrap();
        assert_eq!(a.indices, b.indices);
        assert_eq!(
            bytemuck::cast_slice::<Vertex, u8>(&a.vertices),
            bytemuck::cast_slice::<Vertex, u8>(&b.vertices)
        );
    }
}
