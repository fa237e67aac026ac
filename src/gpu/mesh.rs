use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, normal, color }
    }

    /// Unlit vertex for line and point geometry.
    pub const fn unlit(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, normal: [0.0, 0.0, 0.0], color }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12, // [f32; 3] is 12 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// UV sphere positions and indices, centered at origin.
///
/// Returns (positions, indices); positions are on the sphere of the given radius.
pub fn sphere_positions(radius: f32, lat_segments: u32, lon_segments: u32) -> (Vec<[f32; 3]>, Vec<u32>) {
    let lat_segments = lat_segments.max(2);
    let lon_segments = lon_segments.max(3);

    let mut positions = Vec::with_capacity(((lat_segments + 1) * (lon_segments + 1)) as usize);
    let mut indices = Vec::with_capacity((lat_segments * lon_segments * 6) as usize);

    for lat in 0..=lat_segments {
        let theta = std::f32::consts::PI * (lat as f32) / (lat_segments as f32);
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for lon in 0..=lon_segments {
            let phi = 2.0 * std::f32::consts::PI * (lon as f32) / (lon_segments as f32);
            let x = phi.cos() * sin_theta;
            let y = cos_theta;
            let z = phi.sin() * sin_theta;
            positions.push([x * radius, y * radius, z * radius]);
        }
    }

    for lat in 0..lat_segments {
        for lon in 0..lon_segments {
            let first = lat * (lon_segments + 1) + lon;
            let second = first + lon_segments + 1;

            // Two triangles per quad, counter-clockwise seen from outside
            indices.push(first);
            indices.push(first + 1);
            indices.push(second);

            indices.push(second);
            indices.push(first + 1);
            indices.push(second + 1);
        }
    }

    (positions, indices)
}

/// CPU-side indexed triangle mesh, shared between scene entities.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Largest vertex distance from the local origin, used for picking.
    pub bounding_radius: f32,
}

impl MeshData {
    /// Plain colored sphere (used for the sun).
    pub fn sphere(radius: f32, segments: u32, color: [f32; 3]) -> Self {
        let (positions, indices) = sphere_positions(radius, segments, segments * 2);
        let vertices = positions
            .iter()
            .map(|p| {
                let n = glam::Vec3::from_array(*p).normalize_or_zero();
                Vertex::new(*p, n.to_array(), color)
            })
            .collect();
        Self {
            vertices,
            indices,
            bounding_radius: radius,
        }
    }
}

/// Ring in the XZ plane as a closed line list.
pub fn create_ring_geometry(radius: f32, segments: u32, color: [f32; 3]) -> Vec<Vertex> {
    let segments = segments.max(3);
    let point = |i: u32| {
        let a = std::f32::consts::TAU * (i % segments) as f32 / segments as f32;
        Vertex::unlit([a.cos() * radius, 0.0, a.sin() * radius], color)
    };
    (0..segments).flat_map(|i| [point(i), point(i + 1)]).collect()
}

/// Area-weighted vertex normals from triangle faces.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![glam::Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let p0 = glam::Vec3::from_array(positions[i0]);
        let p1 = glam::Vec3::from_array(positions[i1]);
        let p2 = glam::Vec3::from_array(positions[i2]);

        // Magnitude is twice the triangle area
        let face_normal = (p1 - p0).cross(p2 - p0);
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    normals
        .into_iter()
        .zip(positions)
        .map(|(n, p)| {
            if n.length_squared() > 1e-12 {
                n.normalize().to_array()
            } else {
                // Pole vertices of a UV sphere only touch degenerate faces
                let radial = glam::Vec3::from_array(*p);
                if radial.length_squared() > 1e-12 {
                    radial.normalize().to_array()
                } else {
                    [0.0, 1.0, 0.0]
                }
            }
        })
        .collect()
}
