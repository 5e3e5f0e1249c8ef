//! Built-in geometry: a unit cube and a unit quad.

use cgmath::{Vector2, Vector3};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side mesh, before upload.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u16>,
}

/// Each face as (outward normal, right, up) seen from outside. `right × up`
/// points into the cube, so the corners below wind clockwise on screen.
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
];

/// Corner offsets along (right, up): bottom-left, top-left, top-right, bottom-right.
const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)];
const FACE_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Unit cube centred on the origin with per-face normals and UVs.
pub fn cube() -> Mesh {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, right, up) in FACES {
        let base = vertices.len() as u16;
        vertices.extend(face_vertices(normal, right, up, 0.5));
        indices.extend(FACE_INDICES.iter().map(|i| base + i));
    }
    compute_tangents(&mut vertices, &indices);
    Mesh { vertices, indices }
}

/// Unit quad in the XY plane facing -Z.
pub fn quad() -> Mesh {
    let (normal, right, up) = FACES[0];
    let mut vertices: Vec<ModelVertex> = face_vertices(normal, right, up, 0.5).collect();
    // flatten onto z = 0
    for v in &mut vertices {
        v.position[2] = 0.0;
    }
    let indices = FACE_INDICES.to_vec();
    compute_tangents(&mut vertices, &indices);
    Mesh { vertices, indices }
}

fn face_vertices(
    normal: [f32; 3],
    right: [f32; 3],
    up: [f32; 3],
    half: f32,
) -> impl Iterator<Item = ModelVertex> {
    let n = Vector3::from(normal);
    let r = Vector3::from(right);
    let u = Vector3::from(up);
    CORNERS.into_iter().map(move |(s, t)| ModelVertex {
        position: ((n + r * s + u * t) * half).into(),
        // texture v grows downwards
        tex_coords: [(s + 1.0) / 2.0, (1.0 - t) / 2.0],
        normal,
        // We'll calculate these later
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
    })
}

/// Fills in per-vertex tangents and bitangents from positions and UVs,
/// averaging over the triangles that share a vertex.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u16]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    // Calculate tangents and bitangets. We're going to
    // use the triangles, so we need to loop through the
    // indices in chunks of 3
    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: Vector3<f32> = v0.position.into();
        let pos1: Vector3<f32> = v1.position.into();
        let pos2: Vector3<f32> = v2.position.into();

        let uv0: Vector2<f32> = v0.tex_coords.into();
        let uv1: Vector2<f32> = v1.tex_coords.into();
        let uv2: Vector2<f32> = v2.tex_coords.into();

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;

        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving the following system of equations will
        // give us the tangent and bitangent.
        //     delta_pos1 = delta_uv1.x * T + delta_u.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det == 0.0 {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // We flip the bitangent to enable right-handed normal
        // maps with wgpu texture coordinate system
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            let v = &mut vertices[i];
            v.tangent = (tangent + Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + Vector3::from(v.bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    // Average the tangents/bitangents
    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        v.tangent = (Vector3::from(v.tangent) * denom).into();
        v.bitangent = (Vector3::from(v.bitangent) * denom).into();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn cube_has_four_vertices_and_two_triangles_per_face() {
        let mesh = cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for v in &mesh.vertices {
            for c in v.position {
                assert_eq!(c.abs(), 0.5);
            }
        }
    }

    #[test]
    fn cube_triangles_wind_consistently_around_their_normal() {
        let mesh = cube();
        for tri in mesh.indices.chunks_exact(3) {
            let p: Vec<Vector3<f32>> = tri
                .iter()
                .map(|&i| Vector3::from(mesh.vertices[i as usize].position))
                .collect();
            let winding = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            let normal = Vector3::from(mesh.vertices[tri[0] as usize].normal);
            assert_relative_eq!(winding.dot(normal), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn tangent_frames_are_orthonormal() {
        let mesh = cube();
        for v in &mesh.vertices {
            let t = Vector3::from(v.tangent);
            let b = Vector3::from(v.bitangent);
            let n = Vector3::from(v.normal);
            assert_relative_eq!(t.magnitude(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(b.magnitude(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(t.dot(n), 0.0, epsilon = 1e-5);
            assert_relative_eq!(b.dot(n), 0.0, epsilon = 1e-5);
            assert_relative_eq!(t.dot(b), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn quad_is_flat_and_faces_negative_z() {
        let mesh = quad();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, [0, 1, 2, 0, 2, 3]);
        for v in &mesh.vertices {
            assert_eq!(v.position[2], 0.0);
            assert_eq!(v.normal, [0.0, 0.0, -1.0]);
        }
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = ModelVertex::desc();
        assert_eq!(layout.array_stride, 56);
        assert_eq!(layout.attributes.len(), 5);
        assert_eq!(layout.attributes[4].offset, 44);
    }
}
