//! Mesh construction utilities.
//!
//! Builds half-edge meshes from face-vertex lists. Half-edges are allocated
//! in twin pairs as edges are discovered, so every edge owns two consecutive
//! half-edge slots and boundary edges get a face-less twin.

use std::collections::HashMap;

use nalgebra::DVector;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from vertex positions and counter-clockwise
/// triangles.
///
/// The domain dimension is taken from the first vertex; every vertex must
/// have the same number of coordinates.
///
/// # Example
/// ```
/// use vgmesh::mesh::{build_from_triangles, HalfEdgeMesh};
///
/// let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
/// let faces = [[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// assert_eq!(mesh.dims(), 2);
/// ```
pub fn build_from_triangles<I: MeshIndex, P: AsRef<[f64]>>(
    vertices: &[P],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let dims = vertices[0].as_ref().len();
    if dims == 0 {
        return Err(MeshError::invalid_param("dims", 0, "positions need at least one coordinate"));
    }

    let mut mesh = HalfEdgeMesh::with_capacity(dims, vertices.len(), faces.len());

    for p in vertices {
        let p = p.as_ref();
        if p.len() != dims {
            return Err(MeshError::DimensionMismatch {
                what: "vertex position",
                expected: dims,
                actual: p.len(),
            });
        }
        mesh.add_vertex(DVector::from_column_slice(p));
    }

    // Directed edge (v0, v1) -> half-edge, filled for both directions as soon
    // as an edge is first seen
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::new();

    for face in faces {
        let face_id = FaceId::<I>::new(mesh.num_faces());
        let mut hes = [HalfEdgeId::<I>::invalid(); 3];

        for i in 0..3 {
            let (v0, v1) = (face[i], face[(i + 1) % 3]);
            let he = match edge_map.get(&(v0, v1)) {
                Some(&he) => he,
                None => {
                    let (he, twin) = add_edge(&mut mesh, VertexId::new(v0), VertexId::new(v1));
                    edge_map.insert((v0, v1), he);
                    edge_map.insert((v1, v0), twin);
                    he
                }
            };
            if !mesh.is_boundary_halfedge(he) {
                return Err(MeshError::NonManifoldEdge { v0, v1 });
            }
            hes[i] = he;
        }

        mesh.faces.push(Face::new(hes[0]));
        for i in 0..3 {
            let he = mesh.halfedge_mut(hes[i]);
            he.next = hes[(i + 1) % 3];
            he.prev = hes[(i + 2) % 3];
            he.face = face_id;
            let origin = he.origin;
            mesh.vertex_mut(origin).halfedge = hes[i];
        }
    }

    link_boundary_loops(&mut mesh)?;

    Ok(mesh)
}

/// Allocate the two half-edges of a new edge.
fn add_edge<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    v0: VertexId<I>,
    v1: VertexId<I>,
) -> (HalfEdgeId<I>, HalfEdgeId<I>) {
    let he = HalfEdgeId::<I>::new(mesh.num_halfedges());
    let twin = HalfEdgeId::<I>::new(mesh.num_halfedges() + 1);

    mesh.halfedges.push(HalfEdge {
        origin: v0,
        twin,
        ..HalfEdge::new()
    });
    mesh.halfedges.push(HalfEdge {
        origin: v1,
        twin: he,
        ..HalfEdge::new()
    });

    (he, twin)
}

/// Link face-less half-edges into boundary loops and anchor boundary
/// vertices on their outgoing boundary half-edge.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::new();
    for &he in &boundary_hes {
        let origin = mesh.origin(he).index();
        if outgoing.insert(origin, he).is_some() {
            return Err(MeshError::NonManifoldVertex { vertex: origin });
        }
    }

    for &he in &boundary_hes {
        let dest = mesh.dest(he).index();
        // Every boundary vertex has exactly one outgoing boundary half-edge
        let next_he = outgoing[&dest];
        mesh.halfedge_mut(he).next = next_he;
        mesh.halfedge_mut(next_he).prev = he;

        let origin = mesh.origin(he);
        mesh.vertex_mut(origin).halfedge = he;
    }

    Ok(())
}

/// Convert a half-edge mesh back to a face-vertex representation.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Vec<f64>>, Vec<[usize; 3]>) {
    let vertices = mesh
        .vertex_ids()
        .map(|v| mesh.position(v).iter().copied().collect())
        .collect();

    let faces = mesh
        .face_ids()
        .map(|f| {
            let [v0, v1, v2] = mesh.face_triangle(f);
            [v0.index(), v1.index(), v2.index()]
        })
        .collect();

    (vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> (Vec<[f64; 2]>, Vec<[usize; 3]>) {
        let vertices = vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [0.5, -1.0]];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_single_triangle() {
        let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();

        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_faces(), 1);
        // 3 interior half-edges + 3 boundary half-edges
        assert_eq!(mesh.num_halfedges(), 6);
        assert_eq!(mesh.num_edges(), 3);
        assert!(mesh.is_valid());

        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
        }
    }

    #[test]
    fn test_two_triangles() {
        let (vertices, faces) = two_triangles();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
        // 6 interior half-edges + 4 boundary half-edges
        assert_eq!(mesh.num_halfedges(), 10);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_closed_tetrahedron() {
        let vertices = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.5, 1.0, 0.0],
            [0.5, 0.5, 1.0],
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        let mesh: HalfEdgeMesh<u16> = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.dims(), 3);
        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.is_valid());
        assert!(mesh.vertex_ids().all(|v| !mesh.is_boundary_vertex(v)));
    }

    #[test]
    fn test_roundtrip() {
        let (vertices, faces) = two_triangles();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        let (out_verts, out_faces) = to_face_vertex(&mesh);
        assert_eq!(out_faces, faces);
        for (v_in, v_out) in vertices.iter().zip(out_verts.iter()) {
            assert_eq!(&v_in[..], &v_out[..]);
        }
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = [[0.0, 0.0]];
        let result: Result<HalfEdgeMesh> = build_from_triangles(&vertices, &[[0, 1, 2]]);
        assert_eq!(
            result.unwrap_err(),
            MeshError::InvalidVertexIndex { face: 0, vertex: 1 }
        );
    }

    #[test]
    fn test_degenerate_face() {
        let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
        let result: Result<HalfEdgeMesh> = build_from_triangles(&vertices, &[[0, 0, 2]]);
        assert_eq!(result.unwrap_err(), MeshError::DegenerateFace { face: 0 });
    }

    #[test]
    fn test_non_manifold_edge() {
        // Second face repeats the directed edge 0 -> 1
        let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [0.5, -1.0]];
        let result: Result<HalfEdgeMesh> =
            build_from_triangles(&vertices, &[[0, 1, 2], [0, 1, 3]]);
        assert_eq!(result.unwrap_err(), MeshError::NonManifoldEdge { v0: 0, v1: 1 });
    }

    #[test]
    fn test_bow_tie_rejected() {
        let vertices = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [-1.0, 0.0], [-1.0, -1.0]];
        let result: Result<HalfEdgeMesh> =
            build_from_triangles(&vertices, &[[0, 1, 2], [0, 3, 4]]);
        assert_eq!(result.unwrap_err(), MeshError::NonManifoldVertex { vertex: 0 });
    }

    #[test]
    fn test_mixed_dimensions() {
        let vertices: Vec<Vec<f64>> = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.5]];
        let result: Result<HalfEdgeMesh> = build_from_triangles(&vertices, &[[0, 1, 2]]);
        assert!(matches!(
            result.unwrap_err(),
            MeshError::DimensionMismatch { expected: 2, actual: 1, .. }
        ));
    }
}
