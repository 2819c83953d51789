//! Half-edge mesh data structure.
//!
//! This is the pure topology layer: vertices, half-edges and faces with full
//! connectivity. Values and constraints live on top of it in
//! [`VgMesh`](super::VgMesh).
//!
//! # Structure
//!
//! - Each edge is split into two **half-edges** pointing in opposite directions.
//!   Half-edges are stored in twin pairs, so edge `k` owns half-edges `2k` and
//!   `2k + 1`.
//! - Each half-edge knows its **twin**, **next** and **prev** around its face,
//!   its **origin vertex** and its **face**.
//! - Each vertex stores one outgoing half-edge. For boundary vertices this is
//!   the outgoing boundary half-edge.
//! - Vertex positions are dynamic vectors; their length is the domain
//!   dimension of the mesh.
//!
//! # Boundary Handling
//!
//! Boundary half-edges have an invalid face ID. They are linked into loops
//! through `next`/`prev`, so rotation around a boundary vertex never hits a
//! dead end.

use nalgebra::DVector;

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The position of this vertex.
    pub position: DVector<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices, this is guaranteed to be a boundary half-edge.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new vertex at the given position.
    pub fn new(position: DVector<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,

    /// The opposite half-edge (pointing in the reverse direction).
    pub twin: HalfEdgeId<I>,

    /// The next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId<I>,

    /// The previous half-edge around the face (clockwise).
    pub prev: HalfEdgeId<I>,

    /// The face this half-edge belongs to.
    /// Invalid for boundary half-edges.
    pub face: FaceId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
        }
    }

    /// Check if this half-edge is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given half-edge.
    pub fn new(halfedge: HalfEdgeId<I>) -> Self {
        Self { halfedge }
    }
}

/// The outgoing half-edges of a vertex that bound a face, in counter-clockwise
/// order.
///
/// Each half-edge `h` stands for the face corner between `h` and the next
/// outgoing half-edge. For an interior vertex the fan is `closed` and wraps
/// around; for a boundary vertex it starts right after the boundary gap and
/// ends right before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFan<I: MeshIndex = u32> {
    /// Outgoing half-edges with a valid face, counter-clockwise.
    pub halfedges: Vec<HalfEdgeId<I>>,
    /// Whether the fan wraps all the way around the vertex.
    pub closed: bool,
}

/// A half-edge mesh data structure for triangle meshes.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    /// Domain dimension of vertex positions.
    pub(crate) dims: usize,

    /// All vertices in the mesh.
    pub(crate) vertices: Vec<Vertex<I>>,

    /// All half-edges in the mesh, stored in twin pairs.
    pub(crate) halfedges: Vec<HalfEdge<I>>,

    /// All faces in the mesh.
    pub(crate) faces: Vec<Face<I>>,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh whose positions have `dims` coordinates.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(dims: usize, num_vertices: usize, num_faces: usize) -> Self {
        // Closed mesh: HE = 3F, boundary adds a little
        let num_halfedges = num_faces * 3 + num_faces / 2;

        Self {
            dims,
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
        }
    }

    // ==================== Accessors ====================

    /// Domain dimension of vertex positions.
    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &DVector<f64> {
        &self.vertex(v).position
    }

    /// Whether a vertex handle names a vertex of this mesh.
    #[inline]
    pub fn contains_vertex(&self, v: VertexId<I>) -> bool {
        v.is_valid() && v.index() < self.vertices.len()
    }

    /// Whether a half-edge handle names a half-edge of this mesh.
    #[inline]
    pub fn contains_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        he.is_valid() && he.index() < self.halfedges.len()
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin ("from") vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination ("to") vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Next outgoing half-edge around the origin, counter-clockwise.
    #[inline]
    pub fn ccw_rotated(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.twin(self.prev(he))
    }

    /// Next outgoing half-edge around the origin, clockwise.
    #[inline]
    pub fn cw_rotated(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.next(self.twin(he))
    }

    /// Check if a half-edge is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if a vertex is on the boundary. Isolated vertices count as boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        let he = self.vertex(v).halfedge;
        // The builder keeps a boundary half-edge as the vertex anchor
        !he.is_valid() || self.is_boundary_halfedge(he)
    }

    /// Check if an edge is on the boundary.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId<I>) -> bool {
        self.is_boundary_halfedge(e.halfedge(0)) || self.is_boundary_halfedge(e.halfedge(1))
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.num_edges()).map(EdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over outgoing half-edges around a vertex, counter-clockwise.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.dest(he))
    }

    /// Iterate over half-edges around a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceHalfEdgeIter<'_, I> {
        FaceHalfEdgeIter::new(self, f)
    }

    /// Get the three vertices of a triangular face.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    /// Compute the valence (degree) of a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    /// The corner fan around a vertex, or `None` for an isolated vertex.
    pub fn vertex_fan(&self, v: VertexId<I>) -> Option<VertexFan<I>> {
        let start = self.vertex(v).halfedge;
        if !start.is_valid() {
            return None;
        }

        let closed = !self.is_boundary_halfedge(start);
        let halfedges = self
            .vertex_halfedges(v)
            .filter(|&he| !self.is_boundary_halfedge(he))
            .collect();

        Some(VertexFan { halfedges, closed })
    }

    // ==================== Geometry ====================

    /// The angle of the face corner at the origin of `he`, between `he` and
    /// the incoming half-edge `prev(he)`. Zero for boundary half-edges and
    /// degenerate corners.
    pub fn corner_angle(&self, he: HalfEdgeId<I>) -> f64 {
        if self.is_boundary_halfedge(he) {
            return 0.0;
        }
        let p = self.position(self.origin(he));
        let a = self.position(self.dest(he)) - p;
        let b = self.position(self.origin(self.prev(he))) - p;

        let norm = a.norm() * b.norm();
        if norm <= f64::EPSILON {
            return 0.0;
        }
        (a.dot(&b) / norm).clamp(-1.0, 1.0).acos()
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    ///
    /// # Panics
    /// Panics if the position does not have `dims` coordinates.
    pub fn add_vertex(&mut self, position: DVector<f64>) -> VertexId<I> {
        assert_eq!(position.len(), self.dims, "vertex position has wrong dimension");
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    // ==================== Validation ====================

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        if self.halfedges.len() % 2 != 0 {
            return false;
        }

        for (i, v) in self.vertices.iter().enumerate() {
            if v.position.len() != self.dims {
                return false;
            }
            if v.halfedge.is_valid() && self.origin(v.halfedge).index() != i {
                return false;
            }
        }

        for heid in self.halfedge_ids() {
            let he = self.halfedge(heid);

            // Twins are stored in pairs
            if he.twin.index() != heid.index() ^ 1 || self.twin(he.twin) != heid {
                return false;
            }
            if !he.next.is_valid() || self.prev(he.next) != heid {
                return false;
            }
            if !he.prev.is_valid() || self.next(he.prev) != heid {
                return false;
            }
            if self.origin(he.next) != self.dest(heid) {
                return false;
            }
        }

        self.faces.iter().all(|f| f.halfedge.is_valid())
    }
}

/// Iterator over outgoing half-edges around a vertex, counter-clockwise.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // prev(he) comes into the origin inside the face left of he;
        // its twin leaves the origin on the far side of that face.
        self.current = self.mesh.ccw_rotated(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

/// Iterator over half-edges around a face.
pub struct FaceHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> FaceHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, f: FaceId<I>) -> Self {
        let start = mesh.face(f).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for FaceHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.mesh.next(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}
