//! Attachment kinds and the per-half-edge attachment table.
//!
//! Nodes are attached to half-edges, not to vertices or edges. A triangle
//! corner at vertex `v` inside face `f` is bounded by two half-edges of `f`:
//! the outgoing one carries a [`AttributeKind::FromVertexValue`] slot and the
//! incoming one a [`AttributeKind::ToVertexValue`] slot. Two adjacent corners
//! can therefore reference different nodes, which is how a singularity is
//! expressed.

use std::fmt;

use bitflags::bitflags;

use super::index::{HalfEdgeId, MeshIndex, NodeId};
use crate::error::{MeshError, Result};

/// The kind of an attachment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Value at the destination vertex of the half-edge, inside its face.
    ToVertexValue,
    /// Value at the origin vertex of the half-edge, inside its face.
    FromVertexValue,
    /// Value at the midpoint of the edge, on the side of the half-edge.
    EdgeValue,
    /// Normal derivative at the midpoint of the edge.
    EdgeGradient,
}

impl AttributeKind {
    /// All kinds, in slot order.
    pub const ALL: [AttributeKind; 4] = [
        AttributeKind::ToVertexValue,
        AttributeKind::FromVertexValue,
        AttributeKind::EdgeValue,
        AttributeKind::EdgeGradient,
    ];

    /// The two kinds stored on edges rather than at corners.
    pub const EDGE_KINDS: [AttributeKind; 2] =
        [AttributeKind::EdgeValue, AttributeKind::EdgeGradient];

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }

    /// The single-kind attribute mask.
    #[inline]
    pub fn mask(self) -> Attributes {
        Attributes::from_bits_retain(1 << self.slot())
    }

    /// The kind of the slot facing this one across the edge.
    ///
    /// Corner values swap direction when seen from the twin half-edge; edge
    /// kinds face themselves.
    #[inline]
    pub fn opposite(self) -> AttributeKind {
        match self {
            AttributeKind::ToVertexValue => AttributeKind::FromVertexValue,
            AttributeKind::FromVertexValue => AttributeKind::ToVertexValue,
            kind => kind,
        }
    }
}

bitflags! {
    /// Bitmask of enabled attachment kinds.
    #[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        /// Per-corner value at the destination vertex.
        const TO_VERTEX_VALUE = 1 << 0;
        /// Per-corner value at the origin vertex.
        const FROM_VERTEX_VALUE = 1 << 1;
        /// Per-edge value.
        const EDGE_VALUE = 1 << 2;
        /// Per-edge normal derivative.
        const EDGE_GRADIENT = 1 << 3;

        /// Linear elements: vertex values only.
        const LINEAR = Self::TO_VERTEX_VALUE.bits() | Self::FROM_VERTEX_VALUE.bits();
        /// Quadratic elements: vertex values and edge values.
        const QUADRATIC = Self::LINEAR.bits() | Self::EDGE_VALUE.bits();
        /// Morley elements: vertex values and edge gradients.
        const MORLEY = Self::LINEAR.bits() | Self::EDGE_GRADIENT.bits();
        /// Fraeijs de Veubeke elements: every kind.
        const FV = Self::QUADRATIC.bits() | Self::EDGE_GRADIENT.bits();
    }
}

impl Attributes {
    /// Whether `kind` is enabled.
    #[inline]
    pub fn has(self, kind: AttributeKind) -> bool {
        self.intersects(kind.mask())
    }

    /// Enabled kinds, in slot order.
    pub fn kinds(self) -> impl Iterator<Item = AttributeKind> {
        AttributeKind::ALL.into_iter().filter(move |&k| self.has(k))
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

/// Node handles per half-edge, one column per enabled kind.
///
/// Disabled kinds hold no storage at all, so reading them is an error rather
/// than a stale read.
#[derive(Debug, Clone)]
pub struct AttachmentTable<I: MeshIndex = u32> {
    attributes: Attributes,
    num_halfedges: usize,
    columns: [Option<Vec<NodeId<I>>>; 4],
}

impl<I: MeshIndex> AttachmentTable<I> {
    /// Create a table for `num_halfedges` half-edges with every enabled slot
    /// unassigned.
    pub fn new(num_halfedges: usize, attributes: Attributes) -> Self {
        let mut table = Self {
            attributes: Attributes::empty(),
            num_halfedges,
            columns: [None, None, None, None],
        };
        table.set_attributes(attributes);
        table
    }

    /// The enabled-attribute mask.
    #[inline]
    pub fn attributes(&self) -> Attributes {
        self.attributes
    }

    /// Change the enabled kinds. Newly enabled kinds start unassigned;
    /// disabled kinds lose their slots.
    pub fn set_attributes(&mut self, attributes: Attributes) {
        for kind in AttributeKind::ALL {
            let column = &mut self.columns[kind.slot()];
            if attributes.has(kind) {
                if column.is_none() {
                    *column = Some(vec![NodeId::invalid(); self.num_halfedges]);
                }
            } else {
                *column = None;
            }
        }
        self.attributes = attributes;
    }

    /// Read a slot.
    #[inline]
    pub fn get(&self, he: HalfEdgeId<I>, kind: AttributeKind) -> Result<NodeId<I>> {
        let column = self.column(kind)?;
        column
            .get(he.index())
            .copied()
            .ok_or_else(|| MeshError::invalid_handle("halfedge", he.index()))
    }

    /// Write a slot.
    #[inline]
    pub fn set(&mut self, he: HalfEdgeId<I>, kind: AttributeKind, node: NodeId<I>) -> Result<()> {
        let column = self.columns[kind.slot()]
            .as_mut()
            .ok_or(MeshError::AttributeDisabled { attribute: kind })?;
        let slot = column
            .get_mut(he.index())
            .ok_or_else(|| MeshError::invalid_handle("halfedge", he.index()))?;
        *slot = node;
        Ok(())
    }

    /// The whole column of an enabled kind.
    pub fn column(&self, kind: AttributeKind) -> Result<&[NodeId<I>]> {
        self.columns[kind.slot()]
            .as_deref()
            .ok_or(MeshError::AttributeDisabled { attribute: kind })
    }

    /// Every enabled slot of every half-edge, mutably.
    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut NodeId<I>> + '_ {
        self.columns.iter_mut().flatten().flat_map(|column| column.iter_mut())
    }

    /// Every enabled slot of every half-edge.
    pub(crate) fn slots(&self) -> impl Iterator<Item = NodeId<I>> + '_ {
        self.columns.iter().flatten().flat_map(|column| column.iter().copied())
    }
}
