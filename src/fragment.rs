//! Cube fragments: the unit of partitioning
//!
//! A fragment groups the quads that share a relation signature and/or a
//! provenance identifier. Fragments live in an arena owned by the lattice
//! and are addressed by [`FragmentId`]; identity is structural over the
//! [`FragmentKey`], so the same signature/provenance pair always resolves to
//! the same fragment regardless of creation order.

use crate::model::RelationSignature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of a fragment within one lattice.
///
/// Ids are assigned in creation order, with the root always at index 0, and
/// double as the deterministic last-resort tie-break during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(pub(crate) usize);

impl FragmentId {
    /// The id of the root fragment in every lattice
    pub const ROOT: FragmentId = FragmentId(0);

    /// The raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural identity of a fragment.
///
/// The root is the sole fragment with neither signature nor provenance;
/// provenance-only fragments carry just the provenance id; signature
/// fragments carry both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentKey {
    signature: Option<RelationSignature>,
    provenance: Option<String>,
}

impl FragmentKey {
    /// The key of the root fragment
    pub fn root() -> Self {
        FragmentKey {
            signature: None,
            provenance: None,
        }
    }

    /// The key of the fragment grouping all quads of one provenance
    pub fn provenance(provenance: impl Into<String>) -> Self {
        FragmentKey {
            signature: None,
            provenance: Some(provenance.into()),
        }
    }

    /// The key of the fragment grouping quads of one relation signature
    /// within one provenance
    pub fn signature(signature: RelationSignature, provenance: impl Into<String>) -> Self {
        FragmentKey {
            signature: Some(signature),
            provenance: Some(provenance.into()),
        }
    }

    pub fn signature_part(&self) -> Option<&RelationSignature> {
        self.signature.as_ref()
    }

    pub fn provenance_part(&self) -> Option<&str> {
        self.provenance.as_deref()
    }
}

/// Classification of a fragment, fixed at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentKind {
    /// The whole-cube fragment, ancestor of every other fragment
    Root,
    /// A fragment of cube facts
    Data,
    /// A fragment of type/structure information
    Metadata,
}

/// A partition of the cube's quads sharing a relation signature and/or
/// provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    id: FragmentId,
    key: FragmentKey,
    kind: FragmentKind,
    cube_partition: bool,
    size: u64,
}

impl Fragment {
    pub(crate) fn new(id: FragmentId, key: FragmentKey, kind: FragmentKind, cube_partition: bool) -> Self {
        Fragment {
            id,
            key,
            kind,
            cube_partition,
            size: 0,
        }
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn key(&self) -> &FragmentKey {
        &self.key
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.kind == FragmentKind::Root
    }

    pub fn is_metadata(&self) -> bool {
        self.kind == FragmentKind::Metadata
    }

    /// Whether the fragment's relation participates in the cube's
    /// partitioning scheme. Only meaningful for signature fragments.
    pub fn is_cube_partition(&self) -> bool {
        self.cube_partition
    }

    /// Number of quads registered into this fragment
    pub fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn increase_size(&mut self) {
        self.size += 1;
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "[All, {} quads]", self.size);
        }
        match self.key.signature_part() {
            Some(sig) => write!(
                f,
                "[{} {} {} quads]",
                sig,
                self.key.provenance_part().unwrap_or("?"),
                self.size
            ),
            None => write!(
                f,
                "[{} {} quads]",
                self.key.provenance_part().unwrap_or("?"),
                self.size
            ),
        }
    }
}
