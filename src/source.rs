//! Data provider interface and an in-memory implementation
//!
//! A data source exposes a repeatable, order-stable traversal over all
//! quadruples of a cube plus subject- and object-indexed lookups. The
//! traversal order determines fragment creation order and therefore any
//! first-seen tie-breaks downstream. Loading quads from files or stores is
//! an external concern.

use crate::model::Quad;
use std::collections::HashMap;

/// Read access to the quadruples of a cube.
///
/// Implementations must not mutate their underlying data while a lattice
/// build is running, and `quads()` must yield the same sequence on every
/// call.
pub trait CubeDataSource {
    /// Iterate over all quads in a stable order
    fn quads(&self) -> Box<dyn Iterator<Item = &Quad> + '_>;

    /// All quads with the given subject, in traversal order
    fn quads_for_subject(&self, subject: &str) -> Vec<&Quad>;

    /// All quads with the given object, in traversal order
    fn quads_for_object(&self, object: &str) -> Vec<&Quad>;

    /// Number of quads held by the source
    fn len(&self) -> usize;

    /// Check if the source holds no quads
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A data source holding its quads in memory, with subject and object
/// position indices built at construction time
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    quads: Vec<Quad>,
    by_subject: HashMap<String, Vec<usize>>,
    by_object: HashMap<String, Vec<usize>>,
}

impl InMemoryDataSource {
    /// Create an empty data source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a data source from a vector of quads, preserving their order
    pub fn from_quads(quads: Vec<Quad>) -> Self {
        let mut source = Self::new();
        for quad in quads {
            source.add_quad(quad);
        }
        source
    }

    /// Append a quad, keeping the position indices current
    pub fn add_quad(&mut self, quad: Quad) {
        let position = self.quads.len();
        self.by_subject
            .entry(quad.subject().to_owned())
            .or_default()
            .push(position);
        self.by_object
            .entry(quad.object().to_owned())
            .or_default()
            .push(position);
        self.quads.push(quad);
    }

    fn lookup<'a>(&'a self, index: &'a HashMap<String, Vec<usize>>, key: &str) -> Vec<&'a Quad> {
        index
            .get(key)
            .map(|positions| positions.iter().map(|&i| &self.quads[i]).collect())
            .unwrap_or_default()
    }
}

impl CubeDataSource for InMemoryDataSource {
    fn quads(&self) -> Box<dyn Iterator<Item = &Quad> + '_> {
        Box::new(self.quads.iter())
    }

    fn quads_for_subject(&self, subject: &str) -> Vec<&Quad> {
        self.lookup(&self.by_subject, subject)
    }

    fn quads_for_object(&self, object: &str) -> Vec<&Quad> {
        self.lookup(&self.by_object, object)
    }

    fn len(&self) -> usize {
        self.quads.len()
    }
}
