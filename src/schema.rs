//! Schema provider interface and an in-memory implementation
//!
//! The schema describes the structure of a cube: which relations exist,
//! their domain and range types, and whether a relation carries cube facts
//! or metadata (type/structure information). Parsing schema files is out of
//! scope; external loaders populate an implementation of [`CubeSchema`].

use std::collections::HashMap;

/// Resolves relations to their schema-level shape and classification.
///
/// Implementations must be consistent within one build: repeated calls with
/// the same relation return the same answers.
pub trait CubeSchema {
    /// The domain and range types declared for a relation, or `None` if the
    /// relation is unknown to the schema. A known relation may still have
    /// `None` in either position when that end is unconstrained.
    fn signature(&self, relation: &str) -> Option<(Option<&str>, Option<&str>)>;

    /// Whether the relation describes type/structure rather than cube facts
    fn is_metadata_relation(&self, relation: &str) -> bool;

    /// Whether the relation participates in the cube's partitioning scheme
    fn is_cube_relation(&self, relation: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
struct RelationEntry {
    domain: Option<String>,
    range: Option<String>,
    metadata: bool,
    cube: bool,
}

/// A schema held entirely in memory, populated through declaration calls
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    relations: HashMap<String, RelationEntry>,
}

impl InMemorySchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a cube-fact relation with optional domain and range types
    pub fn declare_relation(
        &mut self,
        relation: impl Into<String>,
        domain: Option<impl Into<String>>,
        range: Option<impl Into<String>>,
    ) -> &mut Self {
        self.declare(relation, domain, range, false, true)
    }

    /// Declare a metadata relation with optional domain and range types
    pub fn declare_metadata_relation(
        &mut self,
        relation: impl Into<String>,
        domain: Option<impl Into<String>>,
        range: Option<impl Into<String>>,
    ) -> &mut Self {
        self.declare(relation, domain, range, true, false)
    }

    fn declare(
        &mut self,
        relation: impl Into<String>,
        domain: Option<impl Into<String>>,
        range: Option<impl Into<String>>,
        metadata: bool,
        cube: bool,
    ) -> &mut Self {
        self.relations.insert(
            relation.into(),
            RelationEntry {
                domain: domain.map(Into::into),
                range: range.map(Into::into),
                metadata,
                cube,
            },
        );
        self
    }

    /// Number of declared relations
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if no relations have been declared
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl CubeSchema for InMemorySchema {
    fn signature(&self, relation: &str) -> Option<(Option<&str>, Option<&str>)> {
        self.relations
            .get(relation)
            .map(|entry| (entry.domain.as_deref(), entry.range.as_deref()))
    }

    fn is_metadata_relation(&self, relation: &str) -> bool {
        self.relations
            .get(relation)
            .map(|entry| entry.metadata)
            .unwrap_or(false)
    }

    fn is_cube_relation(&self, relation: &str) -> bool {
        self.relations
            .get(relation)
            .map(|entry| entry.cube)
            .unwrap_or(false)
    }
}
