//! # OxiCube
//!
//! Provenance-aware fragmentation for RDF data cubes.
//!
//! An RDF data cube is a set of quadruples (subject, relation, object,
//! provenance). This crate partitions such a cube into disjoint *fragments*
//! according to a schema, organizes the fragments into a containment lattice
//! rooted at the whole-cube fragment, links data fragments to the metadata
//! fragments needed to interpret them, and selects a budget-constrained
//! subset of fragments for materialization.
//!
//! The crate deliberately has no I/O surface: quadruples and schema
//! information arrive through the [`source::CubeDataSource`] and
//! [`schema::CubeSchema`] traits, both of which ship with in-memory
//! implementations.
//!
//! ## Examples
//!
//! ```rust
//! use oxicube::{FragmentLattice, FragmentsSelector, GreedySelector};
//! use oxicube::{InMemoryDataSource, InMemorySchema, Quad};
//!
//! # fn main() -> oxicube::Result<()> {
//! let mut schema = InMemorySchema::new();
//! schema.declare_relation("worksAt", Some("Person"), Some("Organization"));
//!
//! let source = InMemoryDataSource::from_quads(vec![
//!     Quad::new("Alice", "worksAt", "Acme", "g1"),
//!     Quad::new("Bob", "worksAt", "Acme", "g1"),
//! ]);
//!
//! let lattice = FragmentLattice::build(&schema, &source)?;
//! assert_eq!(lattice.root().size(), 2);
//!
//! let selected = GreedySelector::new().select(&lattice, 10)?;
//! assert!(!selected.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod fragment;
pub mod lattice;
pub mod model;
pub mod schema;
pub mod selector;
pub mod source;

// Re-export core types for convenience
pub use fragment::{Fragment, FragmentId, FragmentKey, FragmentKind};
pub use lattice::FragmentLattice;
pub use model::{Quad, RelationSignature};
pub use schema::{CubeSchema, InMemorySchema};
pub use selector::{Benefit, FragmentsSelector, GreedySelector, SizeBenefit};
pub use source::{CubeDataSource, InMemoryDataSource};

/// Core error type for cube fragmentation operations
#[derive(Debug, thiserror::Error)]
pub enum CubeError {
    /// A relation appeared in the data with no resolvable schema signature.
    #[error("no schema signature for relation: {0}")]
    SchemaLookup(String),
    /// A quadruple carried an absent or empty provenance identifier.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    /// A caller-supplied argument or policy violated the selector contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for cube fragmentation operations
pub type Result<T> = std::result::Result<T, CubeError>;

/// Version information for OxiCube
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
