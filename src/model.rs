//! Value types for cube data: quadruples and relation signatures

use serde::{Deserialize, Serialize};
use std::fmt;

/// An RDF-style quadruple: subject, relation, object, provenance.
///
/// The provenance component identifies the graph context the statement
/// originates from. Quads compare structurally and carry no identity beyond
/// their four components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    subject: String,
    relation: String,
    object: String,
    provenance: String,
}

impl Quad {
    /// Create a new quad from its four components
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        Quad {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
            provenance: provenance.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.subject, self.relation, self.object, self.provenance
        )
    }
}

/// The schema-level shape of a relation: domain type, relation name, range
/// type.
///
/// Domain and range are `None` when the schema declares no constraint for
/// that position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationSignature {
    domain: Option<String>,
    relation: String,
    range: Option<String>,
}

impl RelationSignature {
    /// Create a signature for a relation with optional domain and range types
    pub fn new(
        domain: Option<impl Into<String>>,
        relation: impl Into<String>,
        range: Option<impl Into<String>>,
    ) -> Self {
        RelationSignature {
            domain: domain.map(Into::into),
            relation: relation.into(),
            range: range.map(Into::into),
        }
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }
}

impl fmt::Display for RelationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.domain.as_deref().unwrap_or("?"),
            self.relation,
            self.range.as_deref().unwrap_or("?")
        )
    }
}
