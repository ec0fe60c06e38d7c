//! The fragment lattice: construction, containment edges, ancestor
//! closure, and data→metadata linkage
//!
//! The lattice is built in a single batch pass over a data source. All
//! mutation happens inside [`FragmentLattice::build`]; the returned value
//! exposes a read-only API and may be shared across threads freely.

use crate::fragment::{Fragment, FragmentId, FragmentKey, FragmentKind};
use crate::model::{Quad, RelationSignature};
use crate::schema::CubeSchema;
use crate::source::CubeDataSource;
use crate::{CubeError, Result};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info};

/// A DAG of cube fragments ordered by containment, rooted at the
/// whole-cube fragment.
///
/// Fragments live in an arena addressed by [`FragmentId`]; adjacency, the
/// metadata linkage map, and the domain/range indices are stored as
/// id-to-id-set mappings, which keeps the structure free of cyclic
/// references and trivially inspectable.
#[derive(Debug, Clone)]
pub struct FragmentLattice {
    /// Arena of fragments in creation order, root at index 0
    fragments: Vec<Fragment>,
    /// Structural key to arena id, in first-seen order
    registry: IndexMap<FragmentKey, FragmentId>,
    /// Child to parents adjacency
    parents: HashMap<FragmentId, BTreeSet<FragmentId>>,
    /// Parent to children adjacency
    children: HashMap<FragmentId, BTreeSet<FragmentId>>,
    /// Fragment (data fragment or ancestor) to required metadata fragments
    metadata_map: HashMap<FragmentId, BTreeSet<FragmentId>>,
    /// Type name to fragments whose signature has that type as domain
    domain_index: HashMap<String, BTreeSet<FragmentId>>,
    /// Type name to fragments whose signature has that type as range
    range_index: HashMap<String, BTreeSet<FragmentId>>,
}

impl FragmentLattice {
    /// Build a lattice from a schema and a data source.
    ///
    /// Every quad increments the root, its provenance-only fragment, and
    /// its signature fragment. The build is atomic: any error discards the
    /// partial lattice.
    ///
    /// # Errors
    ///
    /// [`CubeError::SchemaLookup`] if a relation in the data has no schema
    /// signature; [`CubeError::MalformedRecord`] if a quad carries an empty
    /// provenance id.
    pub fn build<S, D>(schema: &S, source: &D) -> Result<FragmentLattice>
    where
        S: CubeSchema,
        D: CubeDataSource,
    {
        let mut lattice = FragmentLattice::with_root();
        let mut quad_count = 0u64;
        for quad in source.quads() {
            lattice.register_quad(schema, quad)?;
            quad_count += 1;
        }
        lattice.link_data_to_metadata();
        info!(
            quads = quad_count,
            fragments = lattice.len(),
            "built fragment lattice"
        );
        Ok(lattice)
    }

    fn with_root() -> Self {
        let mut lattice = FragmentLattice {
            fragments: Vec::new(),
            registry: IndexMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            metadata_map: HashMap::new(),
            domain_index: HashMap::new(),
            range_index: HashMap::new(),
        };
        let (root, _) = lattice.resolve_or_create(FragmentKey::root(), FragmentKind::Root, false);
        debug_assert_eq!(root, FragmentId::ROOT);
        lattice
    }

    /// Register one quad into the root, its provenance-only fragment, and
    /// its signature fragment, wiring containment edges on first sight.
    fn register_quad<S: CubeSchema>(&mut self, schema: &S, quad: &Quad) -> Result<()> {
        let provenance = quad.provenance();
        if provenance.is_empty() {
            return Err(CubeError::MalformedRecord(format!(
                "quad {quad} has an empty provenance id"
            )));
        }

        self.fragments[FragmentId::ROOT.index()].increase_size();

        // Provenance-only fragment; carries no signature, so it never lands
        // in the domain/range indices.
        let prov_key = FragmentKey::provenance(provenance);
        let (prov_id, created) = self.resolve_or_create(prov_key, FragmentKind::Data, false);
        if created {
            self.add_edge(prov_id, FragmentId::ROOT);
        }
        self.fragments[prov_id.index()].increase_size();

        // Signature fragment within the same provenance
        let relation = quad.relation();
        let (domain, range) = schema
            .signature(relation)
            .ok_or_else(|| CubeError::SchemaLookup(relation.to_owned()))?;
        let signature = RelationSignature::new(domain, relation, range);
        let kind = if schema.is_metadata_relation(relation) {
            FragmentKind::Metadata
        } else {
            FragmentKind::Data
        };
        let key = FragmentKey::signature(signature.clone(), provenance);
        let (sig_id, created) = self.resolve_or_create(key, kind, schema.is_cube_relation(relation));
        if created {
            self.add_edge(sig_id, prov_id);
            if let Some(domain) = signature.domain() {
                self.domain_index
                    .entry(domain.to_owned())
                    .or_default()
                    .insert(sig_id);
            }
            if let Some(range) = signature.range() {
                self.range_index
                    .entry(range.to_owned())
                    .or_default()
                    .insert(sig_id);
            }
        }
        self.fragments[sig_id.index()].increase_size();
        Ok(())
    }

    /// Look up the fragment for a key, creating it when absent. Returns the
    /// id and whether a new fragment was created.
    fn resolve_or_create(
        &mut self,
        key: FragmentKey,
        kind: FragmentKind,
        cube_partition: bool,
    ) -> (FragmentId, bool) {
        if let Some(&id) = self.registry.get(&key) {
            return (id, false);
        }
        let id = FragmentId(self.fragments.len());
        debug!(fragment = %id, kind = ?kind, "creating fragment");
        self.fragments
            .push(Fragment::new(id, key.clone(), kind, cube_partition));
        self.registry.insert(key, id);
        (id, true)
    }

    fn add_edge(&mut self, child: FragmentId, parent: FragmentId) {
        self.parents.entry(child).or_default().insert(parent);
        self.children.entry(parent).or_default().insert(child);
    }

    /// Connect every data fragment, and each of its ancestors, to the
    /// metadata fragments whose signature range matches the data fragment's
    /// domain. Set semantics make re-running this a no-op.
    fn link_data_to_metadata(&mut self) {
        let data_fragments: Vec<(FragmentId, String)> = self
            .fragments
            .iter()
            .filter(|f| f.kind() == FragmentKind::Data)
            .filter_map(|f| {
                let domain = f.key().signature_part()?.domain()?;
                Some((f.id(), domain.to_owned()))
            })
            .collect();

        for (id, domain) in data_fragments {
            let candidates = match self.range_index.get(&domain) {
                Some(candidates) => candidates.clone(),
                None => continue,
            };
            let ancestors = self.ancestors(id);
            for candidate in candidates {
                if !self.fragments[candidate.index()].is_metadata() {
                    continue;
                }
                debug!(fragment = %id, metadata = %candidate, "linking metadata fragment");
                self.metadata_map.entry(id).or_default().insert(candidate);
                for &ancestor in &ancestors {
                    self.metadata_map
                        .entry(ancestor)
                        .or_default()
                        .insert(candidate);
                }
            }
        }
    }

    /// All fragments reachable from `id` via parent edges, excluding `id`
    /// itself.
    ///
    /// Traverses with an explicit worklist and visited set, so it
    /// terminates even if the edge set ever degrades from a DAG.
    pub fn ancestors(&self, id: FragmentId) -> BTreeSet<FragmentId> {
        let mut visited = BTreeSet::new();
        let mut worklist = vec![id];
        while let Some(current) = worklist.pop() {
            if let Some(parents) = self.parents.get(&current) {
                for &parent in parents {
                    if visited.insert(parent) {
                        worklist.push(parent);
                    }
                }
            }
        }
        visited.remove(&id);
        visited
    }

    /// The whole-cube fragment
    pub fn root(&self) -> &Fragment {
        &self.fragments[FragmentId::ROOT.index()]
    }

    /// Number of fragments, root included
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// A lattice always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all fragments, root first, in creation order
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// The fragment at an arena id, if in range
    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(id.index())
    }

    /// The fragment with a structural key, if one was created
    pub fn fragment_by_key(&self, key: &FragmentKey) -> Option<&Fragment> {
        self.registry
            .get(key)
            .map(|&id| &self.fragments[id.index()])
    }

    /// Direct parents of a fragment
    pub fn parents_of(&self, id: FragmentId) -> BTreeSet<FragmentId> {
        self.parents.get(&id).cloned().unwrap_or_default()
    }

    /// Direct children of a fragment
    pub fn children_of(&self, id: FragmentId) -> BTreeSet<FragmentId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    /// The metadata fragments required to resolve joins originating from a
    /// fragment
    pub fn metadata_fragments_of(&self, id: FragmentId) -> BTreeSet<FragmentId> {
        self.metadata_map.get(&id).cloned().unwrap_or_default()
    }

    /// Fragments whose signature has the given type as domain
    pub fn fragments_with_domain(&self, type_name: &str) -> BTreeSet<FragmentId> {
        self.domain_index
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Fragments whose signature has the given type as range
    pub fn fragments_with_range(&self, type_name: &str) -> BTreeSet<FragmentId> {
        self.range_index.get(type_name).cloned().unwrap_or_default()
    }

    /// Sum of all non-root fragment sizes
    pub fn total_size(&self) -> u64 {
        self.fragments
            .iter()
            .filter(|f| !f.is_root())
            .map(|f| f.size())
            .sum()
    }

    /// The fragments a consumer would join against for a subject within a
    /// provenance: the signature fragment of every relation the source
    /// holds for that subject, plus the provenance-only fragment.
    ///
    /// # Errors
    ///
    /// [`CubeError::SchemaLookup`] if a relation held for the subject is
    /// unknown to the schema.
    pub fn join_fragments_for_subject<S, D>(
        &self,
        schema: &S,
        source: &D,
        subject: &str,
        provenance: &str,
    ) -> Result<BTreeSet<FragmentId>>
    where
        S: CubeSchema,
        D: CubeDataSource,
    {
        let mut result = BTreeSet::new();
        for quad in source.quads_for_subject(subject) {
            let relation = quad.relation();
            let (domain, range) = schema
                .signature(relation)
                .ok_or_else(|| CubeError::SchemaLookup(relation.to_owned()))?;
            let signature = RelationSignature::new(domain, relation, range);
            let key = FragmentKey::signature(signature, provenance);
            if let Some(&id) = self.registry.get(&key) {
                result.insert(id);
            }
            if let Some(&id) = self.registry.get(&FragmentKey::provenance(provenance)) {
                result.insert(id);
            }
        }
        Ok(result)
    }
}

/// Diagnostic rendering of the lattice: fragments, parent edges, and the
/// metadata linkage map. Not a stable format.
impl fmt::Display for FragmentLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.root())?;
        for fragment in self.fragments.iter().filter(|fr| !fr.is_root()) {
            let parents: Vec<String> = self
                .parents_of(fragment.id())
                .into_iter()
                .map(|p| self.fragments[p.index()].to_string())
                .collect();
            writeln!(f, "{} ----> {}", fragment, parents.join(", "))?;
        }
        for (id, linked) in self.fragments.iter().filter_map(|fr| {
            self.metadata_map
                .get(&fr.id())
                .map(|linked| (fr.id(), linked))
        }) {
            let targets: Vec<String> = linked
                .iter()
                .map(|m| self.fragments[m.index()].to_string())
                .collect();
            writeln!(
                f,
                "{} needs {}",
                self.fragments[id.index()],
                targets.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::InMemorySchema;
    use crate::source::InMemoryDataSource;

    fn sample_schema() -> InMemorySchema {
        let mut schema = InMemorySchema::new();
        schema.declare_relation("worksAt", Some("Person"), Some("Organization"));
        schema.declare_relation("locatedIn", Some("Organization"), Some("City"));
        schema.declare_metadata_relation("hasType", Some("Class"), Some("Person"));
        schema
    }

    fn sample_source() -> InMemoryDataSource {
        InMemoryDataSource::from_quads(vec![
            Quad::new("Alice", "worksAt", "Acme", "g1"),
            Quad::new("Alice", "worksAt", "Acme", "g1"),
            Quad::new("Alice", "worksAt", "Acme", "g1"),
            Quad::new("Bob", "worksAt", "Acme", "g1"),
            Quad::new("Bob", "worksAt", "Acme", "g1"),
        ])
    }

    #[test]
    fn test_root_counts_every_quad() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        assert_eq!(lattice.root().size(), 5);
    }

    #[test]
    fn test_provenance_and_signature_fragment_sizes() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();

        let prov = lattice
            .fragment_by_key(&FragmentKey::provenance("g1"))
            .unwrap();
        assert_eq!(prov.size(), 5);

        let sig = RelationSignature::new(Some("Person"), "worksAt", Some("Organization"));
        let fragment = lattice
            .fragment_by_key(&FragmentKey::signature(sig, "g1"))
            .unwrap();
        assert_eq!(fragment.size(), 5);
        assert_eq!(fragment.kind(), FragmentKind::Data);
        assert!(fragment.is_cube_partition());
    }

    #[test]
    fn test_registering_n_quads_adds_2n_to_non_root_sizes() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        assert_eq!(lattice.total_size(), 10);
    }

    #[test]
    fn test_root_has_no_ancestors() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        assert!(lattice.ancestors(FragmentId::ROOT).is_empty());
    }

    #[test]
    fn test_every_non_root_fragment_descends_from_root() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        for fragment in lattice.fragments().filter(|f| !f.is_root()) {
            let ancestors = lattice.ancestors(fragment.id());
            assert!(ancestors.contains(&FragmentId::ROOT));
            assert!(!ancestors.contains(&fragment.id()), "fragment is its own ancestor");
        }
    }

    #[test]
    fn test_signature_fragment_parents_are_provenance_fragments() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        let sig = RelationSignature::new(Some("Person"), "worksAt", Some("Organization"));
        let fragment = lattice
            .fragment_by_key(&FragmentKey::signature(sig, "g1"))
            .unwrap();
        let prov = lattice
            .fragment_by_key(&FragmentKey::provenance("g1"))
            .unwrap();
        assert_eq!(
            lattice.parents_of(fragment.id()),
            BTreeSet::from([prov.id()])
        );
        assert!(lattice.children_of(prov.id()).contains(&fragment.id()));
    }

    #[test]
    fn test_metadata_linkage_matches_domain_to_range() {
        // hasType has range Person; worksAt has domain Person, so the
        // worksAt data fragment must link to the hasType metadata fragment.
        let mut source = sample_source();
        source.add_quad(Quad::new("PersonClass", "hasType", "Alice", "g1"));
        let lattice = FragmentLattice::build(&sample_schema(), &source).unwrap();

        let works_at = lattice
            .fragment_by_key(&FragmentKey::signature(
                RelationSignature::new(Some("Person"), "worksAt", Some("Organization")),
                "g1",
            ))
            .unwrap();
        let has_type = lattice
            .fragment_by_key(&FragmentKey::signature(
                RelationSignature::new(Some("Class"), "hasType", Some("Person")),
                "g1",
            ))
            .unwrap();
        assert_eq!(has_type.kind(), FragmentKind::Metadata);

        let linked = lattice.metadata_fragments_of(works_at.id());
        assert!(linked.contains(&has_type.id()));

        // Ancestors of the data fragment inherit the linkage
        for ancestor in lattice.ancestors(works_at.id()) {
            assert!(lattice
                .metadata_fragments_of(ancestor)
                .contains(&has_type.id()));
        }
    }

    #[test]
    fn test_data_fragment_without_matching_metadata_gets_no_links() {
        // locatedIn has domain Organization; no metadata relation has range
        // Organization, so no linkage entry appears.
        let mut source = sample_source();
        source.add_quad(Quad::new("Acme", "locatedIn", "Lyon", "g1"));
        let lattice = FragmentLattice::build(&sample_schema(), &source).unwrap();
        let located_in = lattice
            .fragment_by_key(&FragmentKey::signature(
                RelationSignature::new(Some("Organization"), "locatedIn", Some("City")),
                "g1",
            ))
            .unwrap();
        assert!(lattice.metadata_fragments_of(located_in.id()).is_empty());
    }

    #[test]
    fn test_linking_twice_is_idempotent() {
        let mut source = sample_source();
        source.add_quad(Quad::new("PersonClass", "hasType", "Alice", "g1"));
        let mut lattice = FragmentLattice::build(&sample_schema(), &source).unwrap();
        let before = lattice.metadata_map.clone();
        lattice.link_data_to_metadata();
        assert_eq!(before, lattice.metadata_map);
    }

    #[test]
    fn test_unknown_relation_aborts_build() {
        let source = InMemoryDataSource::from_quads(vec![Quad::new("a", "unknown", "b", "g1")]);
        let err = FragmentLattice::build(&sample_schema(), &source).unwrap_err();
        assert!(matches!(err, CubeError::SchemaLookup(relation) if relation == "unknown"));
    }

    #[test]
    fn test_empty_provenance_aborts_build() {
        let source = InMemoryDataSource::from_quads(vec![Quad::new("a", "worksAt", "b", "")]);
        let err = FragmentLattice::build(&sample_schema(), &source).unwrap_err();
        assert!(matches!(err, CubeError::MalformedRecord(_)));
    }

    #[test]
    fn test_empty_source_yields_root_only() {
        let lattice =
            FragmentLattice::build(&sample_schema(), &InMemoryDataSource::new()).unwrap();
        assert_eq!(lattice.len(), 1);
        assert_eq!(lattice.root().size(), 0);
        assert_eq!(lattice.total_size(), 0);
    }

    #[test]
    fn test_iteration_is_root_first() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        let first = lattice.fragments().next().unwrap();
        assert!(first.is_root());
    }

    #[test]
    fn test_domain_and_range_indices_hold_signature_fragments() {
        let lattice = FragmentLattice::build(&sample_schema(), &sample_source()).unwrap();
        let sig = RelationSignature::new(Some("Person"), "worksAt", Some("Organization"));
        let fragment = lattice
            .fragment_by_key(&FragmentKey::signature(sig, "g1"))
            .unwrap();
        assert!(lattice
            .fragments_with_domain("Person")
            .contains(&fragment.id()));
        assert!(lattice
            .fragments_with_range("Organization")
            .contains(&fragment.id()));
        assert!(lattice.fragments_with_domain("City").is_empty());
    }

    #[test]
    fn test_join_fragments_for_subject() {
        let mut source = sample_source();
        source.add_quad(Quad::new("Alice", "worksAt", "Globex", "g2"));
        let schema = sample_schema();
        let lattice = FragmentLattice::build(&schema, &source).unwrap();

        let joins = lattice
            .join_fragments_for_subject(&schema, &source, "Alice", "g1")
            .unwrap();
        let sig = RelationSignature::new(Some("Person"), "worksAt", Some("Organization"));
        let sig_id = lattice
            .fragment_by_key(&FragmentKey::signature(sig, "g1"))
            .unwrap()
            .id();
        let prov_id = lattice
            .fragment_by_key(&FragmentKey::provenance("g1"))
            .unwrap()
            .id();
        assert_eq!(joins, BTreeSet::from([sig_id, prov_id]));

        let no_joins = lattice
            .join_fragments_for_subject(&schema, &source, "Carol", "g1")
            .unwrap();
        assert!(no_joins.is_empty());
    }

    #[test]
    fn test_display_renders_all_sections() {
        let mut source = sample_source();
        source.add_quad(Quad::new("PersonClass", "hasType", "Alice", "g1"));
        let lattice = FragmentLattice::build(&sample_schema(), &source).unwrap();
        let dump = lattice.to_string();
        assert!(dump.starts_with("[All, 6 quads]"));
        assert!(dump.contains("---->"));
        assert!(dump.contains("needs"));
    }
}
