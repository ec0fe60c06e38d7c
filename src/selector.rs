//! Budgeted fragment selection
//!
//! Given a built lattice and a storage budget, a selector picks a subset of
//! fragments whose total size fits the budget while maximizing benefit. The
//! benefit policy is pluggable; the default scores a fragment by its raw
//! quad coverage.

use crate::fragment::{Fragment, FragmentId};
use crate::lattice::FragmentLattice;
use crate::{CubeError, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// A selection strategy over the fragments of a lattice
pub trait FragmentsSelector {
    /// Select fragments whose total size does not exceed `budget` quads.
    ///
    /// The root is never individually selectable; it stands for the whole
    /// cube. A budget of zero and a root-only lattice are valid degenerate
    /// inputs yielding an empty selection.
    fn select(&self, lattice: &FragmentLattice, budget: u64) -> Result<BTreeSet<FragmentId>>;
}

/// Scores a fragment's usefulness for retrieval.
///
/// Scores must be finite; the greedy selector ranks fragments by score per
/// unit size.
pub trait Benefit {
    fn benefit(&self, fragment: &Fragment, lattice: &FragmentLattice) -> f64;
}

/// Default benefit policy: a fragment is worth its quad coverage, so every
/// fragment has unit benefit density and ties resolve by size and creation
/// order
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeBenefit;

impl Benefit for SizeBenefit {
    fn benefit(&self, fragment: &Fragment, _lattice: &FragmentLattice) -> f64 {
        fragment.size() as f64
    }
}

/// Deterministic greedy 0/1-knapsack approximation.
///
/// Fragments are ranked by benefit density (benefit per quad), densest
/// first; the ranked sequence is scanned once and every fragment that still
/// fits the remaining budget is taken. Fragments that do not fit are
/// skipped, not treated as a stopping point, so smaller lower-ranked
/// fragments can still be admitted.
pub struct GreedySelector<B = SizeBenefit> {
    benefit: B,
}

impl GreedySelector<SizeBenefit> {
    /// A selector with the default size-based benefit policy
    pub fn new() -> Self {
        GreedySelector {
            benefit: SizeBenefit,
        }
    }
}

impl Default for GreedySelector<SizeBenefit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Benefit> GreedySelector<B> {
    /// A selector with a caller-supplied benefit policy
    pub fn with_benefit(benefit: B) -> Self {
        GreedySelector { benefit }
    }

    /// Rank all non-root fragments by benefit density, descending. Ties
    /// prefer smaller fragments, then earlier-created ones, so the order is
    /// total and reproducible.
    fn ranked(&self, lattice: &FragmentLattice) -> Result<Vec<(FragmentId, u64)>> {
        let mut ranked: Vec<(FragmentId, u64, f64)> = Vec::with_capacity(lattice.len() - 1);
        for fragment in lattice.fragments().filter(|f| !f.is_root()) {
            let benefit = self.benefit.benefit(fragment, lattice);
            if !benefit.is_finite() {
                return Err(CubeError::InvalidArgument(format!(
                    "benefit for fragment {} is not finite",
                    fragment.id()
                )));
            }
            let density = benefit / fragment.size().max(1) as f64;
            ranked.push((fragment.id(), fragment.size(), density));
        }
        ranked.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.0.cmp(&b.0))
        });
        Ok(ranked.into_iter().map(|(id, size, _)| (id, size)).collect())
    }
}

impl<B: Benefit> FragmentsSelector for GreedySelector<B> {
    fn select(&self, lattice: &FragmentLattice, budget: u64) -> Result<BTreeSet<FragmentId>> {
        let mut selected = BTreeSet::new();
        let mut remaining = budget;
        for (id, size) in self.ranked(lattice)? {
            if size > remaining {
                continue;
            }
            selected.insert(id);
            remaining -= size;
        }
        debug!(
            budget,
            spent = budget - remaining,
            fragments = selected.len(),
            "greedy selection finished"
        );
        Ok(selected)
    }
}
