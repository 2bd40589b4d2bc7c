//! The refinement algebra.
//!
//! Refinements are propositional terms over `(definition, discriminant)`
//! pairs, built while checking conditions and lowered into per-definition
//! discriminant maps when a branch scope is entered. Terms are immutable and
//! arena-allocated; "no refinement" is `Option::None`, and the smart
//! constructors drop absent operands so the algebra never allocates trivial
//! nodes.

use silt_dfg::DefId;
use silt_types::TypeId;

/// Handle to a refinement term.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RefinementId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub enum Refinement {
    /// "This definition has this discriminant type."
    Proposition {
        def: DefId,
        discriminant: TypeId,
    },
    Negation(RefinementId),
    Conjunction(RefinementId, RefinementId),
    Disjunction(RefinementId, RefinementId),
    /// Both sides refine each other, as under `==`; lowering goes through a
    /// singleton-or-top check rather than using the discriminant directly.
    Equivalence(RefinementId, RefinementId),
    Variadic(Vec<RefinementId>),
}

/// Arena of refinement terms for one module analysis.
#[derive(Debug, Default)]
pub struct RefinementArena {
    terms: Vec<Refinement>,
}

impl RefinementArena {
    pub fn new() -> Self {
        RefinementArena::default()
    }

    pub fn get(&self, id: RefinementId) -> &Refinement {
        &self.terms[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn add(&mut self, term: Refinement) -> RefinementId {
        let id = RefinementId(self.terms.len() as u32);
        self.terms.push(term);
        id
    }

    pub fn proposition(&mut self, def: DefId, discriminant: TypeId) -> RefinementId {
        self.add(Refinement::Proposition { def, discriminant })
    }

    pub fn negation(&mut self, inner: Option<RefinementId>) -> Option<RefinementId> {
        inner.map(|inner| self.add(Refinement::Negation(inner)))
    }

    pub fn conjunction(
        &mut self,
        lhs: Option<RefinementId>,
        rhs: Option<RefinementId>,
    ) -> Option<RefinementId> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(self.add(Refinement::Conjunction(lhs, rhs))),
            (one, None) | (None, one) => one,
        }
    }

    pub fn disjunction(
        &mut self,
        lhs: Option<RefinementId>,
        rhs: Option<RefinementId>,
    ) -> Option<RefinementId> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(self.add(Refinement::Disjunction(lhs, rhs))),
            (one, None) | (None, one) => one,
        }
    }

    pub fn equivalence(
        &mut self,
        lhs: Option<RefinementId>,
        rhs: Option<RefinementId>,
    ) -> Option<RefinementId> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(self.add(Refinement::Equivalence(lhs, rhs))),
            (one, None) | (None, one) => one,
        }
    }

    /// A conjunction-like bundle of independent refinements (one per call
    /// argument). Absent entries are dropped; an empty bundle is no
    /// refinement.
    pub fn variadic(&mut self, parts: Vec<Option<RefinementId>>) -> Option<RefinementId> {
        let parts: Vec<RefinementId> = parts.into_iter().flatten().collect();
        if parts.is_empty() {
            None
        } else {
            Some(self.add(Refinement::Variadic(parts)))
        }
    }
}

#[cfg(test)]
#[path = "tests/refinements.rs"]
mod tests;
