//! `ModelConverter`: grafts discovered invariants onto a solved model's
//! predicate interpretations.
//!
//! The outer model representation itself is external plumbing; this
//! module only needs the minimal shape of a "functional interpretation"
//! to state and apply its grafting rule: a default value plus whether
//! the interpretation is total.

use crate::expr::Expr;
use rustc_hash::FxHashMap;

/// The minimal functional-interpretation shape `ModelConverter` needs: a
/// predicate's solved interpretation reduces to a default value plus
/// whether it covers every input (`total`) or only some (partial, left
/// untouched by grafting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateInterpretation {
    /// The interpretation's default/"else" value, if any.
    pub default: Option<Expr>,
    /// `true` if this interpretation is total (covers every input).
    /// Partial interpretations are never grafted onto.
    pub total: bool,
}

/// Post-solve grafting of `(predicate, invariant)` pairs discovered by
/// [`crate::driver::InvariantDriver`] onto a solver's model.
#[derive(Debug, Clone, Default)]
pub struct ModelConverter {
    invariants: FxHashMap<String, Expr>,
}

impl ModelConverter {
    /// Wraps a driver's discovered invariants.
    pub fn new(invariants: FxHashMap<String, Expr>) -> Self {
        Self { invariants }
    }

    /// The invariant recorded for `predicate`, if any.
    pub fn invariant_for(&self, predicate: &str) -> Option<&Expr> {
        self.invariants.get(predicate)
    }

    /// Applies the grafting rule to `predicate`'s existing
    /// interpretation (`None` if the solver's model has none):
    /// - No recorded invariant: `existing` is returned unchanged.
    /// - Recorded invariant, no existing interpretation: a new one is
    ///   created whose default is `false` (the relation was judged
    ///   infeasible by the absence of a model entry — conservative).
    /// - Recorded invariant, existing total interpretation: the invariant
    ///   is conjoined with the existing default.
    /// - Recorded invariant, existing partial interpretation: left
    ///   untouched.
    pub fn graft(
        &self,
        predicate: &str,
        existing: Option<PredicateInterpretation>,
    ) -> Option<PredicateInterpretation> {
        let Some(invariant) = self.invariants.get(predicate) else {
            return existing;
        };
        match existing {
            None => Some(PredicateInterpretation {
                default: Some(Expr::fls()),
                total: true,
            }),
            Some(PredicateInterpretation {
                default: Some(d),
                total: true,
            }) => Some(PredicateInterpretation {
                default: Some(Expr::conjunction([d, invariant.clone()])),
                total: true,
            }),
            Some(partial) => Some(partial),
        }
    }

    /// Translates every recorded `(predicate, invariant)` pair through
    /// `translator`, producing a converter usable in a different AST
    /// context.
    pub fn translate(&self, mut translator: impl FnMut(&str, &Expr) -> (String, Expr)) -> Self {
        let invariants = self
            .invariants
            .iter()
            .map(|(predicate, formula)| translator(predicate, formula))
            .collect();
        Self { invariants }
    }
}
