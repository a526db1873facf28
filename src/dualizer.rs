//! Dualizer: converts between constraint form and generator/basis form
//! via the external Hilbert-basis saturator.
//!
//! `dualize_i` (constraints → basis) feeds each row of `src` to the
//! saturator as an (in)equality with right-hand side `-src.b[i]`; the
//! saturator's own affine/homogeneous split (`is_initial`) becomes the
//! anchor point and direction rows. `dualize_h` (basis → constraints)
//! runs the reverse direction: since `basis` rows carry directions but
//! the data model only anchors exactly one affine point, any extra
//! "initial" rows are first folded into directions as differences
//! against the first (see DESIGN.md's Open Question (b) resolution).
//! Each surviving direction is then dualized against the saturator a
//! second time to produce the supporting-inequality normals of the
//! generated cone.

use crate::matrix::{Matrix, Row};
use crate::rational::{from_i64, to_i64_exact, Rational};
use crate::saturator::{HilbertBasisSaturator, SaturateOutcome};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Result of a dualization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualizeOutcome {
    /// Produced a matrix.
    Ok,
    /// The source was infeasible; the relation is empty (bottom).
    Infeasible,
    /// The saturator could not decide; treat the result as unconstrained
    /// (top) — sound.
    Undef,
}

/// Converts between constraint and basis form via a [`HilbertBasisSaturator`].
pub struct Dualizer<S: HilbertBasisSaturator> {
    saturator: S,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: HilbertBasisSaturator> Dualizer<S> {
    /// Wraps a saturator instance.
    pub fn new(saturator: S) -> Self {
        Self {
            saturator,
            cancel: None,
        }
    }

    /// Installs a cancellation flag, forwarded to the saturator before
    /// every `saturate()` call.
    pub fn set_cancel(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = Some(cancel);
    }

    fn prime_saturator(&mut self) {
        self.saturator.reset();
        if let Some(cancel) = &self.cancel {
            self.saturator.set_cancel(Arc::clone(cancel));
        }
    }

    /// `src` (constraint form, width `n`) → basis form (width `n`).
    pub fn dualize_i(&mut self, src: &Matrix) -> (Matrix, DualizeOutcome) {
        let n = src.width();
        if src.is_empty() {
            // No constraints at all: the relation is the whole space.
            // Basis form has no canonical representation for "everything"
            // short of n independent lines through the origin; callers
            // that need this case (mk_project on a fully unconstrained
            // relation) special-case it themselves (see relation.rs).
            return (Matrix::new(n), DualizeOutcome::Undef);
        }
        self.prime_saturator();
        for row in src.rows() {
            let coeffs: Vec<i64> = row.a.iter().map(|c| coeff_or_zero(c)).collect();
            let rhs = -coeff_or_zero(&row.b);
            for (col, _) in coeffs.iter().enumerate() {
                self.saturator.set_is_int(col);
            }
            if row.eq {
                self.saturator.add_eq(&coeffs, rhs);
            } else {
                self.saturator.add_ge(&coeffs, rhs);
            }
        }
        match self.saturator.saturate() {
            SaturateOutcome::Unsat => (Matrix::new(n), DualizeOutcome::Infeasible),
            SaturateOutcome::Undef => (Matrix::new(n), DualizeOutcome::Undef),
            SaturateOutcome::Sat => {
                let mut basis = Matrix::new(n);
                let mut anchored = false;
                for i in 0..self.saturator.get_basis_size() {
                    let (vec, is_initial) = self.saturator.get_basis_solution(i);
                    if is_initial {
                        if anchored {
                            continue; // keep only the first anchor
                        }
                        anchored = true;
                    }
                    basis.push(vector_row(&vec, is_initial));
                }
                (basis, DualizeOutcome::Ok)
            }
        }
    }

    /// `src` (basis form, width `n`) → constraint form (width `n`).
    pub fn dualize_h(&mut self, src: &Matrix) -> (Matrix, DualizeOutcome) {
        let n = src.width();
        if src.is_empty() {
            return (Matrix::new(n), DualizeOutcome::Ok); // top
        }
        let (anchor, directions) = collapse_to_single_anchor(src);
        if directions.is_empty() {
            // A single point: every column is pinned exactly.
            let mut out = Matrix::new(n);
            for (col, val) in anchor.iter().enumerate() {
                let mut row = vec![from_i64(0); n];
                row[col] = from_i64(1);
                out.push(Row::new(row, from_i64(-val), true));
            }
            return (out, DualizeOutcome::Ok);
        }
        self.prime_saturator();
        for d in &directions {
            for col in 0..n {
                self.saturator.set_is_int(col);
            }
            self.saturator.add_ge(d, 0);
        }
        match self.saturator.saturate() {
            SaturateOutcome::Unsat => (Matrix::new(n), DualizeOutcome::Infeasible),
            SaturateOutcome::Undef => (Matrix::new(n), DualizeOutcome::Undef),
            SaturateOutcome::Sat => {
                let mut out = Matrix::new(n);
                for i in 0..self.saturator.get_basis_size() {
                    let (a, _is_initial) = self.saturator.get_basis_solution(i);
                    // constant term: the facet a·(x - anchor) >= 0
                    let dot: i64 = a.iter().zip(&anchor).map(|(c, v)| c * v).sum();
                    out.push(Row::new(
                        a.iter().map(|c| from_i64(*c)).collect(),
                        from_i64(-dot),
                        false,
                    ));
                }
                (out, DualizeOutcome::Ok)
            }
        }
    }
}

fn coeff_or_zero(r: &Rational) -> i64 {
    to_i64_exact(r).unwrap_or(0)
}

fn vector_row(v: &[i64], is_initial: bool) -> Row {
    Row::new(
        v.iter().map(|c| from_i64(*c)).collect(),
        from_i64(if is_initial { 1 } else { 0 }),
        true,
    )
}

/// Reduces a basis matrix's possibly-multiple "initial" (β = 1) rows down
/// to a single anchor plus an extended direction set, folding every extra
/// anchor in as the difference against the first.
fn collapse_to_single_anchor(basis: &Matrix) -> (Vec<i64>, Vec<Vec<i64>>) {
    let n = basis.width();
    let mut anchor: Option<Vec<i64>> = None;
    let mut directions: Vec<Vec<i64>> = Vec::new();
    for row in basis.rows() {
        let v: Vec<i64> = row.a.iter().map(coeff_or_zero).collect();
        let is_initial = to_i64_exact(&row.b) == Some(1);
        if is_initial {
            match &anchor {
                None => anchor = Some(v),
                Some(a0) => {
                    let diff: Vec<i64> = v.iter().zip(a0).map(|(x, y)| x - y).collect();
                    if diff.iter().any(|c| *c != 0) {
                        directions.push(diff);
                    }
                }
            }
        } else if v.iter().any(|c| *c != 0) {
            directions.push(v);
        }
    }
    (anchor.unwrap_or_else(|| vec![0; n]), directions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saturator::CompletionSaturator;

    fn pin(n: usize, col: usize, val: i64) -> Row {
        let mut a = vec![from_i64(0); n];
        a[col] = from_i64(1);
        Row::new(a, from_i64(-val), true)
    }

    #[test]
    fn test_dualize_i_single_point() {
        let mut m = Matrix::new(1);
        m.push(pin(1, 0, 3));
        let mut dz = Dualizer::new(CompletionSaturator::new());
        let (basis, outcome) = dz.dualize_i(&m);
        assert_eq!(outcome, DualizeOutcome::Ok);
        assert_eq!(basis.size(), 1);
        assert_eq!(to_i64_exact(&basis.row(0).a[0]), Some(3));
    }

    #[test]
    fn test_dualize_i_infeasible() {
        let mut m = Matrix::new(1);
        m.push(pin(1, 0, 3));
        m.push(pin(1, 0, 4));
        let mut dz = Dualizer::new(CompletionSaturator::new());
        let (_, outcome) = dz.dualize_i(&m);
        assert_eq!(outcome, DualizeOutcome::Infeasible);
    }

    #[test]
    fn test_dualize_h_single_point_pins_column() {
        let mut basis = Matrix::new(1);
        basis.push(vector_row(&[3], true));
        let mut dz = Dualizer::new(CompletionSaturator::new());
        let (ineqs, outcome) = dz.dualize_h(&basis);
        assert_eq!(outcome, DualizeOutcome::Ok);
        assert_eq!(ineqs.size(), 1);
        assert!(ineqs.row(0).eq);
    }

    #[test]
    fn test_dualize_h_ray_yields_nonnegativity() {
        // anchor at 0, direction (1): should dualize to x >= 0.
        let mut basis = Matrix::new(1);
        basis.push(vector_row(&[0], true));
        basis.push(vector_row(&[1], false));
        let mut dz = Dualizer::new(CompletionSaturator::new());
        let (ineqs, outcome) = dz.dualize_h(&basis);
        assert_eq!(outcome, DualizeOutcome::Ok);
        assert_eq!(ineqs.size(), 1);
        assert!(!ineqs.row(0).eq);
        assert_eq!(to_i64_exact(&ineqs.row(0).a[0]), Some(1));
        assert_eq!(to_i64_exact(&ineqs.row(0).b), Some(0));
    }

    #[test]
    fn test_roundtrip_preserves_equality() {
        // x = y
        let mut m = Matrix::new(2);
        m.push(Row::new(vec![from_i64(1), from_i64(-1)], from_i64(0), true));
        let mut dz = Dualizer::new(CompletionSaturator::new());
        let (basis, o1) = dz.dualize_i(&m);
        assert_eq!(o1, DualizeOutcome::Ok);
        let (back, o2) = dz.dualize_h(&basis);
        assert_eq!(o2, DualizeOutcome::Ok);
        assert!(back.rows().all(|r| r.eq));
    }
}
