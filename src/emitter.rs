//! FormulaEmitter: renders a [`Matrix`] back to a symbolic conjunction.
//!
//! Each row `(A[i], b[i], eq_i)` becomes `Σⱼ A[i][j]·xⱼ + b[i] ⋈ 0`. Zero
//! coefficients are elided, `1` is rendered bare, `-1` as negation,
//! otherwise as `k·x`. An empty matrix maps to `true`, an empty relation
//! to `false`.

use crate::expr::Expr;
use crate::matrix::{Matrix, Row};
use crate::rational::to_i64_exact;
use num_traits::Zero;

/// Coefficients reaching the emitter are always integers: every row in
/// this crate is built either by [`crate::parser`] (whose `lin()`
/// recognizer only ever produces integer coefficients) or by
/// [`crate::dualizer`] (which feeds/reads an integer-only saturator).
fn coeff_to_i64(r: &crate::rational::Rational) -> i64 {
    to_i64_exact(r).expect("matrix coefficient reaching FormulaEmitter was non-integer")
}

fn term_for_column(coeff: i64, col: usize) -> Option<Expr> {
    match coeff {
        0 => None,
        1 => Some(Expr::var(col)),
        -1 => Some(Expr::var(col).neg()),
        k => Some(Expr::var(col).mul(Expr::int(k))),
    }
}

fn sum(terms: Vec<Expr>) -> Expr {
    let mut iter = terms.into_iter();
    let Some(first) = iter.next() else {
        return Expr::int(0);
    };
    iter.fold(first, |acc, t| acc.add(t))
}

/// Emits the single formula for one row: `0 ⋈ Σⱼ A[j]·xⱼ + b`.
pub fn emit_row(row: &Row) -> Expr {
    let mut terms: Vec<Expr> = row
        .a
        .iter()
        .enumerate()
        .filter_map(|(j, c)| term_for_column(coeff_to_i64(c), j))
        .collect();
    let b = coeff_to_i64(&row.b);
    if b != 0 {
        terms.push(Expr::int(b));
    }
    let lhs = sum(terms);
    if row.eq {
        lhs.eq_to(Expr::int(0))
    } else {
        Expr::int(0).le(lhs)
    }
}

/// Emits the conjunction for a whole matrix. An empty matrix (no rows)
/// is `true`.
pub fn emit_formula(matrix: &Matrix) -> Expr {
    if matrix.is_empty() {
        return Expr::tru();
    }
    Expr::conjunction(matrix.rows().map(emit_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use crate::rational::from_i64;

    #[test]
    fn test_empty_matrix_is_true() {
        assert_eq!(emit_formula(&Matrix::new(2)), Expr::tru());
    }

    #[test]
    fn test_unit_coefficients_rendered_bare() {
        let mut m = Matrix::new(2);
        m.push(crate::matrix::Row::new(
            vec![from_i64(1), from_i64(-1)],
            from_i64(0),
            true,
        ));
        let e = emit_row(m.row(0));
        assert_eq!(e, Expr::var(0).add(Expr::var(1).neg()).eq_to(Expr::int(0)));
    }

    #[test]
    fn test_nonunit_coefficient_rendered_as_product() {
        let mut m = Matrix::new(1);
        m.push(crate::matrix::Row::new(vec![from_i64(3)], from_i64(0), false));
        let e = emit_row(m.row(0));
        assert_eq!(e, Expr::int(0).le(Expr::var(0).mul(Expr::int(3))));
    }

    #[test]
    fn test_zero_coefficients_elided() {
        let mut m = Matrix::new(2);
        m.push(crate::matrix::Row::new(
            vec![from_i64(0), from_i64(1)],
            from_i64(-5),
            true,
        ));
        let e = emit_row(m.row(0));
        // only column 1 and the constant appear
        assert_eq!(e, Expr::var(1).add(Expr::int(-5)).eq_to(Expr::int(0)));
    }
}
