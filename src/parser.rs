//! ConstraintParser: recognises linear (in)equalities in symbolic form
//! and emits [`Matrix`] rows.
//!
//! Atoms not recognised are silently ignored — a sound overapproximation,
//! never an error.

use crate::expr::Expr;
use crate::matrix::{Matrix, Row};
use crate::rational::{from_i64, Rational};
use num_traits::Zero;

/// Recognises `e` as a linear term with the given `sign`, accumulating
/// into `row`/`b`. Returns `false` (leaving `row`/`b` partially updated)
/// if `e` is not recognised as linear-integer — callers always discard
/// the accumulator on `false`.
fn lin(e: &Expr, sign: i64, row: &mut [Rational], b: &mut Rational) -> bool {
    match e {
        Expr::Var(i) => {
            if *i >= row.len() {
                return false;
            }
            row[*i] += from_i64(sign);
            true
        }
        Expr::Int(n) => {
            *b += from_i64(sign * n);
            true
        }
        Expr::Add(l, r) => lin(l, sign, row, b) && lin(r, sign, row, b),
        Expr::Sub(l, r) => lin(l, sign, row, b) && lin(r, -sign, row, b),
        Expr::Neg(inner) => lin(inner, -sign, row, b),
        Expr::Mul(l, r) => {
            if let Some(n) = l.as_int() {
                lin(r, sign * n, row, b)
            } else if let Some(n) = r.as_int() {
                lin(l, sign * n, row, b)
            } else {
                false
            }
        }
        _ => false,
    }
}

/// Builds a row of `width` columns from a sum of signed linear subterms,
/// returning `None` if any subterm fails [`lin`].
fn linear_row(parts: &[(&Expr, i64)], width: usize) -> Option<(Vec<Rational>, Rational)> {
    let mut row = vec![Rational::zero(); width];
    let mut b = Rational::zero();
    for (e, sign) in parts {
        if !lin(e, *sign, &mut row, &mut b) {
            return None;
        }
    }
    Some((row, b))
}

/// `e1 <= e2`, i.e. `e2 - e1 >= 0`. `tighten` subtracts one more from `b`
/// for the strict (`<`) case (integer tightening).
fn le_row(e1: &Expr, e2: &Expr, tighten: bool, width: usize) -> Option<Row> {
    let (row, mut b) = linear_row(&[(e1, -1), (e2, 1)], width)?;
    if tighten {
        b -= from_i64(1);
    }
    Some(Row::new(row, b, false))
}

fn eq_row(e1: &Expr, e2: &Expr, width: usize) -> Option<Row> {
    let (row, b) = linear_row(&[(e1, 1), (e2, -1)], width)?;
    Some(Row::new(row, b, true))
}

/// Tries the two-point-disjunction atom shape: `(v = n1) || (v = n2)` with
/// the same variable and integer constants, emitting the convex hull
/// `v >= min(n1,n2) && v <= max(n1,n2)`.
fn disjunction_hull(parts: &[Expr], width: usize) -> Option<Vec<Row>> {
    if parts.len() != 2 {
        return None;
    }
    let points: Option<Vec<(usize, i64)>> = parts
        .iter()
        .map(|p| match p {
            Expr::Eq(l, r) => match (&**l, &**r) {
                (Expr::Var(i), Expr::Int(n)) => Some((*i, *n)),
                (Expr::Int(n), Expr::Var(i)) => Some((*i, *n)),
                _ => None,
            },
            _ => None,
        })
        .collect();
    let points = points?;
    let (v0, n0) = points[0];
    let (v1, n1) = points[1];
    if v0 != v1 || v0 >= width {
        return None;
    }
    let lo = n0.min(n1);
    let hi = n0.max(n1);
    let mut ge = vec![Rational::zero(); width];
    ge[v0] = from_i64(1);
    let ge_row = Row::new(ge.clone(), from_i64(-lo), false); // v - lo >= 0
    let mut le = vec![Rational::zero(); width];
    le[v0] = from_i64(-1);
    let le_row = Row::new(le, from_i64(hi), false); // -v + hi >= 0
    Some(vec![ge_row, le_row])
}

/// Classifies a single atom (not itself a conjunction) into zero or more
/// matrix rows. Returns `None` for an unrecognised atom.
fn classify_atom(e: &Expr, width: usize) -> Option<Vec<Row>> {
    match e {
        Expr::Eq(l, r) => eq_row(l, r, width).map(|row| vec![row]),
        Expr::Le(l, r) => le_row(l, r, false, width).map(|row| vec![row]),
        Expr::Lt(l, r) => le_row(l, r, true, width).map(|row| vec![row]),
        // ¬(e2 < e1) and ¬(e1 > e2) ≡ e1 <= e2. Since this crate has no
        // separate `Gt` node, "e1 > e2" is already written as `Lt(e2, e1)`,
        // so both shapes collapse to `Not(Lt(e2, e1))`.
        Expr::Not(inner) => match &**inner {
            Expr::Lt(e2, e1) => le_row(e1, e2, false, width).map(|row| vec![row]),
            // ¬(e2 <= e1) and ¬(e1 >= e2) ≡ e1 < e2, similarly collapsed to
            // `Not(Le(e2, e1))`.
            Expr::Le(e2, e1) => le_row(e1, e2, true, width).map(|row| vec![row]),
            _ => None,
        },
        Expr::Or(parts) => disjunction_hull(parts, width),
        _ => None,
    }
}

/// Parses a (possibly nested) conjunction of atoms into a [`Matrix`] of
/// the given width. Unrecognised atoms are dropped silently.
pub fn parse_conjunction(formula: &Expr, width: usize) -> Matrix {
    let mut matrix = Matrix::new(width);
    for atom in formula.flatten_conjunction() {
        if let Some(rows) = classify_atom(&atom, width) {
            for row in rows {
                matrix.push(row);
            }
        } else {
            tracing::trace!(atom = %atom, "constraint parser: unrecognised atom, dropped");
        }
    }
    matrix
}
