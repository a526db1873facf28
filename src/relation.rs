//! `KarrRelation`: the dual-representation abstract value carried by each
//! predicate during the fixed-point computation.
//!
//! A relation keeps both forms (`ineqs`, `basis`) plus a validity flag
//! per form; an operator mutates whichever form it naturally works in and
//! invalidates the other. `get_ineqs`/`get_basis` materialise the stale
//! form on demand via a shared [`Dualizer`].

use crate::dualizer::{DualizeOutcome, Dualizer};
use crate::expr::Expr;
use crate::matrix::{Matrix, Row};
use crate::parser::parse_conjunction;
use crate::rational::from_i64;
use crate::saturator::HilbertBasisSaturator;
use std::cell::RefCell;
use std::rc::Rc;

/// A relation over `n` integer-valued columns, represented lazily as
/// either a constraint matrix or a generator/basis matrix.
pub struct KarrRelation<S: HilbertBasisSaturator> {
    width: usize,
    ineqs: Matrix,
    ineqs_valid: bool,
    basis: Matrix,
    basis_valid: bool,
    /// `true` once either form has proven the relation has no solutions.
    empty: bool,
    dualizer: Rc<RefCell<Dualizer<S>>>,
}

impl<S: HilbertBasisSaturator> KarrRelation<S> {
    /// The unconstrained ("top") relation of the given width.
    pub fn mk_full(width: usize, dualizer: Rc<RefCell<Dualizer<S>>>) -> Self {
        Self {
            width,
            ineqs: Matrix::new(width),
            ineqs_valid: true,
            basis: Matrix::new(width),
            basis_valid: false,
            empty: false,
            dualizer,
        }
    }

    /// The empty ("bottom") relation of the given width.
    pub fn mk_empty(width: usize, dualizer: Rc<RefCell<Dualizer<S>>>) -> Self {
        let mut r = Self::mk_full(width, dualizer);
        r.empty = true;
        r
    }

    /// Width (number of columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// `true` if this relation has no solutions.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Pins every column to an exact value.
    pub fn add_fact(&mut self, values: &[i64]) {
        assert_eq!(values.len(), self.width, "add_fact: width mismatch");
        let mut m = Matrix::new(self.width);
        for (col, v) in values.iter().enumerate() {
            let mut a = vec![from_i64(0); self.width];
            a[col] = from_i64(1);
            m.push(Row::new(a, from_i64(-v), true));
        }
        self.ineqs = m;
        self.ineqs_valid = true;
        self.basis_valid = false;
        self.empty = false;
    }

    /// Materialises constraint form, dualizing from basis form if stale.
    pub fn get_ineqs(&mut self) -> &Matrix {
        if !self.ineqs_valid && !self.empty {
            if self.basis.is_empty() {
                // No basis information at all: top.
                self.ineqs = Matrix::new(self.width);
            } else {
                let (ineqs, outcome) = self.dualizer.borrow_mut().dualize_h(&self.basis);
                match outcome {
                    DualizeOutcome::Ok => self.ineqs = ineqs,
                    DualizeOutcome::Infeasible => {
                        self.empty = true;
                        self.ineqs = Matrix::new(self.width);
                    }
                    DualizeOutcome::Undef => self.ineqs = Matrix::new(self.width),
                }
            }
            self.ineqs_valid = true;
        }
        &self.ineqs
    }

    /// Materialises basis form, dualizing from constraint form if stale.
    pub fn get_basis(&mut self) -> &Matrix {
        if !self.basis_valid && !self.empty {
            let (basis, outcome) = self.dualizer.borrow_mut().dualize_i(&self.ineqs);
            match outcome {
                DualizeOutcome::Ok => self.basis = basis,
                DualizeOutcome::Infeasible => {
                    self.empty = true;
                    self.basis = Matrix::new(self.width);
                }
                DualizeOutcome::Undef => self.basis = Matrix::new(self.width),
            }
            self.basis_valid = true;
        }
        &self.basis
    }

    /// Cheap clone sharing the same dualizer.
    pub fn clone_relation(&self) -> Self {
        Self {
            width: self.width,
            ineqs: self.ineqs.clone(),
            ineqs_valid: self.ineqs_valid,
            basis: self.basis.clone(),
            basis_valid: self.basis_valid,
            empty: self.empty,
            dualizer: Rc::clone(&self.dualizer),
        }
    }

    /// Relational join: concatenates columns, zero-padding each operand's
    /// rows over the other's columns.
    pub fn mk_join(&mut self, other: &mut Self) -> Self {
        let width = self.width + other.width;
        if self.empty || other.empty {
            return Self::mk_empty(width, Rc::clone(&self.dualizer));
        }
        let mut out = Matrix::new(width);
        for row in self.get_ineqs().rows() {
            let mut a = row.a.clone();
            a.extend(std::iter::repeat(from_i64(0)).take(other.width));
            out.push(Row::new(a, row.b.clone(), row.eq));
        }
        for row in other.get_ineqs().rows() {
            let mut a = vec![from_i64(0); self.width];
            a.extend(row.a.iter().cloned());
            out.push(Row::new(a, row.b.clone(), row.eq));
        }
        Self {
            width,
            ineqs: out,
            ineqs_valid: true,
            basis: Matrix::new(width),
            basis_valid: false,
            empty: false,
            dualizer: Rc::clone(&self.dualizer),
        }
    }

    /// Projects onto `keep` (column indices, in the order they should
    /// appear in the result), by dropping the other entries of every
    /// basis row.
    pub fn mk_project(&mut self, keep: &[usize]) -> Self {
        let new_width = keep.len();
        if self.empty {
            return Self::mk_empty(new_width, Rc::clone(&self.dualizer));
        }
        let mut out = Matrix::new(new_width);
        for row in self.get_basis().rows() {
            let a = keep.iter().map(|&c| row.a[c].clone()).collect();
            out.push(Row::new(a, row.b.clone(), row.eq));
        }
        if self.empty {
            return Self::mk_empty(new_width, Rc::clone(&self.dualizer));
        }
        Self {
            width: new_width,
            ineqs: Matrix::new(new_width),
            ineqs_valid: false,
            basis: out,
            basis_valid: true,
            empty: false,
            dualizer: Rc::clone(&self.dualizer),
        }
    }

    /// Permutes columns: result column `i` holds source column `perm[i]`.
    /// Works on whichever form is currently valid, renaming both if both
    /// are valid.
    pub fn mk_rename(&mut self, perm: &[usize]) -> Self {
        assert_eq!(perm.len(), self.width, "mk_rename: permutation width mismatch");
        let rename_matrix = |m: &Matrix| -> Matrix {
            let mut out = Matrix::new(m.width());
            for row in m.rows() {
                let a = perm.iter().map(|&src| row.a[src].clone()).collect();
                out.push(Row::new(a, row.b.clone(), row.eq));
            }
            out
        };
        Self {
            width: self.width,
            ineqs: if self.ineqs_valid {
                rename_matrix(&self.ineqs)
            } else {
                Matrix::new(self.width)
            },
            ineqs_valid: self.ineqs_valid,
            basis: if self.basis_valid {
                rename_matrix(&self.basis)
            } else {
                Matrix::new(self.width)
            },
            basis_valid: self.basis_valid,
            empty: self.empty,
            dualizer: Rc::clone(&self.dualizer),
        }
    }

    /// Unions `other` into `self` in basis form: appends every row of
    /// `other.basis` not already present. Returns `true` if any row was
    /// actually added (drives the semi-naive fixpoint's delta signal).
    pub fn mk_union(&mut self, other: &mut Self) -> bool {
        assert_eq!(self.width, other.width, "mk_union: width mismatch");
        if other.empty {
            return false;
        }
        if self.empty {
            self.basis = other.get_basis().clone();
            self.basis_valid = true;
            self.ineqs_valid = false;
            self.empty = false;
            return self.basis.size() > 0;
        }
        let mut changed = false;
        let other_basis = other.get_basis().clone();
        self.get_basis();
        for row in other_basis.rows() {
            if !self.basis.contains_row(row) {
                self.basis.push(row.clone());
                changed = true;
            }
        }
        if changed {
            self.ineqs_valid = false;
        }
        changed
    }

    /// Adds `x_i = x_j` to constraint form.
    pub fn filter_identical(&mut self, i: usize, j: usize) {
        let mut a = vec![from_i64(0); self.width];
        a[i] = from_i64(1);
        a[j] = from_i64(-1);
        self.push_ineq(Row::new(a, from_i64(0), true));
    }

    /// Adds `x_i = value` to constraint form.
    pub fn filter_equal(&mut self, i: usize, value: i64) {
        let mut a = vec![from_i64(0); self.width];
        a[i] = from_i64(1);
        self.push_ineq(Row::new(a, from_i64(-value), true));
    }

    /// Parses `formula` as a conjunction of linear (in)equalities over
    /// this relation's columns and appends the recognised rows to
    /// constraint form. Atoms the parser does not recognise are dropped,
    /// never rejected.
    pub fn filter_interpreted(&mut self, formula: &Expr) {
        let parsed = parse_conjunction(formula, self.width);
        for row in parsed.rows() {
            self.push_ineq(row.clone());
        }
    }

    fn push_ineq(&mut self, row: Row) {
        if !self.ineqs_valid {
            self.get_ineqs();
        }
        self.ineqs.push(row);
        self.ineqs_valid = true;
        self.basis_valid = false;
    }
}

// `AbstractDomain` is implemented for `KarrRelation` in `plugin.rs`,
// alongside `KarrPlugin` (its `Factory`).
