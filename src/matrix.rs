//! Matrix: a plain container of linear-constraint rows.
//!
//! Operations: reset, append(other), size, row access, pretty-print. No
//! algebraic logic here; it is a plain value container.

use crate::rational::Rational;
use std::fmt;

/// One row of a [`Matrix`]: `A·x + b ⋈ 0`, where `⋈` is `=` if `eq` is
/// true, else `≥`.
#[derive(Clone, Debug)]
pub struct Row {
    /// Coefficient vector, width equal to the owning matrix's width.
    pub a: Vec<Rational>,
    /// Constant term.
    pub b: Rational,
    /// `true` for an equality row, `false` for a `≥` inequality row.
    pub eq: bool,
}

impl Row {
    /// Builds a new row. Panics if `a.len()` doesn't match what the
    /// caller intends for the owning matrix's width — callers are
    /// expected to build rows at the matrix's width directly.
    pub fn new(a: Vec<Rational>, b: Rational, eq: bool) -> Self {
        Self { a, b, eq }
    }

    /// Width of this row (number of columns).
    pub fn width(&self) -> usize {
        self.a.len()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.eq == other.eq && self.b == other.b && self.a == other.a
    }
}
impl Eq for Row {}

/// An ordered sequence of rows sharing a common width.
#[derive(Clone, Debug, Default)]
pub struct Matrix {
    width: usize,
    rows: Vec<Row>,
}

impl Matrix {
    /// An empty matrix (no constraints) of the given width.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: Vec::new(),
        }
    }

    /// Width (number of columns) shared by every row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Drops all rows, keeping the width.
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    /// Appends a row. Panics on width mismatch — constructing a
    /// mismatched row is always a caller bug, never a soundness event.
    pub fn push(&mut self, row: Row) {
        assert_eq!(
            row.width(),
            self.width,
            "row width {} does not match matrix width {}",
            row.width(),
            self.width
        );
        self.rows.push(row);
    }

    /// Appends every row of `other`. Panics on width mismatch.
    pub fn append(&mut self, other: &Matrix) {
        assert_eq!(other.width, self.width, "matrix width mismatch in append");
        self.rows.extend(other.rows.iter().cloned());
    }

    /// Number of rows.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// `true` if there are no rows (the unconstrained/"top" matrix).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row access.
    pub fn row(&self, i: usize) -> &Row {
        &self.rows[i]
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// `true` if `row` already occurs (componentwise) in this matrix;
    /// used by `mk_union`'s duplicate check.
    pub fn contains_row(&self, row: &Row) -> bool {
        self.rows.iter().any(|r| r == row)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(f, "<no constraints, width {}>", self.width);
        }
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for (j, c) in row.a.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, "] + {} {} 0", row.b, if row.eq { "=" } else { ">=" })?;
        }
        Ok(())
    }
}
