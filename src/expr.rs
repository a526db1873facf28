//! Minimal symbolic expression layer.
//!
//! `Expr` is the concrete type the parser, emitter, and driver all build
//! on: integer literals, de Bruijn variable indices, arithmetic,
//! (in)equalities, boolean connectives, and a "safe replace" substitution
//! used when instantiating a discovered invariant against a rule's atoms.

use std::fmt;
use std::rc::Rc;

/// A symbolic term or formula over integer-valued variables, referenced
/// by de Bruijn-style column index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// Boolean literal (`true`/`false`).
    Bool(bool),
    /// Integer numeral.
    Int(i64),
    /// Variable, referenced by column index.
    Var(usize),
    /// `lhs + rhs`.
    Add(Rc<Expr>, Rc<Expr>),
    /// `lhs - rhs`.
    Sub(Rc<Expr>, Rc<Expr>),
    /// `-e`.
    Neg(Rc<Expr>),
    /// `lhs * rhs` (sound only when at least one side is `Int`).
    Mul(Rc<Expr>, Rc<Expr>),
    /// `lhs = rhs`.
    Eq(Rc<Expr>, Rc<Expr>),
    /// `lhs <= rhs`.
    Le(Rc<Expr>, Rc<Expr>),
    /// `lhs < rhs`.
    Lt(Rc<Expr>, Rc<Expr>),
    /// `!e`.
    Not(Rc<Expr>),
    /// Conjunction of zero or more formulas (empty = `true`).
    And(Vec<Expr>),
    /// Disjunction of zero or more formulas (empty = `false`).
    Or(Vec<Expr>),
}

impl Expr {
    /// `true`.
    pub fn tru() -> Self {
        Expr::Bool(true)
    }

    /// `false`.
    pub fn fls() -> Self {
        Expr::Bool(false)
    }

    /// An integer literal.
    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    /// A variable at column `idx`.
    pub fn var(idx: usize) -> Self {
        Expr::Var(idx)
    }

    /// `self + other`.
    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Rc::new(self), Rc::new(other))
    }

    /// `self - other`.
    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Rc::new(self), Rc::new(other))
    }

    /// `-self`.
    pub fn neg(self) -> Self {
        Expr::Neg(Rc::new(self))
    }

    /// `self * other`.
    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Rc::new(self), Rc::new(other))
    }

    /// `self = other`.
    pub fn eq_to(self, other: Expr) -> Self {
        Expr::Eq(Rc::new(self), Rc::new(other))
    }

    /// `self <= other`.
    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Rc::new(self), Rc::new(other))
    }

    /// `self < other`.
    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Rc::new(self), Rc::new(other))
    }

    /// `!self`.
    pub fn not(self) -> Self {
        Expr::Not(Rc::new(self))
    }

    /// Conjunction, flattening nested `And` nodes and dropping bare `true`s.
    pub fn conjunction(parts: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Expr::Bool(true) => {}
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.is_empty() {
            Expr::tru()
        } else if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Expr::And(flat)
        }
    }

    /// Flatten a (possibly nested) conjunction into its top-level atoms.
    /// `true` flattens to the empty list; anything that is not an `And`
    /// is treated as a single atom.
    pub fn flatten_conjunction(&self) -> Vec<Expr> {
        match self {
            Expr::Bool(true) => vec![],
            Expr::And(parts) => parts.iter().flat_map(Expr::flatten_conjunction).collect(),
            other => vec![other.clone()],
        }
    }

    /// Substitute each `Var(i)` with `subst[i]`. Panics if a referenced
    /// index is out of range,
    /// matching the precondition that `subst` covers every variable the
    /// formula may mention (the caller builds `subst` from the atom's own
    /// argument list, so this always holds in practice).
    pub fn substitute(&self, subst: &[Expr]) -> Expr {
        match self {
            Expr::Bool(_) | Expr::Int(_) => self.clone(),
            Expr::Var(i) => subst[*i].clone(),
            Expr::Add(a, b) => a.substitute(subst).add(b.substitute(subst)),
            Expr::Sub(a, b) => a.substitute(subst).sub(b.substitute(subst)),
            Expr::Neg(a) => a.substitute(subst).neg(),
            Expr::Mul(a, b) => a.substitute(subst).mul(b.substitute(subst)),
            Expr::Eq(a, b) => a.substitute(subst).eq_to(b.substitute(subst)),
            Expr::Le(a, b) => a.substitute(subst).le(b.substitute(subst)),
            Expr::Lt(a, b) => a.substitute(subst).lt(b.substitute(subst)),
            Expr::Not(a) => a.substitute(subst).not(),
            Expr::And(parts) => Expr::And(parts.iter().map(|p| p.substitute(subst)).collect()),
            Expr::Or(parts) => Expr::Or(parts.iter().map(|p| p.substitute(subst)).collect()),
        }
    }

    /// `true` if this is a numeral, for the `lin()` recognizer and for the
    /// two-point disjunction atom shape.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Var(i) => write!(f, "x{i}"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Neg(a) => write!(f, "-{a}"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Eq(a, b) => write!(f, "{a} = {b}"),
            Expr::Le(a, b) => write!(f, "{a} <= {b}"),
            Expr::Lt(a, b) => write!(f, "{a} < {b}"),
            Expr::Not(a) => write!(f, "!({a})"),
            Expr::And(parts) => {
                if parts.is_empty() {
                    write!(f, "true")
                } else {
                    write!(
                        f,
                        "{}",
                        parts
                            .iter()
                            .map(|p| p.to_string())
                            .collect::<Vec<_>>()
                            .join(" && ")
                    )
                }
            }
            Expr::Or(parts) => write!(
                f,
                "{}",
                parts
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(" || ")
            ),
        }
    }
}
