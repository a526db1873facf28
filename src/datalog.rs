//! A generalized Datalog AST and bottom-up semi-naive evaluator.
//!
//! Rule bodies are evaluated by joining/filtering/projecting/renaming the
//! abstract values of the atoms they mention, rather than by unifying
//! concrete facts, so the same evaluator drives both ordinary concrete
//! Datalog (with a trivial boolean domain) and karr-relation invariant
//! computation, generic over [`AbstractDomain`].

use crate::error::{InvariantError, InvariantResult};
use crate::expr::Expr;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A term in a rule: either a variable (by name) or an integer constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A variable, identified by name within the enclosing rule.
    Var(String),
    /// An integer constant.
    Const(i64),
}

/// `predicate(terms...)`.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Predicate name.
    pub predicate: String,
    /// Argument terms, positional. Inline-stored up to arity 4; most
    /// predicates in practice have small arity.
    pub terms: SmallVec<[Term; 4]>,
}

impl Atom {
    /// A new atom.
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms: SmallVec::from_vec(terms),
        }
    }

    fn arity(&self) -> usize {
        self.terms.len()
    }
}

/// A body literal: an atom, or an atom's negation, or an interpreted
/// (built-in) constraint over already-bound variables.
#[derive(Debug, Clone)]
pub enum Literal {
    /// A positive occurrence of a predicate atom.
    Positive(Atom),
    /// A negated occurrence — refused by [`negation_free`] unless the
    /// atom is itself interpreted.
    Negative(Atom),
    /// A side constraint expressed symbolically over the rule's
    /// variables, e.g. `x' = x+1`.
    Interpreted(Expr, Vec<String>),
}

/// `head :- body`.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule's single head atom.
    pub head: Atom,
    /// The rule's body literals.
    pub body: Vec<Literal>,
}

impl Rule {
    /// A fact (empty body).
    pub fn fact(head: Atom) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }

    /// `true` if every variable in the head, and in every negative
    /// literal, also occurs in some positive body literal — the standard
    /// Datalog range restriction.
    pub fn is_safe(&self) -> bool {
        let mut bound = std::collections::HashSet::new();
        for lit in &self.body {
            if let Literal::Positive(atom) = lit {
                for t in &atom.terms {
                    if let Term::Var(v) = t {
                        bound.insert(v.clone());
                    }
                }
            }
        }
        let vars_of = |atom: &Atom| {
            atom.terms.iter().filter_map(|t| match t {
                Term::Var(v) => Some(v.clone()),
                Term::Const(_) => None,
            })
        };
        if vars_of(&self.head).any(|v| !bound.contains(&v)) {
            return false;
        }
        for lit in &self.body {
            if let Literal::Negative(atom) = lit {
                if vars_of(atom).any(|v| !bound.contains(&v)) {
                    return false;
                }
            }
        }
        true
    }
}

/// A full rule set.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// All rules, in source order.
    pub rules: Vec<Rule>,
}

impl Program {
    /// An empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Predicate names mentioned anywhere, each mapped to its arity (the
    /// first occurrence wins; mismatches are a caller bug, not checked
    /// here since the abstract domain driver validates widths itself).
    pub fn predicate_arities(&self) -> FxHashMap<String, usize> {
        let mut arities = FxHashMap::default();
        for rule in &self.rules {
            arities
                .entry(rule.head.predicate.clone())
                .or_insert_with(|| rule.head.arity());
            for lit in &rule.body {
                if let Literal::Positive(a) | Literal::Negative(a) = lit {
                    arities.entry(a.predicate.clone()).or_insert_with(|| a.arity());
                }
            }
        }
        arities
    }

    /// `true` if no rule contains a negative literal over a user
    /// predicate. [`crate::driver::InvariantDriver`] refuses negated
    /// input outright rather than reasoning about it.
    pub fn negation_free(&self) -> bool {
        self.rules
            .iter()
            .all(|r| r.body.iter().all(|l| !matches!(l, Literal::Negative(_))))
    }
}

/// A hook letting a driver rewrite the program before/after evaluation —
/// used for the loop-counter and backward-rule transforms. The identity
/// transform is the default; [`crate::driver::InvariantDriver`] supplies
/// the real ones.
pub trait RuleTransform {
    /// Rewrites the program, returning the transformed version.
    fn apply(&self, program: &Program) -> Program;
}

/// The identity transform.
pub struct Identity;
impl RuleTransform for Identity {
    fn apply(&self, program: &Program) -> Program {
        program.clone()
    }
}

/// The abstract domain the generic evaluator drives. A relation is a set
/// of tuples over its own fixed `width`, possibly represented only
/// approximately (over-approximately) by the domain.
pub trait AbstractDomain: Sized {
    /// Construction context (e.g. a shared dualizer) threaded through
    /// every value the evaluator creates.
    type Factory: Clone;

    /// The unconstrained ("top") value of the given width.
    fn mk_full(width: usize, factory: &Self::Factory) -> Self;
    /// The empty ("bottom") value of the given width.
    fn mk_empty(width: usize, factory: &Self::Factory) -> Self;
    /// Width (number of columns).
    fn domain_width(&self) -> usize;
    /// `true` if this value has no solutions.
    fn domain_is_empty(&self) -> bool;
    /// A cheap, independent copy.
    fn domain_clone(&self) -> Self;
    /// Relational join: concatenates `self`'s and `other`'s columns.
    fn domain_join(&mut self, other: &mut Self) -> Self;
    /// Projects onto `keep` (column indices, in order).
    fn domain_project(&mut self, keep: &[usize]) -> Self;
    /// Permutes columns: result column `i` holds source column `perm[i]`.
    fn domain_rename(&mut self, perm: &[usize]) -> Self;
    /// Unions `other` into `self`; `true` if anything changed.
    fn domain_union(&mut self, other: &mut Self) -> bool;
    /// Constrains `x_i = x_j`.
    fn domain_filter_identical(&mut self, i: usize, j: usize);
    /// Constrains `x_i = value`.
    fn domain_filter_equal(&mut self, i: usize, value: i64);
    /// Constrains by an arbitrary symbolic formula over this value's
    /// columns.
    fn domain_filter_interpreted(&mut self, formula: &Expr);
}

const MAX_ITERATIONS: usize = 10_000;

/// Drives a [`Program`] to its abstract fixed point over `D`.
pub struct Evaluator<D: AbstractDomain> {
    factory: D::Factory,
    cancel: Option<Arc<AtomicBool>>,
}

impl<D: AbstractDomain> Evaluator<D> {
    /// A new evaluator using `factory` to build fresh domain values.
    pub fn new(factory: D::Factory) -> Self {
        Self {
            factory,
            cancel: None,
        }
    }

    /// Installs a cooperative cancellation flag, polled once per
    /// iteration.
    pub fn set_cancel(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = Some(cancel);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Runs `program` to its fixed point, returning each predicate's
    /// final abstract relation, keyed by predicate name.
    pub fn evaluate(&mut self, program: &Program) -> InvariantResult<FxHashMap<String, D>> {
        let arities = program.predicate_arities();
        let mut relations: FxHashMap<String, D> = arities
            .iter()
            .map(|(name, &width)| (name.clone(), D::mk_empty(width, &self.factory)))
            .collect();

        for rule in &program.rules {
            if rule.body.is_empty() {
                self.apply_fact(&mut relations, rule)?;
            }
        }

        let mut iteration = 0;
        loop {
            if self.is_cancelled() {
                return Err(InvariantError::Cancelled);
            }
            iteration += 1;
            if iteration > MAX_ITERATIONS {
                return Err(InvariantError::UnsupportedInput(format!(
                    "fixed point did not converge within {MAX_ITERATIONS} iterations"
                )));
            }
            let mut changed = false;
            for rule in &program.rules {
                if rule.body.is_empty() {
                    continue;
                }
                let mut delta = self.evaluate_body(&relations, rule)?;
                let head_width = rule.head.arity();
                let entry = relations
                    .entry(rule.head.predicate.clone())
                    .or_insert_with(|| D::mk_empty(head_width, &self.factory));
                if entry.domain_union(&mut delta) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        Ok(relations)
    }

    fn apply_fact(&self, relations: &mut FxHashMap<String, D>, rule: &Rule) -> InvariantResult<()> {
        let values: Vec<i64> = rule
            .head
            .terms
            .iter()
            .map(|t| match t {
                Term::Const(n) => Ok(*n),
                Term::Var(_) => Err(InvariantError::UnsupportedInput(
                    "fact head must be fully ground".into(),
                )),
            })
            .collect::<InvariantResult<_>>()?;
        let width = values.len();
        let mut value = D::mk_full(width, &self.factory);
        for (col, v) in values.iter().enumerate() {
            value.domain_filter_equal(col, *v);
        }
        let entry = relations
            .entry(rule.head.predicate.clone())
            .or_insert_with(|| D::mk_empty(width, &self.factory));
        entry.domain_union(&mut value);
        Ok(())
    }

    /// Evaluates one rule's body against the current relations, joining
    /// positive literals left to right, applying interpreted filters
    /// immediately after every literal whose variables they complete,
    /// and finally projecting/renaming onto the head's argument order.
    fn evaluate_body(&self, relations: &FxHashMap<String, D>, rule: &Rule) -> InvariantResult<D> {
        let mut var_cols: FxHashMap<String, usize> = FxHashMap::default();
        let mut current: Option<D> = None;

        for lit in &rule.body {
            match lit {
                Literal::Positive(atom) => {
                    let width = atom.arity();
                    let rel = relations
                        .get(&atom.predicate)
                        .map(|r| r.domain_clone())
                        .unwrap_or_else(|| D::mk_empty(width, &self.factory));
                    let base_cols = current.as_ref().map(|r| r.domain_width()).unwrap_or(0);
                    let mut joined = match current.take() {
                        None => rel,
                        Some(mut acc) => {
                            let mut rel = rel;
                            acc.domain_join(&mut rel)
                        }
                    };
                    for (i, term) in atom.terms.iter().enumerate() {
                        let col = base_cols + i;
                        match term {
                            Term::Var(v) => {
                                if let Some(&existing) = var_cols.get(v) {
                                    joined.domain_filter_identical(existing, col);
                                } else {
                                    var_cols.insert(v.clone(), col);
                                }
                            }
                            Term::Const(n) => joined.domain_filter_equal(col, *n),
                        }
                    }
                    current = Some(joined);
                }
                Literal::Negative(_) => {
                    return Err(InvariantError::UnsupportedInput(
                        "negated literals are not supported".into(),
                    ));
                }
                Literal::Interpreted(formula, vars) => {
                    // `formula`'s `Var(k)` refers to `vars[k]` by
                    // position. A variable not yet bound by an earlier
                    // positive literal (e.g. the fresh head variable in
                    // `p(x+1) :- p(x)`, desugared to `p(y) :- p(x), y =
                    // x+1`) gets a fresh top-valued column joined in now.
                    let mut rel = current.take().unwrap_or_else(|| D::mk_full(0, &self.factory));
                    let mut subst = Vec::with_capacity(vars.len());
                    for v in vars {
                        let col = if let Some(&c) = var_cols.get(v) {
                            c
                        } else {
                            let base = rel.domain_width();
                            let mut fresh = D::mk_full(1, &self.factory);
                            rel = rel.domain_join(&mut fresh);
                            var_cols.insert(v.clone(), base);
                            base
                        };
                        subst.push(Expr::var(col));
                    }
                    rel.domain_filter_interpreted(&formula.substitute(&subst));
                    current = Some(rel);
                }
            }
        }

        let mut rel = current.unwrap_or_else(|| D::mk_full(0, &self.factory));
        let keep: Vec<usize> = rule
            .head
            .terms
            .iter()
            .map(|t| match t {
                Term::Var(v) => *var_cols.get(v).expect("is_safe() guarantees head vars are bound"),
                Term::Const(_) => unreachable!("rule heads with constants are desugared to facts"),
            })
            .collect();
        Ok(rel.domain_project(&keep))
    }
}
