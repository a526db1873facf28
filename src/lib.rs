//! Karr-relation abstract domain for discovering linear arithmetic
//! invariants of recursively defined predicates (Horn clauses / Datalog
//! rules over integer tuples).
//!
//! The engine generalises Karr's method to a fixed-point computation
//! driven by a generic bottom-up Datalog evaluator ([`datalog::Evaluator`])
//! over an abstract domain ([`datalog::AbstractDomain`]) rather than
//! concrete fact sets. The domain itself ([`relation::KarrRelation`]) keeps
//! a relation in two dual representations — a constraint matrix and an
//! integer affine generator/basis set — converting between them lazily via
//! an integer Hilbert-basis saturator ([`saturator::HilbertBasisSaturator`])
//! wrapped by [`dualizer::Dualizer`].
//!
//! [`driver::InvariantDriver`] is the entry point: it runs a forward and a
//! backward pass over a rule set, emits each predicate's discovered
//! invariant as a symbolic formula, and rewrites the rule set to carry
//! those invariants as extra body conjuncts. [`model::ModelConverter`]
//! grafts the same invariants onto a solved model's predicate
//! interpretations after the fact.
//!
//! Does not discover non-linear invariants, does not guarantee the
//! tightest invariant for a given rule set, does not guarantee
//! termination on pathological inputs (only sound degradation to "top"),
//! and refuses negated uninterpreted atoms outright rather than reasoning
//! about them.

#![deny(unsafe_code)]

pub mod config;
pub mod datalog;
pub mod driver;
pub mod dualizer;
pub mod emitter;
pub mod error;
pub mod expr;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod plugin;
pub mod rational;
pub mod relation;
pub mod saturator;

pub use config::InvariantConfig;
pub use datalog::{AbstractDomain, Atom, Evaluator, Literal, Program, Rule, RuleTransform, Term};
pub use driver::{AnnotatedProgram, InvariantDriver};
pub use error::{InvariantError, InvariantResult};
pub use expr::Expr;
pub use model::{ModelConverter, PredicateInterpretation};
pub use plugin::KarrPlugin;
pub use relation::KarrRelation;
pub use saturator::{CompletionSaturator, HilbertBasisSaturator};
