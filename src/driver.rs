//! `InvariantDriver`: the top-level invariant-discovery control flow.
//!
//! Runs the generic Datalog evaluator twice — once forward, once on a
//! backward-transformed rule set — to discover per-predicate invariants,
//! then rewrites the original rule set to carry them as extra body
//! conjuncts.

use crate::config::InvariantConfig;
use crate::datalog::{Atom, Evaluator, Identity, Literal, Program, Rule, RuleTransform, Term};
use crate::emitter::emit_formula;
use crate::error::{InvariantError, InvariantResult};
use crate::expr::Expr;
use crate::model::ModelConverter;
use crate::plugin::KarrPlugin;
use crate::relation::KarrRelation;
use crate::saturator::HilbertBasisSaturator;
use rustc_hash::FxHashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The result of [`InvariantDriver::run`]: the annotated rule set, the
/// discovered per-predicate invariants, and a [`ModelConverter`] ready to
/// graft them onto a post-solve model.
#[derive(Debug, Clone)]
pub struct AnnotatedProgram {
    /// The rewritten rule set (step 5), with the loop-counter transform
    /// reverted (step 6).
    pub program: Program,
    /// Per-predicate invariants discovered during the forward/backward
    /// passes, keyed by predicate name.
    pub invariants: FxHashMap<String, Expr>,
    /// Ready to register with the outer solver for post-solve grafting.
    pub model_converter: ModelConverter,
}

/// Runs the eight-step invariant-discovery control flow. Generic over the
/// [`HilbertBasisSaturator`] backing the karr domain so an external,
/// faster saturator can be substituted without touching this module.
pub struct InvariantDriver<S: HilbertBasisSaturator + Default> {
    config: InvariantConfig,
    cancel: Arc<AtomicBool>,
    loop_counter_transform: Box<dyn RuleTransform>,
    loop_counter_revert: Box<dyn RuleTransform>,
    backward_transform: Box<dyn RuleTransform>,
    _saturator: PhantomData<S>,
}

impl<S: HilbertBasisSaturator + Default> InvariantDriver<S> {
    /// A driver with identity stand-ins for the three external rule
    /// transforms. Callers supply the real loop-counter and
    /// backward-rule transforms via the `with_*` setters.
    pub fn new(config: InvariantConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            loop_counter_transform: Box::new(Identity),
            loop_counter_revert: Box::new(Identity),
            backward_transform: Box::new(Identity),
            _saturator: PhantomData,
        }
    }

    /// Installs the loop-counter transform (step 2).
    pub fn with_loop_counter_transform(mut self, t: impl RuleTransform + 'static) -> Self {
        self.loop_counter_transform = Box::new(t);
        self
    }

    /// Installs the loop-counter transform's inverse (step 6).
    pub fn with_loop_counter_revert(mut self, t: impl RuleTransform + 'static) -> Self {
        self.loop_counter_revert = Box::new(t);
        self
    }

    /// Installs the backward-rule transform (step 4).
    pub fn with_backward_transform(mut self, t: impl RuleTransform + 'static) -> Self {
        self.backward_transform = Box::new(t);
        self
    }

    /// A handle the caller can flip from another thread to cancel a run
    /// in progress.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Runs the full control flow. `enabled: false` in the driver's
    /// config makes this a no-op returning the rule set unchanged.
    pub fn run(&self, program: &Program) -> InvariantResult<AnnotatedProgram> {
        if !self.config.enabled {
            return Ok(AnnotatedProgram {
                program: program.clone(),
                invariants: FxHashMap::default(),
                model_converter: ModelConverter::new(FxHashMap::default()),
            });
        }
        if self.is_cancelled() {
            return Err(InvariantError::Cancelled);
        }
        // Step 1: refuse negation.
        if !program.negation_free() {
            tracing::warn!("invariant discovery refused: negated literal in rule set");
            return Err(InvariantError::UnsupportedInput(
                "rule set contains a negated uninterpreted atom".into(),
            ));
        }

        // Step 2: loop-counter transform.
        let src_loop = self.loop_counter_transform.apply(program);

        let plugin = KarrPlugin::<S>::new(S::default());
        plugin.set_cancel(Arc::clone(&self.cancel));

        // Step 3: forward pass.
        tracing::info!(
            predicates = src_loop.predicate_arities().len(),
            "invariant discovery: forward pass"
        );
        let mut invariants = FxHashMap::default();
        let forward = self.run_pass(&src_loop, &plugin)?;
        merge_into(&mut invariants, forward);

        if self.is_cancelled() {
            return Err(InvariantError::Cancelled);
        }

        // Step 4: backward pass, strengthening the forward invariants.
        let backward_program = self.backward_transform.apply(&src_loop);
        tracing::info!(
            predicates = backward_program.predicate_arities().len(),
            "invariant discovery: backward pass"
        );
        let backward = self.run_pass(&backward_program, &plugin)?;
        merge_into(&mut invariants, backward);

        if self.is_cancelled() {
            return Err(InvariantError::Cancelled);
        }

        // Step 5: rewrite src_loop's rules with the discovered invariants.
        let annotated_loop_rules = annotate_rules(&src_loop, &invariants);

        // Step 6: revert the loop-counter transform.
        let final_program = self.loop_counter_revert.apply(&Program {
            rules: annotated_loop_rules,
        });

        // Step 7: a ModelConverter ready for post-solve grafting.
        let model_converter = ModelConverter::new(invariants.clone());

        Ok(AnnotatedProgram {
            program: final_program,
            invariants,
            model_converter,
        })
    }

    fn run_pass(
        &self,
        program: &Program,
        plugin: &KarrPlugin<S>,
    ) -> InvariantResult<FxHashMap<String, Expr>> {
        let mut evaluator: Evaluator<KarrRelation<S>> = Evaluator::new(plugin.clone());
        evaluator.set_cancel(Arc::clone(&self.cancel));
        let relations = evaluator.evaluate(program)?;
        let mut formulas = FxHashMap::default();
        for (predicate, mut relation) in relations {
            let formula = if relation.is_empty() {
                Expr::fls()
            } else {
                emit_formula(relation.get_ineqs())
            };
            formulas.insert(predicate, formula);
        }
        Ok(formulas)
    }
}

/// Conjoins every formula of `pass` into `invariants`, strengthening
/// whatever was already recorded for that predicate.
fn merge_into(invariants: &mut FxHashMap<String, Expr>, pass: FxHashMap<String, Expr>) {
    for (predicate, formula) in pass {
        invariants
            .entry(predicate)
            .and_modify(|existing| *existing = Expr::conjunction([existing.clone(), formula.clone()]))
            .or_insert(formula);
    }
}

/// For each rule, appends one `Interpreted` literal per positive body atom
/// whose predicate has a recorded invariant.
fn annotate_rules(program: &Program, invariants: &FxHashMap<String, Expr>) -> Vec<Rule> {
    program
        .rules
        .iter()
        .map(|rule| {
            let mut extra = Vec::new();
            for lit in &rule.body {
                if let Literal::Positive(atom) = lit {
                    if let Some(inv) = invariants.get(&atom.predicate) {
                        let (formula, vars) = instantiate_invariant(inv, atom);
                        extra.push(Literal::Interpreted(formula, vars));
                    }
                }
            }
            let mut body = rule.body.clone();
            body.extend(extra);
            Rule {
                head: rule.head.clone(),
                body,
            }
        })
        .collect()
}

/// Substitutes `inv`'s column `i` with `atom.terms[i]` (a constant becomes
/// an integer literal; a variable becomes a fresh positional reference)
/// via [`Expr::substitute`]. Returns the substituted formula together
/// with the variable names an enclosing `Interpreted` literal must carry,
/// positionally.
fn instantiate_invariant(inv: &Expr, atom: &Atom) -> (Expr, Vec<String>) {
    let mut subst = Vec::with_capacity(atom.terms.len());
    let mut vars = Vec::new();
    for term in &atom.terms {
        match term {
            Term::Const(n) => subst.push(Expr::int(*n)),
            Term::Var(v) => {
                subst.push(Expr::var(vars.len()));
                vars.push(v.clone());
            }
        }
    }
    (inv.substitute(&subst), vars)
}
