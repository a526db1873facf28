//! `KarrPlugin`: factory for empty/full karr relations, and the glue that
//! lets [`crate::datalog::Evaluator`] drive [`KarrRelation`] as its
//! abstract domain.
//!
//! `Evaluator` is generic over the [`AbstractDomain`] trait, so "only this
//! plugin's kind of relation is accepted" is structural: Rust's type
//! system rejects mixing domains at compile time. `KarrPlugin` itself
//! reduces to the shared construction context (`Factory`) the trait impl
//! below threads through every value it builds, plus `mk_empty`/`mk_full`
//! convenience constructors.

use crate::datalog::AbstractDomain;
use crate::dualizer::Dualizer;
use crate::relation::KarrRelation;
use crate::saturator::HilbertBasisSaturator;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Factory for [`KarrRelation`] values, bundling the dualizer every
/// relation produced through it will share. This is `KarrRelation::Factory`.
pub struct KarrPlugin<S: HilbertBasisSaturator> {
    dualizer: Rc<RefCell<Dualizer<S>>>,
}

impl<S: HilbertBasisSaturator> KarrPlugin<S> {
    /// Wraps a fresh saturator instance in a plugin.
    pub fn new(saturator: S) -> Self {
        Self {
            dualizer: Rc::new(RefCell::new(Dualizer::new(saturator))),
        }
    }

    /// Installs a cancellation flag, forwarded to the shared dualizer.
    pub fn set_cancel(&self, cancel: Arc<AtomicBool>) {
        self.dualizer.borrow_mut().set_cancel(cancel);
    }

    /// The empty relation of the given width.
    pub fn mk_empty(&self, width: usize) -> KarrRelation<S> {
        KarrRelation::mk_empty(width, Rc::clone(&self.dualizer))
    }

    /// The unconstrained relation of the given width.
    pub fn mk_full(&self, width: usize) -> KarrRelation<S> {
        KarrRelation::mk_full(width, Rc::clone(&self.dualizer))
    }
}

impl<S: HilbertBasisSaturator> Clone for KarrPlugin<S> {
    fn clone(&self) -> Self {
        Self {
            dualizer: Rc::clone(&self.dualizer),
        }
    }
}

impl<S: HilbertBasisSaturator> AbstractDomain for KarrRelation<S> {
    type Factory = KarrPlugin<S>;

    fn mk_full(width: usize, factory: &Self::Factory) -> Self {
        factory.mk_full(width)
    }

    fn mk_empty(width: usize, factory: &Self::Factory) -> Self {
        factory.mk_empty(width)
    }

    fn domain_width(&self) -> usize {
        self.width()
    }

    fn domain_is_empty(&self) -> bool {
        self.is_empty()
    }

    fn domain_clone(&self) -> Self {
        self.clone_relation()
    }

    fn domain_join(&mut self, other: &mut Self) -> Self {
        self.mk_join(other)
    }

    fn domain_project(&mut self, keep: &[usize]) -> Self {
        self.mk_project(keep)
    }

    fn domain_rename(&mut self, perm: &[usize]) -> Self {
        self.mk_rename(perm)
    }

    fn domain_union(&mut self, other: &mut Self) -> bool {
        self.mk_union(other)
    }

    fn domain_filter_identical(&mut self, i: usize, j: usize) {
        self.filter_identical(i, j)
    }

    fn domain_filter_equal(&mut self, i: usize, value: i64) {
        self.filter_equal(i, value)
    }

    fn domain_filter_interpreted(&mut self, formula: &crate::expr::Expr) {
        self.filter_interpreted(formula)
    }
}
