//! Benchmarks for the karr-relation fixed-point computation.
//!
//! Run with: cargo bench --bench karr_fixpoint

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use karr_invariants::saturator::CompletionSaturator;
use karr_invariants::{Atom, Expr, InvariantConfig, InvariantDriver, Literal, Program, Rule, Term};

fn counter_program(depth: usize) -> Program {
    let mut program = Program::new();
    program.add_rule(Rule::fact(Atom::new("p", vec![Term::Const(0)])));
    for _ in 0..depth {
        program.add_rule(Rule {
            head: Atom::new("p", vec![Term::Var("y".into())]),
            body: vec![
                Literal::Positive(Atom::new("p", vec![Term::Var("x".into())])),
                Literal::Interpreted(
                    Expr::var(0).add(Expr::int(1)).eq_to(Expr::var(1)),
                    vec!["x".into(), "y".into()],
                ),
            ],
        });
    }
    program
}

fn bench_counter_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("invariant_discovery");
    for rule_count in [1, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(rule_count),
            rule_count,
            |b, &rule_count| {
                let program = counter_program(rule_count);
                b.iter(|| {
                    let driver: InvariantDriver<CompletionSaturator> =
                        InvariantDriver::new(InvariantConfig::default());
                    black_box(driver.run(&program).expect("discovery should succeed"))
                })
            },
        );
    }
    group.finish();
}

fn bench_join_chain(c: &mut Criterion) {
    use karr_invariants::KarrRelation;
    use karr_invariants::dualizer::Dualizer;
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut group = c.benchmark_group("relation_operations");
    for width in [2, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            b.iter(|| {
                let dualizer = Rc::new(RefCell::new(Dualizer::new(CompletionSaturator::new())));
                let mut acc = KarrRelation::mk_full(1, Rc::clone(&dualizer));
                acc.add_fact(&[0]);
                for i in 1..width {
                    let mut next = KarrRelation::mk_full(1, Rc::clone(&dualizer));
                    next.add_fact(&[i as i64]);
                    acc = black_box(acc.mk_join(&mut next));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_counter_discovery, bench_join_chain);
criterion_main!(benches);
