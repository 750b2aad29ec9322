mod common;

use common::*;
use symbolic_rewrite::metrics::Statistics;
use symbolic_rewrite::term::Builtin;
use symbolic_rewrite::{
  ConstrainedTerm, Constraint, Definition, ResidualReason, RewriterOptions, Rule, SymbolicRewriter, Term,
};

fn looping(frame: &str) -> Term {
  Term::kseq(vec![Term::constant("loop")], Some(k_var(frame)))
}

// <k> loop ~> K0 </k> <n> N0 </n> with N0 >= 0 reaches <k> K0 </k> <n> 0 </n>
fn countdown_claim() -> (ConstrainedTerm, ConstrainedTerm, Rule) {
  let n = int_var("N0");
  let invariant = op(Builtin::Ge, n.clone(), Term::int(0));
  let from = countdown_config(looping("K0"), n);
  let to = countdown_config(k_var("K0").into(), Term::int(0));
  let lemma = Rule::new(from.clone(), to.clone()).requires(invariant.clone());
  (
    ConstrainedTerm::new(from, Constraint::from_atoms([invariant])),
    ConstrainedTerm::unconstrained(to),
    lemma,
  )
}

fn prover(definition: &Definition) -> SymbolicRewriter<'_, Statistics> {
  SymbolicRewriter::new(definition, RewriterOptions::default()).with_metrics(Statistics::default())
}

#[test]
fn countdown_claim_holds_with_itself_as_lemma() {
  let definition = countdown();
  let (initial, target, lemma) = countdown_claim();
  let mut rewriter = prover(&definition);
  let residuals = rewriter.prove(initial, &target, &[lemma]).unwrap();
  assert!(residuals.is_empty(), "unexpected residuals {:?}", residuals);
  assert_eq!(rewriter.live_states(), 0);

  let stats = rewriter.metrics();
  assert_eq!(stats.layers, 3);
  assert!(stats.states_visited >= 4);
}

#[test]
fn unreachable_target_leaves_a_stuck_residual() {
  let definition = countdown();
  let initial = countdown_config(Term::kseq(vec![Term::constant("loop")], None), Term::int(2));
  let target = countdown_config(Term::dot_k(), Term::int(1));
  let residuals = prover(&definition)
    .prove(ConstrainedTerm::unconstrained(initial), &ConstrainedTerm::unconstrained(target), &[])
    .unwrap();
  assert_eq!(residuals.len(), 1);
  assert_eq!(residuals[0].reason, ResidualReason::Stuck);
  assert_eq!(residuals[0].state.term, countdown_config(Term::dot_k(), Term::int(0)));
}

#[test]
fn shared_frame_is_reported_as_converged() {
  let definition = countdown();
  let initial = countdown_config(looping("K0"), Term::int(2));
  let target = countdown_config(k_var("K0").into(), Term::int(1));
  let residuals = prover(&definition)
    .prove(ConstrainedTerm::unconstrained(initial), &ConstrainedTerm::unconstrained(target), &[])
    .unwrap();
  assert_eq!(residuals.len(), 1);
  assert_eq!(residuals[0].reason, ResidualReason::Converged);
  assert_eq!(residuals[0].state.term, countdown_config(k_var("K0").into(), Term::int(0)));
}

#[test]
fn symbolic_branches_are_pruned_by_the_solver() {
  let definition = countdown();
  let n = int_var("N0");
  // N0 is pinned to 0, so only the stopping rule can apply
  let initial = ConstrainedTerm::new(
    countdown_config(looping("K0"), n.clone()),
    Constraint::from_atoms([op(Builtin::Le, n.clone(), Term::int(0)), op(Builtin::Ge, n, Term::int(0))]),
  );
  let target = ConstrainedTerm::unconstrained(countdown_config(k_var("K0").into(), Term::int(0)));
  let residuals = prover(&definition).prove(initial, &target, &[]).unwrap();
  assert!(residuals.is_empty(), "unexpected residuals {:?}", residuals);
}
