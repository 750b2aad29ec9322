//! Definitions shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use symbolic_rewrite::constrained::ConstrainedTerm;
use symbolic_rewrite::error::EvaluationError;
use symbolic_rewrite::solver::ConstraintOracle;
use symbolic_rewrite::term::{Builtin, K_CELL};
use symbolic_rewrite::unify::{SyntacticUnifier, Unification, Unifier};
use symbolic_rewrite::{Definition, Rule, Sort, Term, Variable};

pub fn int_var(name: &str) -> Variable {
  Variable::new(name, Sort::Int)
}

pub fn k_var(name: &str) -> Variable {
  Variable::new(name, Sort::K)
}

pub fn op(builtin: Builtin, x: impl Into<Term>, y: impl Into<Term>) -> Term {
  Term::builtin(builtin, vec![x.into(), y.into()])
}

/// `<x> N </x> => <x> N +Int 1 </x>`
pub fn counter() -> Definition {
  let n = int_var("N");
  Definition::new(vec![Rule::new(
    Term::cell("x", n.clone().into()),
    Term::cell("x", op(Builtin::Add, n, Term::int(1))),
  )
  .compile_for_fast_rewriting()])
}

pub fn countdown_config(computation: Term, n: impl Into<Term>) -> Term {
  Term::bag(vec![Term::cell(K_CELL, computation), Term::cell("n", n.into())])
}

/// `loop` decrements the `n` cell until it reaches zero.
pub fn countdown() -> Definition {
  let (n, rest) = (int_var("N"), k_var("Rest"));
  let looping = Term::kseq(vec![Term::constant("loop")], Some(rest.clone()));
  Definition::new(vec![
    Rule::new(
      countdown_config(looping.clone(), n.clone()),
      countdown_config(looping.clone(), op(Builtin::Sub, n.clone(), Term::int(1))),
    )
    .requires(op(Builtin::Gt, n.clone(), Term::int(0))),
    Rule::new(
      countdown_config(looping, n.clone()),
      countdown_config(rest.into(), n.clone()),
    )
    .requires(op(Builtin::Le, n, Term::int(0))),
  ])
}

pub fn coins_config(computation: Term, coins: impl Into<Term>) -> Term {
  Term::bag(vec![Term::cell(K_CELL, computation), Term::cell("coins", coins.into())])
}

pub fn flips(n: i64) -> Term {
  coins_config(Term::kseq(vec![Term::app("flips", vec![Term::int(n)])], None), Term::int(0))
}

/// `flips(N)` unfolds into `N` coin flips, each a transition tagged
/// `transition` that appends one bit to the `coins` cell.
pub fn branching() -> Definition {
  let (n, c, rest) = (int_var("N"), int_var("C"), k_var("Rest"));
  let pending = |count: Term| Term::kseq(vec![Term::app("flips", vec![count])], Some(rest.clone()));
  let flip = Term::kseq(vec![Term::constant("flip")], Some(rest.clone()));
  let doubled = op(Builtin::Mul, c.clone(), Term::int(2));
  Definition::new(vec![
    Rule::new(
      coins_config(pending(n.clone().into()), c.clone()),
      coins_config(
        Term::kseq(
          vec![Term::constant("flip"), Term::app("flips", vec![op(Builtin::Sub, n.clone(), Term::int(1))])],
          Some(rest.clone()),
        ),
        c.clone(),
      ),
    )
    .requires(op(Builtin::Gt, n.clone(), Term::int(0))),
    Rule::new(
      coins_config(pending(n.clone().into()), c.clone()),
      coins_config(rest.clone().into(), c.clone()),
    )
    .requires(op(Builtin::Le, n, Term::int(0))),
    Rule::new(coins_config(flip.clone(), c.clone()), coins_config(rest.clone().into(), doubled.clone()))
      .attribute("transition"),
    Rule::new(
      coins_config(flip, c),
      coins_config(rest.into(), op(Builtin::Add, doubled, Term::int(1))),
    )
    .attribute("transition"),
  ])
}

// <a> 0 </a> <b> _ </b> => <a> 1 </a> ... reads and writes only `a`;
// <a> _ </a> <b> N </b> => ... <b> N +Int 1 </b> reads and writes only `b`.
pub fn two_cells() -> (Definition, Term) {
  let cells = |a: Term, b: Term| Term::bag(vec![Term::cell("a", a), Term::cell("b", b)]);
  let (x, y, n) = (int_var("_X"), int_var("_Y"), int_var("N"));
  let set_a = Rule::new(cells(Term::int(0), x.clone().into()), cells(Term::int(1), x.into())).compile_for_fast_rewriting();
  let bump_b = Rule::new(
    cells(y.clone().into(), n.clone().into()),
    cells(y.into(), op(Builtin::Add, n, Term::int(1))),
  )
  .compile_for_fast_rewriting();
  assert!(set_a.is_compiled() && bump_b.is_compiled());
  let set_a_lhs = set_a.lhs.clone();
  (Definition::new(vec![set_a, bump_b]), set_a_lhs)
}

pub fn two_cells_state(a: i64, b: i64) -> ConstrainedTerm {
  ConstrainedTerm::unconstrained(Term::bag(vec![
    Term::cell("a", Term::int(a)),
    Term::cell("b", Term::int(b)),
  ]))
}

pub fn three_cells_config(a: Term, b: Term, c: Term) -> Term {
  Term::bag(vec![Term::cell("a", a), Term::cell("b", b), Term::cell("c", c)])
}

pub fn three_cells_state(a: i64, b: i64, c: i64) -> ConstrainedTerm {
  ConstrainedTerm::unconstrained(three_cells_config(Term::int(a), Term::int(b), Term::int(c)))
}

/// `check_a` needs `<a> 1 </a>` and `check_b` needs `<b> 1 </b>`; `bump_c`
/// always applies. Each one reads and writes only its own cell.
pub fn three_cell_rules() -> Vec<Rule> {
  let any = |name: &str| -> Term { int_var(name).into() };
  let n = int_var("N");
  vec![
    Rule::new(
      three_cells_config(Term::int(1), any("_B"), any("_C")),
      three_cells_config(Term::int(2), any("_B"), any("_C")),
    )
    .labeled("check_a"),
    Rule::new(
      three_cells_config(any("_A"), Term::int(1), any("_C")),
      three_cells_config(any("_A"), Term::int(2), any("_C")),
    )
    .labeled("check_b"),
    Rule::new(
      three_cells_config(any("_A"), any("_B"), n.clone().into()),
      three_cells_config(any("_A"), any("_B"), op(Builtin::Add, n, Term::int(1))),
    )
    .labeled("bump_c"),
  ]
}

/// Records the left-hand side of every rule it is asked to unify with.
#[derive(Debug, Clone, Default)]
pub struct RecordingUnifier {
  pub patterns: Rc<RefCell<Vec<Term>>>,
}

impl RecordingUnifier {
  pub fn attempts(&self, pattern: &Term) -> usize {
    self.patterns.borrow().iter().filter(|p| *p == pattern).count()
  }
}

impl Unifier for RecordingUnifier {
  fn unify(
    &self,
    subject: &ConstrainedTerm,
    pattern: &ConstrainedTerm,
    oracle: &dyn ConstraintOracle,
  ) -> Result<Vec<Unification>, EvaluationError> {
    self.patterns.borrow_mut().push(pattern.term.clone());
    SyntacticUnifier.unify(subject, pattern, oracle)
  }
}
