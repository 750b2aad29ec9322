//! Built-in definitions of the command line driver.

use clap::ArgEnum;
use symbolic_rewrite::rule::SourceLocation;
use symbolic_rewrite::term::{Builtin, K_CELL};
use symbolic_rewrite::{ConstrainedTerm, Constraint, Definition, Rule, SearchPattern, Sort, Term, Variable};

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoName {
  /// Sum the integers from `n` down to 1
  Counter,
  /// Flip `n` coins, one transition per flip
  Branching,
}

/// A definition with the inputs the driver needs to exercise it.
pub struct Demo {
  pub definition: Definition,
  pub transitions: Vec<&'static str>,
  pub initial: Term,
  /// What `--search` looks for
  pub pattern: SearchPattern,
  /// Binds the exit code of a final state
  pub exit_pattern: SearchPattern,
  /// Reachability claim and the lemmas `--prove` may use
  pub claim: (ConstrainedTerm, ConstrainedTerm),
  pub lemmas: Vec<Rule>,
}

impl DemoName {
  pub fn build(self, input: i64) -> Demo {
    match self {
      DemoName::Counter => counter(input),
      DemoName::Branching => branching(input),
    }
  }
}

fn int(name: &str) -> Variable {
  Variable::new(name, Sort::Int)
}

fn k(name: &str) -> Variable {
  Variable::new(name, Sort::K)
}

fn op(builtin: Builtin, x: impl Into<Term>, y: impl Into<Term>) -> Term {
  Term::builtin(builtin, vec![x.into(), y.into()])
}

fn config(computation: Term, cells: Vec<(&str, Term)>) -> Term {
  let mut bag = vec![Term::cell(K_CELL, computation)];
  bag.extend(cells.into_iter().map(|(label, content)| Term::cell(label, content)));
  Term::bag(bag)
}

fn counter_config(computation: Term, n: impl Into<Term>, sum: impl Into<Term>) -> Term {
  config(computation, vec![("n", n.into()), ("sum", sum.into())])
}

fn counter(input: i64) -> Demo {
  let loop_then = |rest: Variable| Term::kseq(vec![Term::constant("loop")], Some(rest));
  let (n, s, rest) = (int("N"), int("S"), k("Rest"));

  let step = Rule::new(
    counter_config(loop_then(rest.clone()), n.clone(), s.clone()),
    counter_config(
      loop_then(rest.clone()),
      op(Builtin::Sub, n.clone(), Term::int(1)),
      op(Builtin::Add, s.clone(), n.clone()),
    ),
  )
  .requires(op(Builtin::Gt, n.clone(), Term::int(0)))
  .labeled("step")
  .at(SourceLocation::new("counter", 1, 1))
  .compile_for_fast_rewriting();
  let stop = Rule::new(
    counter_config(loop_then(rest.clone()), n.clone(), s.clone()),
    counter_config(Term::Var(rest), n.clone(), s),
  )
  .requires(op(Builtin::Le, n, Term::int(0)))
  .labeled("stop")
  .at(SourceLocation::new("counter", 2, 1));

  // loop ~> K with N >= 0 reaches K with the counter at zero
  let (n, s, total, frame) = (int("N0"), int("S0"), int("Total"), k("K0"));
  let from = counter_config(loop_then(frame.clone()), n.clone(), s);
  let to = counter_config(Term::Var(frame), Term::int(0), total);
  let invariant = op(Builtin::Ge, n, Term::int(0));
  let lemma = Rule::new(from.clone(), to.clone())
    .requires(invariant.clone())
    .labeled("claim")
    .at(SourceLocation::new("counter.k", 1, 1));

  let result = int("Sum");
  Demo {
    definition: Definition::new(vec![step, stop]),
    transitions: Vec::new(),
    initial: counter_config(Term::kseq(vec![Term::constant("loop")], None), Term::int(input), Term::int(0)),
    pattern: SearchPattern::new(counter_config(Term::dot_k(), Term::var("_N", Sort::Int), result.clone())),
    exit_pattern: SearchPattern::new(counter_config(Term::dot_k(), Term::var("_N", Sort::Int), result)),
    claim: (
      ConstrainedTerm::new(from, Constraint::from_atoms([invariant])),
      ConstrainedTerm::unconstrained(to),
    ),
    lemmas: vec![lemma],
  }
}

fn branching(input: i64) -> Demo {
  let (n, c, rest) = (int("N"), int("C"), k("Rest"));
  let flips = |count: Term, rest: Variable| Term::kseq(vec![Term::app("flips", vec![count])], Some(rest));
  let coins = |computation: Term, value: Term| config(computation, vec![("coins", value)]);

  let unfold = Rule::new(
    coins(flips(n.clone().into(), rest.clone()), c.clone().into()),
    coins(
      Term::kseq(
        vec![Term::constant("flip"), Term::app("flips", vec![op(Builtin::Sub, n.clone(), Term::int(1))])],
        Some(rest.clone()),
      ),
      c.clone().into(),
    ),
  )
  .requires(op(Builtin::Gt, n.clone(), Term::int(0)))
  .at(SourceLocation::new("branching", 1, 1));
  let finish = Rule::new(
    coins(flips(n.clone().into(), rest.clone()), c.clone().into()),
    coins(Term::Var(rest.clone()), c.clone().into()),
  )
  .requires(op(Builtin::Le, n, Term::int(0)))
  .at(SourceLocation::new("branching", 2, 1));

  let flip = Term::kseq(vec![Term::constant("flip")], Some(rest.clone()));
  let doubled = op(Builtin::Mul, c.clone(), Term::int(2));
  let heads = Rule::new(
    coins(flip.clone(), c.clone().into()),
    coins(Term::Var(rest.clone()), doubled.clone()),
  )
  .attribute("transition")
  .at(SourceLocation::new("branching", 3, 1));
  let tails = Rule::new(
    coins(flip, c.into()),
    coins(Term::Var(rest), op(Builtin::Add, doubled, Term::int(1))),
  )
  .attribute("transition")
  .at(SourceLocation::new("branching", 4, 1));

  // flipping coins never loses the ones already flipped
  let (m, d, frame, e) = (int("M0"), int("C0"), k("K0"), int("E0"));
  let from = coins(flips(m.clone().into(), frame.clone()), d.clone().into());
  let to = coins(Term::Var(frame), e.clone().into());
  let (requires, ensures) = (
    [op(Builtin::Ge, m, Term::int(0)), op(Builtin::Ge, d, Term::int(0))],
    op(Builtin::Ge, e, Term::int(0)),
  );
  let lemma = requires
    .iter()
    .cloned()
    .fold(Rule::new(from.clone(), to.clone()), Rule::requires)
    .ensures(ensures.clone())
    .labeled("claim")
    .at(SourceLocation::new("branching.k", 1, 1));
  let claim = (
    ConstrainedTerm::new(from, Constraint::from_atoms(requires)),
    ConstrainedTerm::new(to, Constraint::from_atoms([ensures])),
  );

  let value = int("Coins");
  Demo {
    definition: Definition::new(vec![unfold, finish, heads, tails]),
    transitions: vec!["transition"],
    initial: coins(Term::kseq(vec![Term::app("flips", vec![Term::int(input)])], None), Term::int(0)),
    pattern: SearchPattern::new(coins(Term::dot_k(), value.clone().into())),
    exit_pattern: SearchPattern::new(coins(Term::dot_k(), value.into())),
    claim,
    lemmas: vec![lemma],
  }
}
