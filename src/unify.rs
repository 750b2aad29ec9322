//! Unification and matching of terms.

use std::collections::BTreeSet;

use crate::constrained::ConstrainedTerm;
use crate::constraint::Constraint;
use crate::error::EvaluationError;
use crate::fresh::FreshGenerator;
use crate::solver::ConstraintOracle;
use crate::term::{Sort, Substitution, Term, Variable};

/// One way of unifying a subject with a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unification {
  /// Conjunction of both constraints and the unifier, simplified
  pub constraint: Constraint,
  /// True iff the subject was not instantiated
  pub is_matching: bool,
}

/// Unifies a subject state with a rule pattern.
pub trait Unifier {
  /// Return every satisfiable unification of `subject` with `pattern`.
  /// The variables of the two sides are assumed disjoint.
  fn unify(
    &self,
    subject: &ConstrainedTerm,
    pattern: &ConstrainedTerm,
    oracle: &dyn ConstraintOracle,
  ) -> Result<Vec<Unification>, EvaluationError>;
}

/// Syntactic unification modulo builtin functions: a function application on
/// either side unifies with any term of a compatible sort under an equality
/// condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntacticUnifier;

impl Unifier for SyntacticUnifier {
  fn unify(
    &self,
    subject: &ConstrainedTerm,
    pattern: &ConstrainedTerm,
    oracle: &dyn ConstraintOracle,
  ) -> Result<Vec<Unification>, EvaluationError> {
    let mut state = UnificationState::new(Mode::Unify);
    if !state.unify(&subject.term, &pattern.term) {
      return Ok(Vec::new());
    }
    let mut constraint = subject.constraint.and(&pattern.constraint);
    for (var, value) in state.bindings {
      constraint.add_binding(var, value);
    }
    constraint.add_all(state.equalities);
    let constraint = constraint.simplify()?;
    if constraint.is_false() || (!constraint.atoms().is_empty() && oracle.check_unsat(&constraint)) {
      return Ok(Vec::new());
    }
    Ok(vec![Unification {
      constraint,
      is_matching: state.is_matching,
    }])
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  /// Subject variables may be instantiated
  Unify,
  /// Only pattern variables are instantiated
  Match,
}

struct UnificationState {
  mode: Mode,
  bindings: Substitution,
  equalities: Vec<Term>,
  is_matching: bool,
}

impl UnificationState {
  fn new(mode: Mode) -> Self {
    Self {
      mode,
      bindings: Substitution::new(),
      equalities: Vec::new(),
      is_matching: true,
    }
  }

  fn unify(&mut self, subject: &Term, pattern: &Term) -> bool {
    match (subject, pattern) {
      (_, Term::Var(var)) => self.bind(var, subject),
      _ if subject == pattern => true,
      _ if pattern.is_function() => self.condition(subject, pattern),
      (Term::Var(_), _) => self.narrow(subject, pattern),
      _ if subject.is_function() => self.narrow(subject, pattern),
      (Term::App(f, xs), Term::App(g, ys)) => {
        f == g && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.unify(x, y))
      }
      (Term::Cell(l, x), Term::Cell(m, y)) => l == m && self.unify(x, y),
      _ => false,
    }
  }

  fn bind(&mut self, var: &Variable, subject: &Term) -> bool {
    if let Some(existing) = self.bindings.get(var) {
      if existing == subject {
        return true;
      }
      let existing = existing.clone();
      return match self.mode {
        Mode::Unify => {
          self.equalities.push(Term::equality(existing, subject.clone()));
          true
        }
        Mode::Match => self.condition(&existing, subject),
      };
    }
    if !var.sort().accepts(subject.sort()) {
      return false;
    }
    self.bindings.insert(var.clone(), subject.clone());
    true
  }

  // A symbolic subject position against pattern structure.
  fn narrow(&mut self, subject: &Term, pattern: &Term) -> bool {
    match self.mode {
      Mode::Unify if subject.sort().compatible(pattern.sort()) => {
        self.is_matching = false;
        self.equalities.push(Term::equality(subject.clone(), pattern.clone()));
        true
      }
      Mode::Unify => false,
      Mode::Match => self.condition(subject, pattern),
    }
  }

  // An arithmetic or boolean condition between the two sides.
  fn condition(&mut self, subject: &Term, pattern: &Term) -> bool {
    if !subject.sort().compatible(pattern.sort()) {
      return false;
    }
    let decidable = [subject.sort(), pattern.sort()]
      .iter()
      .any(|sort| matches!(sort, Sort::Int | Sort::Bool));
    if self.mode == Mode::Match && !decidable {
      return false;
    }
    self.equalities.push(Term::equality(subject.clone(), pattern.clone()));
    true
  }
}

/// One-way matching: instantiate only the variables of `pattern`.
///
/// Return the matching substitution and the conditions it leaves on
/// integer and boolean positions, already instantiated.
pub(crate) fn match_term(subject: &Term, pattern: &Term) -> Option<(Substitution, Vec<Term>)> {
  let mut state = UnificationState::new(Mode::Match);
  if !state.unify(subject, pattern) {
    return None;
  }
  let obligations = state
    .equalities
    .iter()
    .map(|condition| condition.substitute(&state.bindings))
    .collect();
  Some((state.bindings, obligations))
}

/// A goal of a search: a term with side conditions on its variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
  pub term: Term,
  pub condition: Vec<Term>,
}

impl SearchPattern {
  pub fn new(term: Term) -> Self {
    Self {
      term,
      condition: Vec::new(),
    }
  }

  pub fn with_condition(mut self, condition: Term) -> Self {
    self.condition.push(condition);
    self
  }
}

/// Match a state against a search pattern.
///
/// Return the substitutions of the pattern's term variables under which the
/// state's constraint and the pattern's condition are jointly satisfiable.
/// Pattern variables never denote state variables of the same name.
pub fn pattern_match(
  state: &ConstrainedTerm,
  pattern: &SearchPattern,
  oracle: &dyn ConstraintOracle,
) -> Result<Vec<Substitution>, EvaluationError> {
  let (matching, obligations) = match match_term(&state.term, &pattern.term) {
    Some(result) => result,
    None => return Ok(Vec::new()),
  };

  // pattern variables left unbound by matching are existential
  let vars = pattern.term.variables();
  let unbound: BTreeSet<Variable> = vars
    .iter()
    .cloned()
    .chain(pattern.condition.iter().flat_map(Term::variables))
    .filter(|var| !matching.contains_key(var))
    .collect();
  let mut instantiation = FreshGenerator::avoiding(&state.variables()).renaming(&unbound);
  instantiation.extend(matching.iter().map(|(var, value)| (var.clone(), value.clone())));

  let mut constraint = state.constraint.clone();
  constraint.add_all(obligations.iter().map(|obligation| obligation.substitute(&instantiation)));
  constraint.add_all(pattern.condition.iter().map(|condition| condition.substitute(&instantiation)));
  let constraint = constraint.simplify()?;
  if constraint.is_false() || (!constraint.atoms().is_empty() && oracle.check_unsat(&constraint)) {
    return Ok(Vec::new());
  }

  let mut result = Substitution::new();
  for (var, value) in matching {
    if vars.contains(&var) {
      let value = value.substitute_and_evaluate(constraint.substitution())?;
      result.insert(var, value);
    }
  }
  Ok(vec![result])
}

/// Syntactic compatibility: return false only if no instance of `left` can
/// be equal to an instance of `right`. Variables and builtin functions are
/// compatible with any term of a compatible sort.
pub fn matchable(left: &Term, right: &Term) -> bool {
  match (left, right) {
    _ if left == right => true,
    (Term::Var(_), _) | (_, Term::Var(_)) => left.sort().compatible(right.sort()),
    _ if left.is_function() || right.is_function() => left.sort().compatible(right.sort()),
    (Term::App(f, xs), Term::App(g, ys)) => {
      f == g && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| matchable(x, y))
    }
    (Term::Cell(l, x), Term::Cell(m, y)) => l == m && matchable(x, y),
    _ => false,
  }
}
