//! Rendering of driver results for the command line.

use std::collections::BTreeSet;

use itertools::Itertools;
use num::ToPrimitive;
use tracing::warn;

use crate::constrained::ConstrainedTerm;
use crate::error::{RewriteError, RewriteResult};
use crate::solver::ConstraintOracle;
use crate::term::{Sort, Substitution, Term};
use crate::unify::{pattern_match, SearchPattern};

/// Solutions are only meaningful when exactly one matched.
pub const EXIT_AMBIGUOUS_SOLUTIONS: i32 = 112;
/// The one solution must bind exactly one distinct integer.
pub const EXIT_AMBIGUOUS_INTEGERS: i32 = 111;

pub fn render_substitution(substitution: &Substitution) -> String {
  if substitution.is_empty() {
    return "  (empty substitution)".to_string();
  }
  format!(
    "{}",
    substitution
      .iter()
      .map(|(var, value)| format!("  {} |-> {}", var, value))
      .format("\n")
  )
}

/// Render search results as numbered solutions, deduplicated and ordered by
/// their rendering.
pub fn render_search_results(results: &[Substitution]) -> String {
  let mut out = String::from("Search results:\n\n");
  if results.is_empty() {
    out.push_str("No search results\n");
    return out;
  }
  let solutions: BTreeSet<String> = results.iter().map(render_substitution).collect();
  for (i, solution) in solutions.iter().enumerate() {
    out.push_str(&format!("Solution {}:\n{}\n", i + 1, solution));
  }
  out
}

/// Extract a process exit code by matching a final state against `pattern`.
///
/// Return [`EXIT_AMBIGUOUS_SOLUTIONS`] unless exactly one substitution
/// matches and [`EXIT_AMBIGUOUS_INTEGERS`] unless it binds exactly one
/// distinct integer.
pub fn exit_code(state: &ConstrainedTerm, pattern: &SearchPattern, oracle: &dyn ConstraintOracle) -> RewriteResult<i32> {
  let solutions = pattern_match(state, pattern, oracle)?;
  let solution = match &solutions[..] {
    [solution] => solution,
    _ => {
      warn!(
        solutions = solutions.len(),
        "Found {} solutions to exit code pattern. Returning {}.",
        solutions.len(),
        EXIT_AMBIGUOUS_SOLUTIONS
      );
      return Ok(EXIT_AMBIGUOUS_SOLUTIONS);
    }
  };

  let integers: BTreeSet<_> = solution
    .iter()
    .filter(|(var, _)| var.sort() == Sort::Int)
    .filter_map(|(_, value)| match value {
      Term::Int(n) => Some(n),
      _ => None,
    })
    .collect();
  // the iterator borrows `solutions`; it must drop before the return
  #[allow(clippy::let_and_return)]
  let code = match integers.into_iter().exactly_one() {
    Ok(n) => n.to_i32().ok_or_else(|| RewriteError::ExitCodeOutOfRange(n.to_string())),
    Err(integers) => {
      let found = integers.count();
      warn!(
        "Found {} integer variables in exit code pattern. Returning {}.",
        found, EXIT_AMBIGUOUS_INTEGERS
      );
      Ok(EXIT_AMBIGUOUS_INTEGERS)
    }
  };
  code
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::solver::SyntacticOracle;
  use crate::term::Variable;

  #[test]
  fn empty_results() {
    assert_eq!(render_search_results(&[]), "Search results:\n\nNo search results\n");
  }

  #[test]
  fn solutions_are_sorted_by_rendering() {
    let n = Variable::new("N", Sort::Int);
    let results = vec![
      Substitution::from([(n.clone(), Term::int(2))]),
      Substitution::from([(n.clone(), Term::int(1))]),
      Substitution::from([(n, Term::int(2))]),
    ];
    assert_eq!(
      render_search_results(&results),
      "Search results:\n\nSolution 1:\n  N:Int |-> 1\nSolution 2:\n  N:Int |-> 2\n"
    );
  }

  #[test]
  fn exit_code_reads_the_single_integer() {
    let n = Variable::new("N", Sort::Int);
    let state = ConstrainedTerm::unconstrained(Term::cell("exit", Term::int(7)));
    let pattern = SearchPattern::new(Term::cell("exit", Term::Var(n)));
    assert_eq!(exit_code(&state, &pattern, &SyntacticOracle).unwrap(), 7);
  }

  #[test]
  fn ambiguous_exit_codes() {
    let state = ConstrainedTerm::unconstrained(Term::cell("exit", Term::int(7)));
    let unmatched = SearchPattern::new(Term::cell("status", Term::var("N", Sort::Int)));
    assert_eq!(exit_code(&state, &unmatched, &SyntacticOracle).unwrap(), EXIT_AMBIGUOUS_SOLUTIONS);
    let ground = SearchPattern::new(Term::cell("exit", Term::int(7)));
    assert_eq!(exit_code(&state, &ground, &SyntacticOracle).unwrap(), EXIT_AMBIGUOUS_INTEGERS);
  }

  #[test]
  fn exit_code_must_fit() {
    let state = ConstrainedTerm::unconstrained(Term::cell("exit", Term::Int(num::BigInt::from(1u64 << 40))));
    let pattern = SearchPattern::new(Term::cell("exit", Term::var("N", Sort::Int)));
    assert!(matches!(
      exit_code(&state, &pattern, &SyntacticOracle),
      Err(RewriteError::ExitCodeOutOfRange(_))
    ));
  }
}
