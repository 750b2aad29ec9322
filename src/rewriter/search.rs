//! Breadth-first search for states matching a pattern.

use std::rc::Rc;
use std::time::Instant;

use symbolic_evaluation::{Frontier, StateSet, Visited};
use tracing::info;

use super::SymbolicRewriter;
use crate::arena::StateId;
use crate::constrained::ConstrainedTerm;
use crate::error::RewriteResult;
use crate::metrics::Metrics;
use crate::options::SearchType;
use crate::term::{Substitution, Term};
use crate::unify::{pattern_match, SearchPattern};

/// States of the next layer, with their handle and transition depth.
type SearchFrontier = Frontier<Rc<ConstrainedTerm>, (StateId, usize)>;

struct SearchGoal<'a> {
  pattern: &'a SearchPattern,
  bound: Option<usize>,
  depth: Option<usize>,
  search_type: SearchType,
}

impl<'def, M: Metrics> SymbolicRewriter<'def, M> {
  /// Search the states reachable from `initial` for instances of `pattern`.
  ///
  /// Returns at most `bound` substitutions of the pattern's named variables,
  /// in discovery order. `depth` bounds the number of transitions; steps of
  /// non-transition rules are not counted. `None` leaves either unbounded.
  pub fn search(
    &mut self,
    initial: Term,
    pattern: &SearchPattern,
    bound: Option<usize>,
    depth: Option<usize>,
    search_type: SearchType,
  ) -> RewriteResult<Vec<Substitution>> {
    let start = Instant::now();
    let mut results = Vec::new();
    if bound == Some(0) {
      return Ok(results);
    }

    let initial = Rc::new(ConstrainedTerm::unconstrained(initial));
    // depth 0 only matches the pattern
    if depth == Some(0) {
      self.add_search_results(&mut results, &initial, pattern, bound)?;
      self.search_finished(start, 0, 0);
      return Ok(results);
    }

    let goal = SearchGoal {
      pattern,
      bound,
      depth: if search_type == SearchType::One { Some(1) } else { depth },
      search_type,
    };
    let mut visited: Visited<Rc<ConstrainedTerm>> = Visited::new();
    visited.insert(initial.clone());
    if search_type == SearchType::Star && self.add_search_results(&mut results, &initial, pattern, bound)? {
      self.search_finished(start, visited.len(), 0);
      return Ok(results);
    }

    let mut frontier = SearchFrontier::new();
    let id = self.insert_state((*initial).clone());
    frontier.seed(initial, (id, 0));
    let outcome = self.explore(&mut frontier, &mut visited, &mut results, &goal);
    for (_, (id, _)) in frontier.drain() {
      self.release_state(id);
    }
    let steps = outcome?;
    self.search_finished(start, visited.len(), steps);
    Ok(results)
  }

  // Process layers until the frontier empties or the bound is met. Return
  // the number of layers processed.
  fn explore(
    &mut self,
    frontier: &mut SearchFrontier,
    visited: &mut Visited<Rc<ConstrainedTerm>>,
    results: &mut Vec<Substitution>,
    goal: &SearchGoal,
  ) -> RewriteResult<usize> {
    let mut step = 0;
    loop {
      self.metrics.layer(frontier.layer_len());
      while let Some((term, (id, current_depth))) = frontier.pop() {
        self.metrics.state_visited();
        let next = self.compute_rewrite_step(id, step, false);
        self.release_state(id);
        let next = next?;
        if next.successors.is_empty()
          && goal.search_type == SearchType::Final
          && self.add_search_results(results, &term, goal.pattern, goal.bound)?
        {
          return Ok(step);
        }

        let mut successors = next.successors.into_iter();
        while let Some(successor) = successors.next() {
          let state = self.state(successor)?.clone();
          if !next.transition {
            // housekeeping neither branches nor deepens
            self.enqueue(frontier, state, successor, current_depth);
            break;
          }

          let next_depth = current_depth + 1;
          if goal.depth != Some(next_depth) && visited.insert(state.clone()) {
            self.enqueue(frontier, state.clone(), successor, next_depth);
          } else {
            self.release_state(successor);
          }
          if (goal.search_type != SearchType::Final || goal.depth == Some(next_depth))
            && self.add_search_results(results, &state, goal.pattern, goal.bound)?
          {
            for rest in successors {
              self.release_state(rest);
            }
            return Ok(step);
          }
        }
        for rest in successors {
          self.release_state(rest);
        }
      }

      step += 1;
      if !frontier.advance() {
        return Ok(step);
      }
    }
  }

  fn enqueue(&mut self, frontier: &mut SearchFrontier, state: Rc<ConstrainedTerm>, id: StateId, depth: usize) {
    if let Some((displaced, _)) = frontier.push_next(state, (id, depth)) {
      self.release_state(displaced);
    }
  }

  // Match `state` against the pattern and record the named bindings.
  // Return true iff the result bound is met.
  fn add_search_results(
    &mut self,
    results: &mut Vec<Substitution>,
    state: &ConstrainedTerm,
    pattern: &SearchPattern,
    bound: Option<usize>,
  ) -> RewriteResult<bool> {
    for substitution in pattern_match(state, pattern, &*self.oracle)? {
      results.push(
        substitution
          .into_iter()
          .filter(|(var, _)| !var.is_anonymous())
          .collect(),
      );
      if bound.map_or(false, |bound| results.len() >= bound) {
        return Ok(true);
      }
    }
    Ok(false)
  }

  fn search_finished(&mut self, start: Instant, states: usize, steps: usize) {
    let elapsed = start.elapsed();
    if self.options.statistics {
      info!(states, steps, elapsed_ms = elapsed.as_millis() as u64, "search finished");
    }
    self.metrics.finished(elapsed);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::Definition;
  use crate::metrics::Statistics;
  use crate::options::RewriterOptions;
  use crate::rule::Rule;
  use crate::solver::SyntacticOracle;
  use crate::term::{Builtin, Sort, Variable};

  fn x_cell(content: Term) -> Term {
    Term::cell("x", content)
  }

  fn counter() -> Definition {
    let n = Term::var("N", Sort::Int);
    Definition::new(vec![Rule::new(
      x_cell(n.clone()),
      x_cell(Term::builtin(Builtin::Add, vec![n, Term::int(1)])),
    )])
  }

  fn search(
    definition: &Definition,
    pattern: &SearchPattern,
    bound: Option<usize>,
    depth: Option<usize>,
    search_type: SearchType,
  ) -> Vec<Substitution> {
    let mut rewriter = SymbolicRewriter::new(definition, RewriterOptions::default()).with_oracle(SyntacticOracle);
    let results = rewriter
      .search(x_cell(Term::int(0)), pattern, bound, depth, search_type)
      .unwrap();
    assert_eq!(rewriter.live_states(), 0);
    results
  }

  #[test]
  fn star_finds_reachable_state() {
    let pattern = SearchPattern::new(x_cell(Term::int(5)));
    let results = search(&counter(), &pattern, Some(1), None, SearchType::Star);
    assert_eq!(results, vec![Substitution::new()]);
  }

  #[test]
  fn star_reaches_fifth_state_in_five_layers() {
    let definition = counter();
    let mut rewriter = SymbolicRewriter::new(&definition, RewriterOptions::default())
      .with_oracle(SyntacticOracle)
      .with_metrics(Statistics::default());
    let pattern = SearchPattern::new(x_cell(Term::int(5)));
    let results = rewriter
      .search(x_cell(Term::int(0)), &pattern, Some(1), None, SearchType::Star)
      .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(rewriter.metrics().layers, 5);
    assert_eq!(rewriter.metrics().states_visited, 5);
  }

  #[test]
  fn pattern_names_do_not_capture_initial_variables() {
    let (n, m) = (Variable::new("N", Sort::Int), Variable::new("M", Sort::Int));
    let cells = |x: Term, y: Term| Term::bag(vec![x_cell(x), Term::cell("y", y)]);
    let pattern = SearchPattern::new(cells(Term::Var(n.clone()), Term::Var(m.clone())))
      .with_condition(Term::builtin(Builtin::EqInt, vec![Term::Var(m.clone()), Term::int(7)]));
    let definition = counter();
    let mut rewriter = SymbolicRewriter::new(&definition, RewriterOptions::default()).with_oracle(SyntacticOracle);
    let results = rewriter
      .search(cells(Term::int(0), Term::Var(n.clone())), &pattern, None, Some(0), SearchType::Star)
      .unwrap();
    assert_eq!(results, vec![Substitution::from([(m, Term::int(7)), (n, Term::int(0))])]);
  }

  #[test]
  fn star_matches_initial_state_plus_does_not() {
    let n = Variable::new("N", Sort::Int);
    let pattern = SearchPattern::new(x_cell(Term::Var(n.clone())));
    let star = search(&counter(), &pattern, Some(1), None, SearchType::Star);
    assert_eq!(star, vec![Substitution::from([(n.clone(), Term::int(0))])]);
    let plus = search(&counter(), &pattern, Some(1), None, SearchType::Plus);
    assert_eq!(plus, vec![Substitution::from([(n, Term::int(1))])]);
  }

  #[test]
  fn one_step_search_stops_after_one_transition() {
    let n = Variable::new("N", Sort::Int);
    let pattern = SearchPattern::new(x_cell(Term::Var(n.clone())));
    let results = search(&counter(), &pattern, None, Some(7), SearchType::One);
    assert_eq!(results, vec![Substitution::from([(n, Term::int(1))])]);
  }

  #[test]
  fn final_search_reports_depth_bound_states() {
    let n = Variable::new("N", Sort::Int);
    let pattern = SearchPattern::new(x_cell(Term::Var(n.clone())));
    let results = search(&counter(), &pattern, None, Some(3), SearchType::Final);
    assert_eq!(results, vec![Substitution::from([(n, Term::int(3))])]);
  }

  #[test]
  fn depth_zero_only_matches() {
    let pattern = SearchPattern::new(x_cell(Term::int(0)));
    assert_eq!(search(&counter(), &pattern, None, Some(0), SearchType::Final).len(), 1);
    let later = SearchPattern::new(x_cell(Term::int(1)));
    assert!(search(&counter(), &later, None, Some(0), SearchType::Star).is_empty());
  }

  #[test]
  fn anonymous_variables_are_not_reported() {
    let pattern = SearchPattern::new(x_cell(Term::var("_", Sort::Int)));
    let results = search(&counter(), &pattern, Some(2), None, SearchType::Star);
    assert_eq!(results, vec![Substitution::new(), Substitution::new()]);
  }
}
