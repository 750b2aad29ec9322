//! Coinductive reachability proofs.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use symbolic_evaluation::{StateSet, Visited, Worklist};
use tracing::{debug, info};

use super::SymbolicRewriter;
use crate::arena::StateId;
use crate::constrained::ConstrainedTerm;
use crate::error::{RewriteError, RewriteResult};
use crate::metrics::{Metrics, Phase};
use crate::rule::Rule;
use crate::term::{Term, Variable, K_CELL};
use crate::unify::matchable;

/// Why a state was left unproved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualReason {
  /// No rule applies and the state does not imply the target
  Stuck,
  /// The computation converged to the shape of the target without
  /// implying it
  Converged,
}

impl fmt::Display for ResidualReason {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ResidualReason::Stuck => write!(f, "stuck"),
      ResidualReason::Converged => write!(f, "converged"),
    }
  }
}

/// An unproved proof obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residual {
  pub state: ConstrainedTerm,
  pub reason: ResidualReason,
}

impl fmt::Display for Residual {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}: {}", self.reason, self.state)
  }
}

struct ProofGoal<'a> {
  target: &'a ConstrainedTerm,
  lemmas: &'a [Rule],
  /// Variables of the initial claim, the only ones successors keep bindings for
  claim_variables: BTreeSet<Variable>,
}

impl<'def, M: Metrics> SymbolicRewriter<'def, M> {
  /// Prove that every state reachable from `initial` eventually implies
  /// `target`.
  ///
  /// From the second layer on, a state matching the left-hand side of a
  /// lemma is rewritten by the lemma instead of the definition. Return the
  /// unproved residuals; an empty list proves the claim.
  pub fn prove(
    &mut self,
    initial: ConstrainedTerm,
    target: &ConstrainedTerm,
    lemmas: &[Rule],
  ) -> RewriteResult<Vec<Residual>> {
    let start = Instant::now();
    let lemmas: Vec<Rule> = lemmas.iter().map(|lemma| lemma.renamed(&mut self.fresh)).collect();
    let initial = initial.expand_patterns()?;
    let goal = ProofGoal {
      target,
      lemmas: &lemmas,
      claim_variables: initial.variables(),
    };

    let mut residuals = Vec::new();
    let mut visited: Visited<ConstrainedTerm> = Visited::new();
    let mut worklist = Worklist::new();
    visited.insert(initial.clone());
    worklist.seed(self.insert_state(initial));
    let outcome = self.prove_layers(&mut worklist, &mut visited, &mut residuals, &goal);
    for id in worklist.drain() {
      self.release_state(id);
    }
    let steps = outcome?;

    let elapsed = start.elapsed();
    if self.options.statistics {
      info!(
        states = visited.len(),
        steps,
        residuals = residuals.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "proof finished"
      );
    }
    self.metrics.finished(elapsed);
    Ok(residuals)
  }

  fn prove_layers(
    &mut self,
    worklist: &mut Worklist<StateId>,
    visited: &mut Visited<ConstrainedTerm>,
    residuals: &mut Vec<Residual>,
    goal: &ProofGoal,
  ) -> RewriteResult<usize> {
    let mut guarded = false;
    let mut step = 0;
    while worklist.advance() {
      step += 1;
      self.metrics.layer(worklist.layer_len());
      debug!(step, states = worklist.layer_len(), residuals = residuals.len(), "proof layer");
      while let Some(id) = worklist.pop() {
        self.metrics.state_visited();
        let outcome = self.prove_state(id, step, guarded, worklist, visited, residuals, goal);
        self.release_state(id);
        outcome?;
      }
      guarded = true;
    }
    Ok(step)
  }

  #[allow(clippy::too_many_arguments)]
  fn prove_state(
    &mut self,
    id: StateId,
    step: usize,
    guarded: bool,
    worklist: &mut Worklist<StateId>,
    visited: &mut Visited<ConstrainedTerm>,
    residuals: &mut Vec<Residual>,
    goal: &ProofGoal,
  ) -> RewriteResult<()> {
    let state = self.state(id)?.clone();
    let timer = Instant::now();
    let implied = state.implies(goal.target, &*self.oracle);
    self.metrics.phase(Phase::Implies, timer.elapsed());
    if implied? {
      return Ok(());
    }

    if converges(&state.term, &goal.target.term) {
      residuals.push(Residual {
        state: (*state).clone(),
        reason: ResidualReason::Converged,
      });
      return Ok(());
    }

    if guarded {
      let timer = Instant::now();
      let result = self.apply_lemmas(&state, goal.lemmas);
      self.metrics.phase(Phase::ApplyLemmas, timer.elapsed());
      if let Some(result) = result? {
        if visited.insert(result.clone()) {
          worklist.push_next(self.insert_state(result));
        }
        return Ok(());
      }
    }

    let timer = Instant::now();
    let next = self.compute_rewrite_step(id, step, false);
    self.metrics.phase(Phase::RewriteStep, timer.elapsed());
    let next = next?;
    if next.successors.is_empty() {
      residuals.push(Residual {
        state: (*state).clone(),
        reason: ResidualReason::Stuck,
      });
      return Ok(());
    }

    for successor in next.successors {
      let successor = match self.release_state(successor) {
        Some(successor) => Rc::try_unwrap(successor).unwrap_or_else(|shared| (*shared).clone()),
        None => continue,
      };
      // rule-local bindings do not survive the step
      let result = ConstrainedTerm::new(successor.term, successor.constraint.restrict(&goal.claim_variables));
      if visited.insert(result.clone()) {
        worklist.push_next(self.insert_state(result));
      }
    }
    Ok(())
  }

  // Rewrite with the first lemma whose left-hand side `state` implies.
  fn apply_lemmas(&mut self, state: &ConstrainedTerm, lemmas: &[Rule]) -> RewriteResult<Option<ConstrainedTerm>> {
    for lemma in lemmas {
      let annotate = |source| RewriteError::RuleEvaluation {
        location: lemma.location.clone(),
        source,
      };
      let pattern = lemma.build_pattern();
      if let Some(constraint) = state.match_implies(&pattern, &*self.oracle).map_err(annotate)? {
        return self.build_result(lemma, constraint, None, true).map_err(annotate);
      }
    }
    Ok(None)
  }
}

// True iff both terms have one computation cell, the cells end in the same
// frame variable and their contents could be made equal.
fn converges(state: &Term, target: &Term) -> bool {
  let (left, right) = match (&state.cell_contents(K_CELL)[..], &target.cell_contents(K_CELL)[..]) {
    ([left], [right]) => (left.split_content_and_frame(), right.split_content_and_frame()),
    _ => return false,
  };
  match (left, right) {
    ((left, Some(l)), (right, Some(r))) if l == r => matchable(&left, &right),
    _ => false,
  }
}
