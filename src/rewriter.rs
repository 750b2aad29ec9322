//! The symbolic rewrite engine.
//!
//! One parameterized one-step relation ([`SymbolicRewriter::compute_rewrite_step`])
//! shared by three drivers: [`SymbolicRewriter::execute`], `search` and
//! `prove`. The drivers own their termination and bookkeeping; strategy
//! order and the disabled-rule cache live in the step function only.

mod prove;
mod search;

pub use prove::{Residual, ResidualReason};

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::arena::{StateArena, StateId};
use crate::audit::{NoAudit, RuleAudit};
use crate::constrained::ConstrainedTerm;
use crate::constraint::Constraint;
use crate::error::{EvaluationError, RewriteError, RewriteResult};
use crate::fresh::FreshGenerator;
use crate::index::Definition;
use crate::metrics::{Metrics, NoMetrics};
use crate::options::RewriterOptions;
use crate::rule::{Rule, RuleId};
use crate::solver::{ConstraintOracle, Z3Oracle};
use crate::strategy::{Strategy, TransitionStrategy};
use crate::term::{Term, Variable};
use crate::unify::{SyntacticUnifier, Unifier};

/// How an execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
  /// No rule applies to the final state
  Final,
  /// The step bound was reached
  BoundReached,
}

impl TerminationStatus {
  /// Return true iff the final state has no successor.
  pub fn is_final(&self) -> bool {
    matches!(self, TerminationStatus::Final)
  }
}

impl fmt::Display for TerminationStatus {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      TerminationStatus::Final => write!(f, "final"),
      TerminationStatus::BoundReached => write!(f, "bound reached"),
    }
  }
}

/// Result of [`SymbolicRewriter::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
  pub state: ConstrainedTerm,
  /// Completed rewrite steps
  pub steps: usize,
  pub status: TerminationStatus,
}

/// Successors of one rewrite step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteStep {
  pub successors: Vec<StateId>,
  /// True iff the successors come from a transition group
  pub transition: bool,
}

/// Rewrites states of one definition.
///
/// States handed to the one-step relation live in an arena and are named by
/// [`StateId`]; the disabled-rule cache is keyed by those ids, so it only
/// answers for the exact state an entry was recorded against.
pub struct SymbolicRewriter<'def, M: Metrics = NoMetrics> {
  definition: &'def Definition,
  options: RewriterOptions,
  strategy: Box<dyn Strategy + 'def>,
  unifier: Box<dyn Unifier + 'def>,
  oracle: Box<dyn ConstraintOracle + 'def>,
  audit: Box<dyn RuleAudit + 'def>,
  fresh: FreshGenerator,
  states: StateArena,
  /// Rules known to fail at a state
  disabled_rules: HashMap<StateId, BTreeSet<RuleId>>,
  metrics: M,
}

impl<'def> SymbolicRewriter<'def> {
  /// A rewriter with the transition strategy of `options`, syntactic
  /// unification and the z3 oracle.
  pub fn new(definition: &'def Definition, options: RewriterOptions) -> Self {
    Self {
      definition,
      strategy: Box::new(TransitionStrategy::new(options.transitions.iter().cloned())),
      unifier: Box::new(SyntacticUnifier),
      oracle: Box::new(Z3Oracle::with_timeout(options.solver_timeout_ms)),
      audit: Box::new(NoAudit),
      options,
      fresh: FreshGenerator::new(),
      states: StateArena::new(),
      disabled_rules: HashMap::new(),
      metrics: NoMetrics,
    }
  }
}

impl<'def, M: Metrics> SymbolicRewriter<'def, M> {
  pub fn with_oracle(mut self, oracle: impl ConstraintOracle + 'def) -> Self {
    self.oracle = Box::new(oracle);
    self
  }

  pub fn with_unifier(mut self, unifier: impl Unifier + 'def) -> Self {
    self.unifier = Box::new(unifier);
    self
  }

  pub fn with_strategy(mut self, strategy: impl Strategy + 'def) -> Self {
    self.strategy = Box::new(strategy);
    self
  }

  pub fn with_audit(mut self, audit: impl RuleAudit + 'def) -> Self {
    self.audit = Box::new(audit);
    self
  }

  /// Replace the metrics sink.
  pub fn with_metrics<N: Metrics>(self, metrics: N) -> SymbolicRewriter<'def, N> {
    SymbolicRewriter {
      definition: self.definition,
      options: self.options,
      strategy: self.strategy,
      unifier: self.unifier,
      oracle: self.oracle,
      audit: self.audit,
      fresh: self.fresh,
      states: self.states,
      disabled_rules: self.disabled_rules,
      metrics,
    }
  }

  pub fn metrics(&self) -> &M {
    &self.metrics
  }

  pub fn into_metrics(self) -> M {
    self.metrics
  }

  pub fn definition(&self) -> &'def Definition {
    self.definition
  }

  pub fn options(&self) -> &RewriterOptions {
    &self.options
  }

  // State handles ////////////////////////////////////////////////////////

  /// Register a state for stepping. Every call returns a new id, even for
  /// a structurally equal state.
  pub fn insert_state(&mut self, state: ConstrainedTerm) -> StateId {
    self.states.insert(Rc::new(state))
  }

  pub fn state(&self, id: StateId) -> RewriteResult<&Rc<ConstrainedTerm>> {
    self.states.get(id).ok_or(RewriteError::UnknownState(id))
  }

  /// Forget a state and its cache entry.
  pub fn release_state(&mut self, id: StateId) -> Option<Rc<ConstrainedTerm>> {
    self.disabled_rules.remove(&id);
    self.states.release(id)
  }

  /// Rules recorded as failing at `id`.
  pub fn disabled_rules(&self, id: StateId) -> Option<&BTreeSet<RuleId>> {
    self.disabled_rules.get(&id)
  }

  /// Number of registered states.
  pub fn live_states(&self) -> usize {
    self.states.len()
  }

  // One-step relation ////////////////////////////////////////////////////

  /// Compute the successors of state `id` in one rule application.
  ///
  /// Priority groups are tried in strategy order and the first group with a
  /// successor wins. With `compute_one`, a group stops at its first
  /// successful rule and only that rule's first result is kept.
  pub fn compute_rewrite_step(&mut self, id: StateId, step: usize, compute_one: bool) -> RewriteResult<RewriteStep> {
    let subject = self.state(id)?.clone();
    let subject_vars = subject.variables();
    let mut failed: BTreeSet<RuleId> = if self.options.disabled_rule_cache {
      self.disabled_rules.get(&id).cloned().unwrap_or_default()
    } else {
      BTreeSet::new()
    };

    let definition = self.definition;
    let candidates = definition.candidate_rules(&subject.term);
    let groups = self.strategy.classify(&subject.term, &candidates, definition);
    for group in groups {
      let rules: Vec<RuleId> = group.rules.into_iter().filter(|rule| !failed.contains(rule)).collect();
      self.metrics.rule_group(rules.len());

      let mut applied: Vec<(RuleId, Vec<ConstrainedTerm>)> = Vec::new();
      for rule in rules {
        let mut results = self.compute_rewrite_step_by_rule(&subject, &subject_vars, rule, step)?;
        if results.is_empty() {
          failed.insert(rule);
        } else if compute_one {
          results.truncate(1);
          applied.push((rule, results));
          break;
        } else {
          applied.push((rule, results));
        }
      }
      if applied.is_empty() {
        continue;
      }

      self.disabled_rules.remove(&id);
      let mut successors = Vec::new();
      for (rule, results) in applied {
        let will_fail = self.rules_will_fail(&failed, rule);
        for result in results {
          let successor = self.insert_state(result);
          if self.options.disabled_rule_cache && !will_fail.is_empty() {
            self.disabled_rules.insert(successor, will_fail.clone());
          }
          successors.push(successor);
        }
      }
      return Ok(RewriteStep {
        successors,
        transition: group.is_transition,
      });
    }

    Ok(RewriteStep {
      successors: Vec::new(),
      transition: false,
    })
  }

  // Failed rules whose reads the applied rule cannot have changed.
  fn rules_will_fail(&self, failed: &BTreeSet<RuleId>, applied: RuleId) -> BTreeSet<RuleId> {
    let writes = match self.definition.rule(applied).write_cells() {
      Some(writes) => writes,
      None => return BTreeSet::new(),
    };
    failed
      .iter()
      .copied()
      .filter(|rule| {
        self
          .definition
          .rule(*rule)
          .read_cells()
          .map_or(false, |reads| reads.is_disjoint(writes))
      })
      .collect()
  }

  fn compute_rewrite_step_by_rule(
    &mut self,
    subject: &ConstrainedTerm,
    subject_vars: &BTreeSet<Variable>,
    id: RuleId,
    step: usize,
  ) -> RewriteResult<Vec<ConstrainedTerm>> {
    let definition = self.definition;
    let original = definition.rule(id);
    let audited = self.audit.audits(step, id);
    if audited {
      debug!(rule = %id, location = %original.location, step, "auditing rule");
    }

    let renamed;
    let rule = if original.variables().is_disjoint(subject_vars) {
      original
    } else {
      renamed = original.renamed(&mut self.fresh);
      &renamed
    };
    let results = self
      .apply_rule(subject, rule)
      .map_err(|source| RewriteError::RuleEvaluation {
        location: rule.location.clone(),
        source,
      })?;

    if results.is_empty() {
      if audited {
        return Err(RewriteError::AuditFailed {
          location: original.location.clone(),
          step,
          subject: subject.to_string(),
        });
      }
    } else {
      trace!(rule = %id, location = %original.location, results = results.len(), "rule applied");
      self.metrics.rule_applied(id, original);
    }
    Ok(results)
  }

  fn apply_rule(&mut self, subject: &ConstrainedTerm, rule: &Rule) -> Result<Vec<ConstrainedTerm>, EvaluationError> {
    let pattern = rule.build_pattern();
    let unifications = self.unifier.unify(subject, &pattern, &*self.oracle)?;
    let mut results = Vec::with_capacity(unifications.len());
    for unification in unifications {
      let result = self.build_result(rule, unification.constraint, Some(&subject.term), !unification.is_matching)?;
      results.extend(result);
    }
    Ok(results)
  }

  /// Instantiate the right-hand side of `rule` under `constraint`.
  ///
  /// Return `None` if the resulting constraint is false, or, when
  /// `expand_pattern` is set, unsatisfiable. The result mentions no variable
  /// of `rule`: bound ones are substituted away and the rest are renamed.
  pub fn build_result(
    &mut self,
    rule: &Rule,
    constraint: Constraint,
    subject: Option<&Term>,
    expand_pattern: bool,
  ) -> Result<Option<ConstrainedTerm>, EvaluationError> {
    let mut constraint = constraint;
    for var in &rule.fresh_variables {
      let value = self.fresh.fresh_value(var.sort())?;
      constraint.add_binding(var.clone(), value);
    }
    constraint.add_all(rule.ensures.iter().cloned());
    let constraint = constraint.simplify()?;
    if constraint.is_false() {
      return Ok(None);
    }

    let mut substituted = rule.matching_variables();
    substituted.extend(rule.fresh_variables.iter().cloned());
    let constraint = constraint.orient_substitution(&substituted);
    let fast = match (&rule.compiled, subject) {
      (Some(compiled), Some(subject)) => compiled.apply(subject, constraint.substitution())?,
      _ => None,
    };
    let fast_path = fast.is_some();
    let term = match fast {
      Some(term) => term,
      None => rule.rhs.substitute_and_evaluate(constraint.substitution())?,
    };
    let constraint = constraint.remove_bindings(&substituted);

    let renaming = self.fresh.renaming(&rule.variables());
    let mut result = ConstrainedTerm::new(term, constraint).substitute(&renaming);
    result.constraint = result.constraint.simplify()?;
    if result.constraint.is_false() {
      return Ok(None);
    }

    if expand_pattern {
      if fast_path {
        result.term = result.term.substitute_and_evaluate(result.constraint.substitution())?;
      }
      result = result.expand_patterns()?;
      if result.constraint.is_false() || self.oracle.check_unsat(&result.constraint) {
        return Ok(None);
      }
    }
    Ok(Some(result))
  }

  // Execution ////////////////////////////////////////////////////////////

  /// Follow the first successor until no rule applies or `bound` steps were
  /// taken. `None` is unbounded.
  pub fn execute(&mut self, initial: ConstrainedTerm, bound: Option<usize>) -> RewriteResult<Execution> {
    let start = Instant::now();
    let mut current = self.insert_state(initial);
    let mut step = 1;
    let status = loop {
      if bound.map_or(false, |bound| step > bound) {
        break TerminationStatus::BoundReached;
      }
      let next = match self.compute_rewrite_step(current, step, true) {
        Ok(next) => next,
        Err(error) => {
          self.release_state(current);
          return Err(error);
        }
      };
      let mut successors = next.successors.into_iter();
      match successors.next() {
        Some(successor) => {
          self.release_state(current);
          for extra in successors {
            self.release_state(extra);
          }
          current = successor;
        }
        None => break TerminationStatus::Final,
      }
      step += 1;
    };

    let steps = step - 1;
    let state = self.release_state(current).ok_or(RewriteError::UnknownState(current))?;
    let elapsed = start.elapsed();
    if self.options.statistics {
      info!(steps, elapsed_ms = elapsed.as_millis() as u64, "execution finished");
    }
    self.metrics.finished(elapsed);
    Ok(Execution {
      state: Rc::try_unwrap(state).unwrap_or_else(|shared| (*shared).clone()),
      steps,
      status,
    })
  }
}
