//! Rule strategies: ordering candidate rules into priority groups.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::index::Definition;
use crate::rule::RuleId;
use crate::term::Term;

/// A set of rules tried together in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
  /// Successors of a transition group count as observable steps
  pub is_transition: bool,
  pub rules: Vec<RuleId>,
}

/// Partitions candidate rules into ordered, disjoint groups.
///
/// The rewriter stops at the first group that yields a successor.
pub trait Strategy {
  fn classify(&self, term: &Term, candidates: &[RuleId], definition: &Definition) -> Vec<RuleGroup>;
}

/// Groups by priority, lowest first. Inside one priority, rules tagged with
/// none of the transition attributes form a housekeeping group that is tried
/// before the transition group.
///
/// With no transition attributes configured, every rule is a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionStrategy {
  transitions: BTreeSet<String>,
}

impl TransitionStrategy {
  pub fn new(transitions: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      transitions: transitions.into_iter().map(Into::into).collect(),
    }
  }

  fn is_transition(&self, definition: &Definition, id: RuleId) -> bool {
    self.transitions.is_empty()
      || self
        .transitions
        .iter()
        .any(|tag| definition.rule(id).has_attribute(tag))
  }
}

impl Strategy for TransitionStrategy {
  fn classify(&self, _term: &Term, candidates: &[RuleId], definition: &Definition) -> Vec<RuleGroup> {
    candidates
      .iter()
      .copied()
      .sorted_by_key(|id| definition.rule(*id).priority)
      .group_by(|id| definition.rule(*id).priority)
      .into_iter()
      .flat_map(|(_, rules)| {
        let (transitions, housekeeping): (Vec<RuleId>, Vec<RuleId>) =
          rules.partition(|id| self.is_transition(definition, *id));
        [
          RuleGroup {
            is_transition: false,
            rules: housekeeping,
          },
          RuleGroup {
            is_transition: true,
            rules: transitions,
          },
        ]
      })
      .filter(|group| !group.rules.is_empty())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rule::Rule;

  fn rule(name: &str) -> Rule {
    Rule::new(Term::constant(name), Term::constant("done"))
  }

  #[test]
  fn priorities_then_housekeeping_first() {
    let definition = Definition::new(vec![
      rule("a").attribute("step"),
      rule("b").owise(),
      rule("c"),
      rule("d").attribute("step"),
    ]);
    let candidates: Vec<RuleId> = (0..4).map(RuleId).collect();
    let groups = TransitionStrategy::new(["step"]).classify(&Term::constant("a"), &candidates, &definition);
    assert_eq!(
      groups,
      vec![
        RuleGroup {
          is_transition: false,
          rules: vec![RuleId(2)],
        },
        RuleGroup {
          is_transition: true,
          rules: vec![RuleId(0), RuleId(3)],
        },
        RuleGroup {
          is_transition: false,
          rules: vec![RuleId(1)],
        },
      ]
    );
  }

  #[test]
  fn untagged_strategy_makes_everything_a_transition() {
    let definition = Definition::new(vec![rule("a"), rule("b")]);
    let groups = TransitionStrategy::default().classify(&Term::constant("a"), &[RuleId(0), RuleId(1)], &definition);
    assert_eq!(
      groups,
      vec![RuleGroup {
        is_transition: true,
        rules: vec![RuleId(0), RuleId(1)],
      }]
    );
  }
}
