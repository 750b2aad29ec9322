//! Rule definitions and candidate selection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::rule::{Rule, RuleId};
use crate::term::{Term, K_CELL};

/// Narrows the rules worth trying at a term.
pub trait RuleIndex {
  /// Rules that may apply to `term`, in declaration order.
  fn candidate_rules(&self, term: &Term) -> Vec<RuleId>;
}

/// Index keyed by the constructor at the front of the computation cell.
///
/// A rule whose left-hand side fixes that constructor is a candidate only for
/// terms with the same one. Every other rule is always a candidate.
#[derive(Debug, Clone, Default)]
pub struct HeadSymbolIndex {
  keyed: BTreeMap<Arc<str>, Vec<RuleId>>,
  unkeyed: Vec<RuleId>,
  len: usize,
}

impl HeadSymbolIndex {
  pub fn new(rules: &[Rule]) -> Self {
    let mut index = Self {
      len: rules.len(),
      ..Self::default()
    };
    for (i, rule) in rules.iter().enumerate() {
      match head_of(&rule.lhs) {
        Some(head) => index.keyed.entry(head.clone()).or_default().push(RuleId(i)),
        None => index.unkeyed.push(RuleId(i)),
      }
    }
    index
  }
}

impl RuleIndex for HeadSymbolIndex {
  fn candidate_rules(&self, term: &Term) -> Vec<RuleId> {
    let head = match head_of(term) {
      Some(head) => head,
      None => return (0..self.len).map(RuleId).collect(),
    };
    let mut candidates: Vec<RuleId> = self.keyed.get(head).into_iter().flatten().copied().collect();
    candidates.extend(&self.unkeyed);
    candidates.sort_unstable();
    candidates
  }
}

fn head_of(term: &Term) -> Option<&Arc<str>> {
  let contents = term.cell_contents(K_CELL);
  match contents[..] {
    [content] => content.first_item()?.head_symbol(),
    _ => None,
  }
}

/// The rules of a language definition with their index.
pub struct Definition {
  rules: Vec<Rule>,
  index: Box<dyn RuleIndex>,
}

impl Definition {
  /// Index `rules` by head symbol.
  pub fn new(rules: Vec<Rule>) -> Self {
    let index = HeadSymbolIndex::new(&rules);
    Self::with_index(rules, Box::new(index))
  }

  pub fn with_index(rules: Vec<Rule>, index: Box<dyn RuleIndex>) -> Self {
    Self { rules, index }
  }

  /// # Panics
  /// Panics if `id` was not issued for this definition.
  pub fn rule(&self, id: RuleId) -> &Rule {
    &self.rules[id.0]
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn candidate_rules(&self, term: &Term) -> Vec<RuleId> {
    self.index.candidate_rules(term)
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

impl fmt::Debug for Definition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Definition").field("rules", &self.rules).finish()
  }
}
