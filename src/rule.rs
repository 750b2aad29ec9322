//! Rewrite rules.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::constrained::ConstrainedTerm;
use crate::constraint::Constraint;
use crate::error::EvaluationError;
use crate::fresh::FreshGenerator;
use crate::term::{CellLabel, Substitution, Term, Variable};

pub const DEFAULT_PRIORITY: usize = 50;
pub const OWISE_PRIORITY: usize = 200;

/// Where a rule was declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
  pub source: Option<Arc<str>>,
  pub line: usize,
  pub column: usize,
}

impl SourceLocation {
  pub fn new(source: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
    Self {
      source: Some(source.into()),
      line,
      column,
    }
  }
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.source {
      Some(source) => write!(f, "{}:{}:{}", source, self.line, self.column),
      None => write!(f, "<generated>:{}:{}", self.line, self.column),
    }
  }
}

/// Position of a rule in its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

impl fmt::Display for RuleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// An imperative edit of the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInstruction {
  /// Replace the content of a cell by an instance of `content`
  WriteCell { label: CellLabel, content: Term },
}

/// A rule translated into cell edits, with its static cell footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
  read_cells: BTreeSet<CellLabel>,
  write_cells: BTreeSet<CellLabel>,
  instructions: Vec<BuildInstruction>,
}

impl CompiledRule {
  pub fn new(
    read_cells: BTreeSet<CellLabel>,
    write_cells: BTreeSet<CellLabel>,
    instructions: Vec<BuildInstruction>,
  ) -> Self {
    Self {
      read_cells,
      write_cells,
      instructions,
    }
  }

  pub fn read_cells(&self) -> &BTreeSet<CellLabel> {
    &self.read_cells
  }

  pub fn write_cells(&self) -> &BTreeSet<CellLabel> {
    &self.write_cells
  }

  pub fn instructions(&self) -> &[BuildInstruction] {
    &self.instructions
  }

  /// Run the instructions against `subject`. Return `None` if a written
  /// cell does not occur in it.
  pub fn apply(&self, subject: &Term, substitution: &Substitution) -> Result<Option<Term>, EvaluationError> {
    let mut term = subject.clone();
    for instruction in &self.instructions {
      match instruction {
        BuildInstruction::WriteCell { label, content } => {
          let content = content.substitute_and_evaluate(substitution)?;
          term = match term.replace_cell(label, &content) {
            Some(term) => term,
            None => return Ok(None),
          };
        }
      }
    }
    Ok(Some(term))
  }

  fn substitute(&self, substitution: &Substitution) -> Self {
    Self {
      instructions: self
        .instructions
        .iter()
        .map(|BuildInstruction::WriteCell { label, content }| BuildInstruction::WriteCell {
          label: label.clone(),
          content: content.substitute(substitution),
        })
        .collect(),
      ..self.clone()
    }
  }
}

/// A conditional rewrite rule `lhs => rhs requires .. ensures ..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
  pub label: Option<Arc<str>>,
  pub lhs: Term,
  pub rhs: Term,
  /// Side conditions binding variables not bound by `lhs`
  pub lookups: Vec<Term>,
  pub requires: Vec<Term>,
  pub ensures: Vec<Term>,
  /// Variables instantiated with fresh values on application
  pub fresh_variables: BTreeSet<Variable>,
  pub attributes: BTreeSet<Arc<str>>,
  /// Lower values are tried first
  pub priority: usize,
  pub location: SourceLocation,
  pub compiled: Option<CompiledRule>,
}

impl Rule {
  pub fn new(lhs: Term, rhs: Term) -> Self {
    Self {
      label: None,
      lhs,
      rhs,
      lookups: Vec::new(),
      requires: Vec::new(),
      ensures: Vec::new(),
      fresh_variables: BTreeSet::new(),
      attributes: BTreeSet::new(),
      priority: DEFAULT_PRIORITY,
      location: SourceLocation::default(),
      compiled: None,
    }
  }

  pub fn labeled(mut self, label: impl Into<Arc<str>>) -> Self {
    self.label = Some(label.into());
    self
  }

  pub fn requires(mut self, condition: Term) -> Self {
    self.requires.push(condition);
    self
  }

  pub fn ensures(mut self, condition: Term) -> Self {
    self.ensures.push(condition);
    self
  }

  pub fn lookup(mut self, condition: Term) -> Self {
    self.lookups.push(condition);
    self
  }

  pub fn fresh(mut self, var: Variable) -> Self {
    self.fresh_variables.insert(var);
    self
  }

  pub fn attribute(mut self, tag: impl Into<Arc<str>>) -> Self {
    self.attributes.insert(tag.into());
    self
  }

  pub fn priority(mut self, priority: usize) -> Self {
    self.priority = priority;
    self
  }

  pub fn owise(self) -> Self {
    self.attribute("owise").priority(OWISE_PRIORITY)
  }

  pub fn at(mut self, location: SourceLocation) -> Self {
    self.location = location;
    self
  }

  pub fn has_attribute(&self, tag: &str) -> bool {
    self.attributes.iter().any(|attribute| &**attribute == tag)
  }

  pub fn is_compiled(&self) -> bool {
    self.compiled.is_some()
  }

  pub fn read_cells(&self) -> Option<&BTreeSet<CellLabel>> {
    self.compiled.as_ref().map(CompiledRule::read_cells)
  }

  pub fn write_cells(&self) -> Option<&BTreeSet<CellLabel>> {
    self.compiled.as_ref().map(CompiledRule::write_cells)
  }

  /// Derive the cell footprint and build instructions of this rule.
  ///
  /// The rule stays uncompiled if its two sides do not have the same leaf
  /// cells, each at most once, or if they differ outside of leaf cells.
  pub fn compile_for_fast_rewriting(mut self) -> Self {
    let lhs_cells = self.lhs.leaf_cells();
    let rhs_cells = self.rhs.leaf_cells();
    let lhs_labels: BTreeSet<&CellLabel> = lhs_cells.iter().map(|(label, _)| *label).collect();
    let rhs_labels: BTreeSet<&CellLabel> = rhs_cells.iter().map(|(label, _)| *label).collect();
    if lhs_cells.is_empty()
      || lhs_labels.len() != lhs_cells.len()
      || rhs_labels.len() != rhs_cells.len()
      || lhs_labels != rhs_labels
    {
      return self;
    }

    let mut read_cells = BTreeSet::new();
    let mut write_cells = BTreeSet::new();
    let mut instructions = Vec::new();
    let mut rebuilt = Some(self.lhs.clone());
    for (label, old) in &lhs_cells {
      let new = match rhs_cells.iter().find(|(other, _)| other == label) {
        Some((_, new)) => new,
        None => return self,
      };
      if !matches!(old, Term::Var(var) if var.is_anonymous()) {
        read_cells.insert((*label).clone());
      }
      if old != new {
        write_cells.insert((*label).clone());
        instructions.push(BuildInstruction::WriteCell {
          label: (*label).clone(),
          content: (*new).clone(),
        });
        rebuilt = rebuilt.and_then(|term| term.replace_cell(label, new));
      }
    }
    if rebuilt.as_ref() != Some(&self.rhs) {
      return self;
    }
    self.compiled = Some(CompiledRule::new(read_cells, write_cells, instructions));
    self
  }

  pub fn variables(&self) -> BTreeSet<Variable> {
    let mut vars = BTreeSet::new();
    for term in self.terms() {
      term.collect_variables(&mut vars);
    }
    vars.extend(self.fresh_variables.iter().cloned());
    vars
  }

  /// Variables bound by matching: those of the left-hand side and lookups.
  pub fn matching_variables(&self) -> BTreeSet<Variable> {
    let mut vars = self.lhs.variables();
    for lookup in &self.lookups {
      lookup.collect_variables(&mut vars);
    }
    vars
  }

  /// The left-hand side constrained by the lookups and `requires`.
  pub fn build_pattern(&self) -> ConstrainedTerm {
    let constraint = Constraint::from_atoms(self.lookups.iter().chain(&self.requires).cloned());
    ConstrainedTerm::new(self.lhs.clone(), constraint)
  }

  /// A copy of this rule with every variable renamed apart.
  pub fn renamed(&self, fresh: &mut FreshGenerator) -> Rule {
    let vars = self.variables();
    let renaming = fresh.renaming(&vars);
    let rename_all = |terms: &[Term]| -> Vec<Term> { terms.iter().map(|term| term.substitute(&renaming)).collect() };
    Rule {
      lhs: self.lhs.substitute(&renaming),
      rhs: self.rhs.substitute(&renaming),
      lookups: rename_all(&self.lookups),
      requires: rename_all(&self.requires),
      ensures: rename_all(&self.ensures),
      fresh_variables: self
        .fresh_variables
        .iter()
        .filter_map(|var| match renaming.get(var) {
          Some(Term::Var(renamed)) => Some(renamed.clone()),
          _ => None,
        })
        .collect(),
      compiled: self.compiled.as_ref().map(|compiled| compiled.substitute(&renaming)),
      ..self.clone()
    }
  }

  fn terms(&self) -> impl Iterator<Item = &Term> {
    [&self.lhs, &self.rhs]
      .into_iter()
      .chain(&self.lookups)
      .chain(&self.requires)
      .chain(&self.ensures)
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(label) = &self.label {
      write!(f, "[{}] ", label)?;
    }
    write!(f, "{} => {}", self.lhs, self.rhs)?;
    if !self.requires.is_empty() {
      write!(f, " requires {}", Constraint::from_atoms(self.requires.iter().cloned()))?;
    }
    if !self.ensures.is_empty() {
      write!(f, " ensures {}", Constraint::from_atoms(self.ensures.iter().cloned()))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::term::{Builtin, Sort};

  fn config(k: Term, x: Term) -> Term {
    Term::bag(vec![Term::cell("k", k), Term::cell("x", x)])
  }

  fn increment() -> Rule {
    let n = Term::var("N", Sort::Int);
    let rest = Term::var("_K", Sort::K);
    Rule::new(
      config(rest.clone(), n.clone()),
      config(rest, Term::builtin(Builtin::Add, vec![n, Term::int(1)])),
    )
  }

  #[test]
  fn compilation_derives_footprint() {
    let rule = increment().compile_for_fast_rewriting();
    let compiled = rule.compiled.as_ref().unwrap();
    let labels = |cells: &BTreeSet<CellLabel>| cells.iter().map(|l| l.to_string()).collect::<Vec<_>>();
    assert_eq!(labels(compiled.read_cells()), vec!["x"]);
    assert_eq!(labels(compiled.write_cells()), vec!["x"]);
    assert_eq!(compiled.instructions().len(), 1);
  }

  #[test]
  fn compilation_rejects_structural_change() {
    let rule = Rule::new(Term::cell("x", Term::int(0)), Term::app("f", vec![Term::cell("x", Term::int(1))]));
    assert!(!rule.compile_for_fast_rewriting().is_compiled());
  }

  #[test]
  fn compiled_rule_edits_subject_cells() {
    let rule = increment().compile_for_fast_rewriting();
    let n = Variable::new("N", Sort::Int);
    let subject = config(Term::dot_k(), Term::int(4));
    let result = rule
      .compiled
      .unwrap()
      .apply(&subject, &Substitution::from([(n, Term::int(4))]))
      .unwrap();
    assert_eq!(result, Some(config(Term::dot_k(), Term::int(5))));
  }

  #[test]
  fn renaming_renames_every_part() {
    let rule = increment()
      .requires(Term::builtin(Builtin::Ge, vec![Term::var("N", Sort::Int), Term::int(0)]))
      .compile_for_fast_rewriting();
    let renamed = rule.renamed(&mut FreshGenerator::new());
    assert!(renamed.variables().is_disjoint(&rule.variables()));
    assert_eq!(renamed.variables().len(), rule.variables().len());
    assert!(renamed.is_compiled());
  }

  #[test]
  fn pattern_carries_requires() {
    let cond = Term::builtin(Builtin::Ge, vec![Term::var("N", Sort::Int), Term::int(0)]);
    let pattern = increment().requires(cond.clone()).build_pattern();
    assert_eq!(pattern.constraint.atoms(), &[cond]);
  }

  #[test]
  fn lookups_bind_matching_variables() {
    let (n, m) = (Variable::new("N", Sort::Int), Variable::new("M", Sort::Int));
    let lookup = Term::builtin(Builtin::EqInt, vec![Term::Var(m.clone()), Term::Var(n.clone())]);
    let cond = Term::builtin(Builtin::Ge, vec![Term::Var(n.clone()), Term::int(0)]);
    let rule = Rule::new(Term::cell("x", Term::Var(n.clone())), Term::cell("x", Term::Var(m.clone())))
      .lookup(lookup.clone())
      .requires(cond.clone());
    assert_eq!(rule.matching_variables(), BTreeSet::from([m, n]));
    assert_eq!(rule.build_pattern().constraint.atoms(), &[lookup, cond]);
  }
}
