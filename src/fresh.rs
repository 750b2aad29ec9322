//! Fresh values and fresh variable names.

use crate::error::EvaluationError;
use crate::term::{Sort, Substitution, Term, Variable};

/// Counter-based generator, one per rewriter.
#[derive(Debug, Clone, Default)]
pub struct FreshGenerator {
  next_value: u64,
  next_variable: u64,
}

impl FreshGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  /// A generator whose variables differ from every variable of `vars`.
  pub fn avoiding<'a>(vars: impl IntoIterator<Item = &'a Variable>) -> Self {
    let next_variable = vars
      .into_iter()
      .filter_map(Variable::generation)
      .max()
      .map_or(0, |n| n + 1);
    Self {
      next_value: 0,
      next_variable,
    }
  }

  /// A value of `sort` distinct from every value generated before.
  pub fn fresh_value(&mut self, sort: Sort) -> Result<Term, EvaluationError> {
    let n = self.next_value;
    let value = match sort {
      Sort::Int => Term::Int(n.into()),
      Sort::Id => Term::token(Sort::Id, format!("#id{}", n)),
      sort => return Err(EvaluationError::NoFreshValue(sort)),
    };
    self.next_value += 1;
    Ok(value)
  }

  /// A variable with the name and sort of `var` and a new generation.
  pub fn fresh_variable(&mut self, var: &Variable) -> Variable {
    let n = self.next_variable;
    self.next_variable += 1;
    var.renamed(n)
  }

  /// Map every variable of `vars` to a fresh variable.
  pub fn renaming<'a>(&mut self, vars: impl IntoIterator<Item = &'a Variable>) -> Substitution {
    vars
      .into_iter()
      .map(|var| (var.clone(), Term::Var(self.fresh_variable(var))))
      .collect()
  }
}
