//! Error types of the rewrite engine.

use thiserror::Error;

use crate::arena::StateId;
use crate::rule::SourceLocation;
use crate::term::Sort;

/// Errors raised while evaluating builtin functions or generating values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
  /// `/Int` or `%Int` with a zero divisor
  #[error("division by zero in `{0}`")]
  DivisionByZero(&'static str),

  /// A builtin applied to a concrete value of the wrong sort
  #[error("`{symbol}` expects an argument of sort {expected}, found `{found}`")]
  SortMismatch {
    symbol: &'static str,
    expected: Sort,
    found: String,
  },

  #[error("`{symbol}` expects {expected} arguments, found {found}")]
  Arity {
    symbol: &'static str,
    expected: usize,
    found: usize,
  },

  #[error("no fresh value generator for sort {0}")]
  NoFreshValue(Sort),
}

/// Errors raised by the execution, search and proof drivers.
#[derive(Debug, Error)]
pub enum RewriteError {
  /// An evaluation error annotated with the rule being applied
  #[error("{source}\n  while evaluating rule at {location}")]
  RuleEvaluation {
    location: SourceLocation,
    #[source]
    source: EvaluationError,
  },

  /// An evaluation error outside of rule application (patterns, claims)
  #[error(transparent)]
  Evaluation(#[from] EvaluationError),

  /// The rule under audit did not apply
  #[error("audited rule at {location} failed to apply at step {step} on {subject}")]
  AuditFailed {
    location: SourceLocation,
    step: usize,
    subject: String,
  },

  #[error("unknown state {0}")]
  UnknownState(StateId),

  #[error("Exit code found was not in the range of an integer. Found: {0}")]
  ExitCodeOutOfRange(String),
}

pub type RewriteResult<T> = Result<T, RewriteError>;

/// Errors in the engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
  #[error("You can specify only one type of search.")]
  ConflictingSearchTypes,

  #[error("unknown search type `{0}`")]
  UnknownSearchType(String),
}
