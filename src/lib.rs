//! A symbolic rewrite engine over constrained terms.
//!
//! A [`Definition`] holds the rules; a [`SymbolicRewriter`] applies them to
//! [`ConstrainedTerm`]s with one shared one-step relation and offers three
//! drivers on top of it: concrete-style execution, bounded breadth-first
//! search and coinductive reachability proofs.

pub mod arena;
pub mod audit;
pub mod constrained;
pub mod constraint;
pub mod error;
pub mod fresh;
pub mod index;
pub mod metrics;
pub mod options;
pub mod output;
pub mod rewriter;
pub mod rule;
pub mod solver;
pub mod strategy;
pub mod term;
pub mod unify;

pub use constrained::ConstrainedTerm;
pub use constraint::Constraint;
pub use error::{EvaluationError, OptionsError, RewriteError, RewriteResult};
pub use index::Definition;
pub use options::{RewriterOptions, SearchType};
pub use rewriter::{Execution, Residual, ResidualReason, SymbolicRewriter, TerminationStatus};
pub use rule::{Rule, RuleId};
pub use term::{Sort, Substitution, Term, Variable};
pub use unify::SearchPattern;
