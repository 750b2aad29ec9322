//! # Symbolic Evaluation
//! 
//! Layered exploration structures shared by the drivers of a symbolic
//! rewrite engine:
//! 
//! - a layered frontier mapping states to a payload (e.g. a depth), where
//! structurally equal states pushed into the same layer collapse;
//! 
//! - a plain order-preserving worklist, one layer at a time;
//! 
//! - a structural visited set, so that each state expands at most once.

pub mod traits;
pub mod frontier;

pub use frontier::{Frontier, Visited, Worklist};
pub use traits::StateSet;
