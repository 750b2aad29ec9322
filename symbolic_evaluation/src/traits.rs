//! Traits for the layered exploration structures.

/// Sets of already explored states, compared structurally.
pub trait StateSet<T> {
  /// Create a empty set.
  fn new() -> Self;
  /// Insert `s`, returning false if a structurally equal state was present.
  fn insert(&mut self, s: T) -> bool;
  fn contains(&self, s: &T) -> bool;
  fn len(&self) -> usize;
  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
