//! Layer-at-a-time frontiers.
//!
//! States of the current layer are popped in insertion order while the
//! successors are collected into the next layer; `advance` promotes the next
//! layer once the current one is exhausted.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use indexmap::IndexMap;

use crate::traits::StateSet;

/// A frontier whose next layer maps states to a payload.
///
/// Pushing a state that is already in the next layer keeps its position and
/// replaces the payload.
#[derive(Debug, Clone)]
pub struct Frontier<K, V> {
  current: VecDeque<(K, V)>,
  next: IndexMap<K, V>,
}

impl<K: Hash + Eq, V> Frontier<K, V> {
  pub fn new() -> Self {
    Self {
      current: VecDeque::new(),
      next: IndexMap::new(),
    }
  }

  /// Add a state to the current layer.
  pub fn seed(&mut self, key: K, value: V) {
    self.current.push_back((key, value));
  }

  /// Take the next state of the current layer.
  pub fn pop(&mut self) -> Option<(K, V)> {
    self.current.pop_front()
  }

  /// Add a state to the next layer, returning the payload it displaced.
  pub fn push_next(&mut self, key: K, value: V) -> Option<V> {
    self.next.insert(key, value)
  }

  /// Promote the next layer. Return false if it is empty.
  ///
  /// Anything left in the current layer is kept ahead of the promoted states.
  pub fn advance(&mut self) -> bool {
    self.current.extend(self.next.drain(..));
    !self.current.is_empty()
  }

  /// Number of states left in the current layer.
  pub fn layer_len(&self) -> usize {
    self.current.len()
  }

  pub fn is_empty(&self) -> bool {
    self.current.is_empty() && self.next.is_empty()
  }

  /// Remove every state of both layers.
  pub fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
    self.current.drain(..).chain(self.next.drain(..))
  }
}

impl<K: Hash + Eq, V> Default for Frontier<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

/// A frontier without payload or deduplication.
#[derive(Debug, Clone)]
pub struct Worklist<T> {
  current: VecDeque<T>,
  next: Vec<T>,
}

impl<T> Worklist<T> {
  pub fn new() -> Self {
    Self {
      current: VecDeque::new(),
      next: Vec::new(),
    }
  }

  pub fn seed(&mut self, item: T) {
    self.current.push_back(item);
  }

  pub fn pop(&mut self) -> Option<T> {
    self.current.pop_front()
  }

  pub fn push_next(&mut self, item: T) {
    self.next.push(item);
  }

  pub fn advance(&mut self) -> bool {
    self.current.extend(self.next.drain(..));
    !self.current.is_empty()
  }

  pub fn layer_len(&self) -> usize {
    self.current.len()
  }

  pub fn is_empty(&self) -> bool {
    self.current.is_empty() && self.next.is_empty()
  }

  pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
    self.current.drain(..).chain(self.next.drain(..))
  }
}

impl<T> Default for Worklist<T> {
  fn default() -> Self {
    Self::new()
  }
}

/// Structural visited set.
#[derive(Debug, Clone)]
pub struct Visited<T: Hash + Eq>(HashSet<T>);

impl<T: Hash + Eq> StateSet<T> for Visited<T> {
  fn new() -> Self {
    Self(HashSet::new())
  }

  fn insert(&mut self, s: T) -> bool {
    self.0.insert(s)
  }

  fn contains(&self, s: &T) -> bool {
    self.0.contains(s)
  }

  fn len(&self) -> usize {
    self.0.len()
  }
}

impl<T: Hash + Eq> Default for Visited<T> {
  fn default() -> Self {
    <Self as StateSet<T>>::new()
  }
}
