//! Identity handles for states.
//!
//! States are compared structurally everywhere except in the disabled-rule
//! cache, which must only ever answer for the exact state an entry was
//! recorded against. [`StateArena`] hands out a [`StateId`] per inserted
//! state; two insertions of structurally equal states get distinct ids.
//!
//! Slots are reused through a free list. Every reuse bumps the slot's
//! generation, so a stale id never resolves to the slot's new occupant.

use std::fmt;
use std::rc::Rc;

use crate::constrained::ConstrainedTerm;

/// Opaque handle of one state in a [`StateArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId {
    index: u32,
    generation: u32,
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state {}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    state: Option<Rc<ConstrainedTerm>>,
    generation: u32,
    next_free: Option<u32>,
}

/// Storage for live states with free-list reuse.
#[derive(Debug, Default)]
pub struct StateArena {
    slots: Vec<Slot>,
    free_list_head: Option<u32>,
    live_count: usize,
}

impl StateArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `state` and return a handle no other insertion shares.
    pub fn insert(&mut self, state: Rc<ConstrainedTerm>) -> StateId {
        self.live_count += 1;
        match self.free_list_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.state.is_none(), "free slot should have no state");
                self.free_list_head = slot.next_free;
                slot.state = Some(state);
                slot.next_free = None;
                StateId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    state: Some(state),
                    generation: 0,
                    next_free: None,
                });
                StateId { index, generation: 0 }
            }
        }
    }

    pub fn get(&self, id: StateId) -> Option<&Rc<ConstrainedTerm>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_ref())
    }

    /// Drop the state behind `id`. Return the state if `id` was live.
    pub fn release(&mut self, id: StateId) -> Option<Rc<ConstrainedTerm>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let state = slot.state.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_list_head;
        self.free_list_head = Some(id.index);
        self.live_count -= 1;
        Some(state)
    }

    /// Number of live states.
    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}
