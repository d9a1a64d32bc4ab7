//! The selected-series result slot.

use std::sync::Arc;

use parking_lot::Mutex;

/// A ticket issued by [`SelectionSlot::begin`], tied to the selection
/// generation it was issued under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SelectionTicket {
    generation: u64,
}

#[derive(Debug)]
struct SlotState<T> {
    generation: u64,
    latest: Option<Arc<T>>,
}

/// A single-writer slot holding the result of the most recent selection.
///
/// Each [`begin`](SelectionSlot::begin) supersedes every earlier ticket. A
/// superseded query may still run to completion, but its
/// [`commit`](SelectionSlot::commit) is discarded, so a stale result never
/// replaces a newer one.
#[derive(Debug)]
pub struct SelectionSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> SelectionSlot<T> {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                generation: 0,
                latest: None,
            }),
        }
    }

    /// Begin a new selection, superseding every outstanding ticket.
    pub fn begin(&self) -> SelectionTicket {
        let mut state = self.state.lock();
        state.generation += 1;
        SelectionTicket {
            generation: state.generation,
        }
    }

    /// Commit `value` for `ticket`.
    ///
    /// Returns false and discards `value` if the ticket was superseded by a
    /// later [`begin`](Self::begin).
    pub fn commit(&self, ticket: SelectionTicket, value: T) -> bool {
        let mut state = self.state.lock();
        if ticket.generation == state.generation {
            state.latest = Some(Arc::new(value));
            true
        } else {
            false
        }
    }

    /// Returns the most recently committed value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<T>> {
        self.state.lock().latest.clone()
    }
}

impl<T> Default for SelectionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_commit_and_latest() {
        let slot = SelectionSlot::new();
        assert!(slot.latest().is_none());
        let ticket = slot.begin();
        assert!(slot.commit(ticket, vec![1, 2, 3]));
        assert_eq!(slot.latest().as_deref(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn slot_superseded_commit_discarded() {
        let slot = SelectionSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(!slot.commit(first, "stale"));
        assert!(slot.latest().is_none());
        assert!(slot.commit(second, "fresh"));
        assert_eq!(slot.latest().as_deref(), Some(&"fresh"));
    }

    #[test]
    fn slot_stale_ticket_cannot_overwrite() {
        let slot = SelectionSlot::new();
        let first = slot.begin();
        assert!(slot.commit(first, 1));
        let second = slot.begin();
        assert!(!slot.commit(first, 2));
        assert_eq!(slot.latest().as_deref(), Some(&1));
        assert!(slot.commit(second, 3));
        assert_eq!(slot.latest().as_deref(), Some(&3));
    }
}
