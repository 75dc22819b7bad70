//! Fixed-capacity slot ring holding finished episodes until they can be drained
//! in sequence order.
//!
//! Slots are reused cyclically. The ring itself does not know about sequence
//! numbers: the dispatch controller guarantees that a slot is never handed out
//! again before its previous occupant has been drained.

/// Ring of optional items with a "waiting slot" pointer at the oldest
/// undrained position.
#[derive(Debug)]
pub struct SlotRing<T> {
    slots: Vec<Option<T>>,
    waiting: usize,
    occupied: usize,
}

impl<T> SlotRing<T> {
    /// Creates an empty ring.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        SlotRing {
            slots: (0..capacity).map(|_| None).collect(),
            waiting: 0,
            occupied: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the oldest slot that has not been drained yet.
    pub fn waiting_slot(&self) -> usize {
        self.waiting
    }

    /// Number of slots currently holding an item.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn is_ready(&self) -> bool {
        self.slots[self.waiting].is_some()
    }

    /// Stores an item in `slot`.
    ///
    /// # Panics
    /// Panics if the slot is out of range or already occupied; either means the
    /// dispatcher handed out a slot it did not own.
    pub fn store(&mut self, slot: usize, item: T) {
        let cell = &mut self.slots[slot];
        assert!(cell.is_none(), "slot {} is still occupied", slot);
        *cell = Some(item);
        self.occupied += 1;
    }

    /// Removes and returns the item at the waiting slot if it is present,
    /// advancing the waiting pointer (wrapping at capacity).
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.slots[self.waiting].take()?;
        self.occupied -= 1;
        self.waiting += 1;
        if self.waiting == self.slots.len() {
            self.waiting = 0;
        }
        Some(item)
    }
}
