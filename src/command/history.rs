// EditingStack - bounded undo/redo history
//
// A fixed-size ring: pushing past capacity overwrites the oldest entry.

use std::sync::{Mutex, MutexGuard};

struct Ring<T> {
    slots: Vec<Option<T>>,
    /// Index of the most recently pushed entry
    head: usize,
    count: usize,
}

impl<T> Ring<T> {
    fn index(&self, offset: isize) -> usize {
        // rem_euclid never goes negative, so stepping back from slot 0 wraps
        (self.head as isize + offset).rem_euclid(self.slots.len() as isize) as usize
    }
}

/// Fixed-capacity LIFO history.
///
/// All operations take an internal lock, so enumeration from one thread is
/// safe while another pushes.
pub struct EditingStack<T> {
    ring: Mutex<Ring<T>>,
}

impl<T> EditingStack<T> {
    /// Create a history holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            ring: Mutex::new(Ring {
                slots,
                head: capacity - 1,
                count: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push an entry, evicting the oldest one when full
    pub fn add(&self, item: T) {
        let mut ring = self.lock();
        let next = ring.index(1);
        ring.slots[next] = Some(item);
        ring.head = next;
        if ring.count < ring.slots.len() {
            ring.count += 1;
        }
    }

    /// Remove and return the most recent entry
    pub fn pop(&self) -> Option<T> {
        let mut ring = self.lock();
        if ring.count == 0 {
            return None;
        }
        let head = ring.head;
        let item = ring.slots[head].take();
        ring.head = ring.index(-1);
        ring.count -= 1;
        item
    }

    pub fn clear(&self) {
        let mut ring = self.lock();
        for slot in ring.slots.iter_mut() {
            *slot = None;
        }
        ring.count = 0;
    }

    pub fn len(&self) -> usize {
        self.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Visit entries from the most recent to the oldest
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let ring = self.lock();
        for step in 0..ring.count {
            if let Some(item) = &ring.slots[ring.index(-(step as isize))] {
                f(item);
            }
        }
    }

    /// Apply `f` to the most recent entry
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let ring = self.lock();
        if ring.count == 0 {
            return None;
        }
        ring.slots[ring.head].as_ref().map(f)
    }
}

impl<T: Clone> EditingStack<T> {
    /// Entries from the most recent to the oldest
    pub fn snapshot(&self) -> Vec<T> {
        let mut items = Vec::new();
        self.for_each(|item| items.push(item.clone()));
        items
    }
}

impl<T: PartialEq> EditingStack<T> {
    pub fn contains(&self, item: &T) -> bool {
        let mut found = false;
        self.for_each(|candidate| found |= candidate == item);
        found
    }
}

impl<T> std::fmt::Debug for EditingStack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingStack")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
