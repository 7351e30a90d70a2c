use std::fmt::{self, Debug, Formatter};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// A bounded last-in-first-out store with blocking removal.
pub struct LifoStore<T> {
    capacity: usize,
    items: Mutex<Vec<T>>,
    available: Condvar,
}

impl<T> LifoStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(Vec::with_capacity(capacity)),
            available: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Add an item to the top of the store. Never blocks; the item is
    /// handed back if the store is full.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push(item);
        drop(items);
        self.available.notify_one();
        Ok(())
    }

    /// Remove the most recently added item, waiting for one to become
    /// available. Returns `None` only when the deadline passes first.
    pub fn pop(&self, deadline: Option<Instant>) -> Option<T> {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop() {
                return Some(item);
            }
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut items, deadline).timed_out() {
                        // a push may have raced with the timeout
                        return items.pop();
                    }
                }
                None => self.available.wait(&mut items),
            }
        }
    }

    /// Remove every item, oldest first.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock())
    }

    /// Put back items previously removed by [`LifoStore::drain`], underneath
    /// anything pushed since. Items that no longer fit are handed back.
    pub fn refill(&self, mut older: Vec<T>) -> Vec<T> {
        let mut items = self.items.lock();
        let room = self.capacity.saturating_sub(items.len());
        let overflow = if older.len() > room {
            older.split_off(room)
        } else {
            Vec::new()
        };
        let added = older.len();
        items.splice(0..0, older);
        drop(items);
        for _ in 0..added {
            self.available.notify_one();
        }
        overflow
    }
}

impl<T> Debug for LifoStore<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifoStore")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
