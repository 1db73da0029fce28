//! ScopeCell - fiber ごとの現在の PropertyMap

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ids::FiberId;
use super::property::{PropertyKey, PropertyValue};
use super::property_map::PropertyMap;

/// Per-fiber storage for the currently active [`PropertyMap`].
///
/// Only the owning fiber writes to a cell. The lock is never held across an
/// `.await`; other fibers only take short snapshots through the registry.
#[derive(Debug)]
pub struct ScopeCell {
    fiber: FiberId,
    map: Mutex<PropertyMap>,
}

impl ScopeCell {
    pub fn new(fiber: FiberId, initial: PropertyMap) -> Self {
        Self {
            fiber,
            map: Mutex::new(initial),
        }
    }

    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    pub fn snapshot(&self) -> PropertyMap {
        self.lock().clone()
    }

    pub fn get<V: PropertyValue>(&self, key: &PropertyKey<V>) -> V {
        self.lock().get(key)
    }

    pub fn annotate<V: PropertyValue>(&self, key: &PropertyKey<V>, value: V) {
        let mut map = self.lock();
        *map = map.annotate(key, value);
    }

    pub fn merge(&self, other: &PropertyMap) {
        let mut map = self.lock();
        *map = map.merge(other);
    }

    /// Swap in `next` and return the previous map.
    pub fn replace(&self, next: PropertyMap) -> PropertyMap {
        std::mem::replace(&mut *self.lock(), next)
    }

    // A panic while holding the lock cannot leave a half-written map: the
    // slot is always assigned a fully built value.
    fn lock(&self) -> MutexGuard<'_, PropertyMap> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn annotate_and_replace() {
        let cell = ScopeCell::new(FiberId::from_ulid(Ulid::new()), PropertyMap::empty());
        let key = PropertyKey::counter("n");

        cell.annotate(&key, 2);
        cell.annotate(&key, 3);
        assert_eq!(cell.get(&key), 5);

        let previous = cell.replace(PropertyMap::empty());
        assert_eq!(previous.get(&key), 5);
        assert_eq!(cell.get(&key), 0);
    }
}
