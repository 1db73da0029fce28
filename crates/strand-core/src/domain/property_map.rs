//! PropertyMap - 型消去された不変マップ
//!
//! # 内部実装
//! - `HashMap<KeyId, Slot>` を `Arc` で共有（更新は常に新しいマップを作る）
//! - Slot は値（`Arc<dyn Any + Send + Sync>`）とキーの combine を型消去して保持
//! - 型付き API（`get`/`annotate`）で downcast するので、呼び出し側は `V` しか見ない

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use super::property::{KeyId, PropertyKey, PropertyValue};

type ErasedValue = Arc<dyn Any + Send + Sync>;
type ErasedCombine =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> Option<ErasedValue> + Send + Sync>;

#[derive(Clone)]
struct Slot {
    name: Arc<str>,
    value: ErasedValue,
    combine: ErasedCombine,
}

impl Slot {
    fn new<V: PropertyValue>(key: &PropertyKey<V>, value: V) -> Self {
        let combine = key.combine_fn();
        let erased: ErasedCombine = Arc::new(
            move |left: &(dyn Any + Send + Sync), right: &(dyn Any + Send + Sync)| {
                let left = left.downcast_ref::<V>()?;
                let right = right.downcast_ref::<V>()?;
                Some(Arc::new(combine(left, right)) as ErasedValue)
            },
        );
        Self {
            name: Arc::from(key.name()),
            value: Arc::new(value),
            combine: erased,
        }
    }
}

static EMPTY: LazyLock<PropertyMap> = LazyLock::new(|| PropertyMap {
    slots: Arc::new(HashMap::new()),
});

/// Immutable mapping from [`PropertyKey`] identity to the fold of its values.
///
/// Every update returns a new map. Cloning is cheap (one `Arc` bump).
#[derive(Clone)]
pub struct PropertyMap {
    slots: Arc<HashMap<KeyId, Slot>>,
}

impl PropertyMap {
    /// The shared empty map.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// Value stored for `key`, or `key.initial()` when absent.
    pub fn get<V: PropertyValue>(&self, key: &PropertyKey<V>) -> V {
        self.slots
            .get(&key.id())
            .and_then(|slot| slot.value.downcast_ref::<V>())
            .cloned()
            .unwrap_or_else(|| key.initial().clone())
    }

    /// New map whose `key` slot is `combine(previous_or_initial, value)`.
    pub fn annotate<V: PropertyValue>(&self, key: &PropertyKey<V>, value: V) -> Self {
        let next = key.combine(&self.get(key), &value);
        let mut slots = HashMap::clone(&self.slots);
        slots.insert(key.id(), Slot::new(key, next));
        Self {
            slots: Arc::new(slots),
        }
    }

    /// Fold every slot of `other` into `self` as `combine(self_slot, other_slot)`.
    pub fn merge(&self, other: &PropertyMap) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let mut slots = HashMap::clone(&self.slots);
        for (id, incoming) in other.slots.iter() {
            let merged = match slots.get(id) {
                Some(existing) => match (incoming.combine)(
                    existing.value.as_ref(),
                    incoming.value.as_ref(),
                ) {
                    Some(value) => Slot {
                        value,
                        ..incoming.clone()
                    },
                    None => incoming.clone(),
                },
                None => incoming.clone(),
            };
            slots.insert(*id, merged);
        }
        Self {
            slots: Arc::new(slots),
        }
    }

    pub(crate) fn without(&self, id: KeyId) -> Self {
        if !self.slots.contains_key(&id) {
            return self.clone();
        }
        let mut slots = HashMap::clone(&self.slots);
        slots.remove(&id);
        if slots.is_empty() {
            return Self::empty();
        }
        Self {
            slots: Arc::new(slots),
        }
    }

    pub fn contains<V>(&self, key: &PropertyKey<V>) -> bool
    where
        V: PropertyValue,
    {
        self.slots.contains_key(&key.id())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names of the populated slots, sorted.
    pub fn key_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.values().map(|s| s.name.as_ref()).collect();
        names.sort_unstable();
        names
    }

    #[cfg(test)]
    fn shares_storage_with(&self, other: &PropertyMap) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}

impl Default for PropertyMap {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMap")
            .field("keys", &self.key_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeSet;

    #[test]
    fn get_on_empty_returns_initial() {
        let count = PropertyKey::counter("count");
        let tags = PropertyKey::<BTreeSet<String>>::set("tags");
        let seen = PropertyKey::flag("seen");

        let map = PropertyMap::empty();
        assert_eq!(map.get(&count), 0);
        assert!(map.get(&tags).is_empty());
        assert!(!map.get(&seen));
    }

    #[test]
    fn empty_is_shared() {
        assert!(PropertyMap::empty().shares_storage_with(&PropertyMap::default()));
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["a"])]
    #[case(vec!["a", "b", "c"])]
    #[case(vec!["c", "a", "c", "b"])]
    fn annotate_folds_in_call_order(#[case] values: Vec<&'static str>) {
        let key = PropertyKey::<Vec<&'static str>>::list("trail");

        let map = values
            .iter()
            .fold(PropertyMap::empty(), |m, v| m.annotate(&key, vec![*v]));

        let expected = values
            .iter()
            .fold(key.initial().clone(), |acc, v| key.combine(&acc, &vec![*v]));
        assert_eq!(map.get(&key), expected);
        assert_eq!(map.get(&key), values);
    }

    #[test]
    fn annotate_does_not_touch_other_slots_or_the_source() {
        let a = PropertyKey::counter("a");
        let b = PropertyKey::counter("b");

        let base = PropertyMap::empty().annotate(&a, 2);
        let next = base.annotate(&b, 5);

        assert_eq!(base.get(&b), 0);
        assert_eq!(next.get(&a), 2);
        assert_eq!(next.get(&b), 5);
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn merge_combines_left_then_right() {
        let trail = PropertyKey::<Vec<u8>>::list("trail");
        let only_right = PropertyKey::flag("only_right");

        let left = PropertyMap::empty().annotate(&trail, vec![1, 2]);
        let right = PropertyMap::empty()
            .annotate(&trail, vec![3])
            .annotate(&only_right, true);

        let merged = left.merge(&right);
        assert_eq!(merged.get(&trail), vec![1, 2, 3]);
        assert!(merged.get(&only_right));
        assert_eq!(left.get(&trail), vec![1, 2]);
    }

    #[test]
    fn without_removes_a_single_slot() {
        let a = PropertyKey::counter("a");
        let b = PropertyKey::counter("b");
        let map = PropertyMap::empty().annotate(&a, 1).annotate(&b, 1);

        let trimmed = map.without(a.id());
        assert!(!trimmed.contains(&a));
        assert!(trimmed.contains(&b));
        assert!(map.without(a.id()).without(b.id()).shares_storage_with(&PropertyMap::empty()));
    }

    #[test]
    fn debug_lists_key_names() {
        let a = PropertyKey::counter("alpha");
        let map = PropertyMap::empty().annotate(&a, 1);

        assert_eq!(format!("{map:?}"), r#"PropertyMap { keys: ["alpha"] }"#);
    }
}
