//! PropertyKey - 型付きのプロパティキーと monoid
//!
//! キーは `{initial, combine}` の組（monoid）を持ちます。
//! `combine` は結合的（associative）であることが前提で、可換（commutative）とは限りません。
//! そのため annotate の呼び出し順はそのまま fold の順序になります。

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use super::fiber_set::SupervisedFiberSet;

/// Opaque, stable identity of a [`PropertyKey`].
///
/// Allocated once per constructed key; clones of a key share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Values that can live in a [`PropertyMap`](super::PropertyMap) slot.
pub trait PropertyValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> PropertyValue for T {}

type CombineFn<V> = Arc<dyn Fn(&V, &V) -> V + Send + Sync>;

/// A typed, named property key.
///
/// # 使用例
/// ```ignore
/// static RETRIES: LazyLock<PropertyKey<u64>> = LazyLock::new(|| PropertyKey::counter("retries"));
///
/// service.add_property(&RETRIES, 1);
/// assert_eq!(service.get(&RETRIES), 1);
/// ```
pub struct PropertyKey<V> {
    id: KeyId,
    name: Arc<str>,
    initial: V,
    combine: CombineFn<V>,
}

impl<V: PropertyValue> PropertyKey<V> {
    /// Create a key from its monoid: `initial` must be the identity of `combine`.
    pub fn new(
        name: impl Into<Arc<str>>,
        initial: V,
        combine: impl Fn(&V, &V) -> V + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: KeyId::next(),
            name: name.into(),
            initial,
            combine: Arc::new(combine),
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &V {
        &self.initial
    }

    /// `combine(left, right)`; `left` is the accumulated value.
    pub fn combine(&self, left: &V, right: &V) -> V {
        (self.combine)(left, right)
    }

    pub(crate) fn combine_fn(&self) -> CombineFn<V> {
        Arc::clone(&self.combine)
    }
}

impl PropertyKey<u64> {
    /// Saturating sum, starting at zero.
    pub fn counter(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, 0, |a, b| a.saturating_add(*b))
    }
}

impl PropertyKey<bool> {
    /// Logical OR, starting at `false`.
    pub fn flag(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, false, |a, b| *a || *b)
    }
}

impl<T: Ord + Clone + Send + Sync + 'static> PropertyKey<BTreeSet<T>> {
    /// Set union, starting at the empty set.
    pub fn set(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, BTreeSet::new(), |a, b| a.union(b).cloned().collect())
    }
}

impl<T: Clone + Send + Sync + 'static> PropertyKey<Vec<T>> {
    /// Append in annotation order. Not commutative.
    pub fn list(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Vec::new(), |a, b| {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            out
        })
    }
}

impl<T: Clone + Send + Sync + 'static> PropertyKey<Option<T>> {
    /// Last write wins; `None` never overwrites a value.
    pub fn latest(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, None, |a, b| b.clone().or_else(|| a.clone()))
    }
}

impl<V> Clone for PropertyKey<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            initial: self.initial.clone(),
            combine: Arc::clone(&self.combine),
        }
    }
}

impl<V> PartialEq for PropertyKey<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Eq for PropertyKey<V> {}

impl<V> fmt::Debug for PropertyKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Reserved keys understood by the runtime.
pub struct Property;

static FIBERS: LazyLock<PropertyKey<SupervisedFiberSet>> = LazyLock::new(|| {
    PropertyKey::new("strand.fibers", SupervisedFiberSet::empty(), |a, b| {
        a.union(b)
    })
});

impl Property {
    /// Descendant fiber handles registered by [`AnnotationService::spawn`](crate::app::AnnotationService::spawn).
    pub fn fibers() -> &'static PropertyKey<SupervisedFiberSet> {
        &FIBERS
    }
}
