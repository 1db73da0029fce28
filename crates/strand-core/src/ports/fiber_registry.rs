//! FiberRegistry port - fiber ハンドルの解決
//!
//! supervision set に入っているのは `FiberId` だけです。
//! 子孫の入れ子 set と生存状態はここを通して引きます（弱参照は使いません）。

use std::sync::Arc;

use crate::domain::{
    FiberId, FiberState, FiberStatusView, RegistryCounts, ScopeCell, SupervisedFiberSet,
};

/// What the supervision query needs to know about one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiberEntry {
    pub state: FiberState,
    /// The fiber's own `Property::fibers()` set, read from its fiber-level
    /// scope (live) or from the snapshot taken at termination.
    pub children: SupervisedFiberSet,
}

/// Application-level registry of fiber handles.
///
/// # 設計原則
/// - 操作はすべて非同期待ちなし（annotation 操作から呼ばれる）
/// - 終了した fiber は tombstone になり、親が running の間か、running の子孫へ
///   たどれる間だけ残る（それ以外は `mark_terminated` の中で回収）
pub trait FiberRegistry: Send + Sync {
    fn register(&self, fiber: FiberId, parent: Option<FiberId>, cell: Arc<ScopeCell>);

    /// Record termination. Idempotent.
    fn mark_terminated(&self, fiber: FiberId);

    fn lookup(&self, fiber: FiberId) -> Option<FiberEntry>;

    fn status(&self, fiber: FiberId) -> Option<FiberStatusView>;

    fn counts(&self) -> RegistryCounts;

    /// Drop tombstones that no longer lead to a running fiber; returns how many
    /// were removed.
    fn prune_terminated(&self) -> usize;
}
