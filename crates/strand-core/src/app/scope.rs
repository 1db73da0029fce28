//! Scope - fiber-local な ScopeCell の管理
//!
//! # 仕組み
//! - `tokio::task_local!` に現在の `Arc<ScopeCell>` を置く
//! - `with_annotation` は新しい ScopeCell で task-local を入れ子にする
//!   （poll を抜けるたびに外側の cell が戻るので、成功・失敗・drop のどれでも復元される）
//! - `IsolatedScope` は drop guard で、完了前に破棄されたときだけ途中の map を通知する

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{FiberId, PropertyMap, ScopeCell};
use crate::ports::CancellationSink;

tokio::task_local! {
    static CURRENT: Arc<ScopeCell>;
}

/// The calling fiber's active cell, if it runs inside the service environment.
pub(crate) fn current() -> Option<Arc<ScopeCell>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Run `future` with `cell` as the active scope.
pub(crate) async fn enter<F: Future>(cell: Arc<ScopeCell>, future: F) -> F::Output {
    CURRENT.scope(cell, future).await
}

/// Fresh, empty scope installed for the duration of one `with_annotation`.
pub(crate) struct IsolatedScope {
    cell: Arc<ScopeCell>,
    sink: Arc<dyn CancellationSink>,
    completed: bool,
}

impl IsolatedScope {
    pub(crate) fn new(fiber: FiberId, sink: Arc<dyn CancellationSink>) -> Self {
        Self {
            cell: Arc::new(ScopeCell::new(fiber, PropertyMap::empty())),
            sink,
            completed: false,
        }
    }

    pub(crate) fn cell(&self) -> Arc<ScopeCell> {
        Arc::clone(&self.cell)
    }

    /// Disarm the guard and return the final inner map.
    pub(crate) fn finish(mut self) -> PropertyMap {
        self.completed = true;
        self.cell.snapshot()
    }
}

impl Drop for IsolatedScope {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let partial = self.cell.snapshot();
        debug!(
            fiber = %self.cell.fiber(),
            keys = partial.len(),
            "annotation scope dropped before completion"
        );
        self.sink.on_cancelled(self.cell.fiber(), partial);
    }
}
