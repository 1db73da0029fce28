//! CancellationSink の実装
//!
//! - **NoopCancellationSink**: 何もしない（デフォルト）
//! - **CollectingCancellationSink**: メモリに溜める（テスト・診断用）

use std::sync::{Mutex, PoisonError};

use crate::domain::{FiberId, PropertyMap};
use crate::ports::CancellationSink;

#[derive(Debug, Default)]
pub struct NoopCancellationSink;

impl CancellationSink for NoopCancellationSink {
    fn on_cancelled(&self, _fiber: FiberId, _partial: PropertyMap) {}
}

/// Keeps every partial map it receives, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingCancellationSink {
    received: Mutex<Vec<(FiberId, PropertyMap)>>,
}

impl CollectingCancellationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<(FiberId, PropertyMap)> {
        std::mem::take(&mut *self.received.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CancellationSink for CollectingCancellationSink {
    fn on_cancelled(&self, fiber: FiberId, partial: PropertyMap) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((fiber, partial));
    }
}
