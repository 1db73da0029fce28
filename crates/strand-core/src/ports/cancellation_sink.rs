//! CancellationSink port - 途中で破棄された scope の通知
//!
//! `with_annotation` の計算が完了せずに drop された（abort・timeout・panic）とき、
//! その時点までの PropertyMap をここへ渡します。

use crate::domain::{FiberId, PropertyMap};

/// Receives the partial annotations of a `with_annotation` scope that was torn
/// down before its computation completed.
///
/// Called from a destructor: implementations must not block or panic.
pub trait CancellationSink: Send + Sync {
    fn on_cancelled(&self, fiber: FiberId, partial: PropertyMap);
}
