//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryFiberRegistry**: プロセス内の fiber registry
//! - **NoopCancellationSink** / **CollectingCancellationSink**

pub mod cancellation;
pub mod inmem_registry;

pub use self::cancellation::{CollectingCancellationSink, NoopCancellationSink};
pub use self::inmem_registry::InMemoryFiberRegistry;
