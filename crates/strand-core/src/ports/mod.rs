//! Ports - 抽象化レイヤー
//!
//! annotation サービスが外部から受け取る能力（capability）を trait で定義します。
//! 実装は `impls` に置き、`AnnotationServiceBuilder` で差し替えます。

pub mod cancellation_sink;
pub mod clock;
pub mod fiber_registry;
pub mod id_generator;

pub use self::cancellation_sink::CancellationSink;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::fiber_registry::{FiberEntry, FiberRegistry};
pub use self::id_generator::{IdGenerator, UlidGenerator};
