//! strand-core
//!
//! Scoped, typed annotations for fibers running on tokio.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, PropertyKey, PropertyMap, ScopeCell, SupervisedFiberSet, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, FiberRegistry, CancellationSink）
//! - **impls**: ports の実装（InMemoryFiberRegistry など）
//! - **app**: AnnotationService とその builder・設定

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{AnnotationService, AnnotationServiceBuilder, FiberHandle, ServiceConfig};
pub use domain::{Annotated, FiberId, Property, PropertyKey, PropertyMap, SupervisedFiberSet};

#[cfg(test)]
pub(crate) mod test_support {
    use tracing_subscriber::EnvFilter;

    /// `RUST_LOG=strand_core=trace cargo test` で service のログが見える
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}
