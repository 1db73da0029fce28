//! AnnotationServiceBuilder - サービスの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ports の差し替え（registry, id generator, clock, cancellation sink）

use std::sync::Arc;

use super::config::ServiceConfig;
use super::service::{AnnotationService, Inner};
use crate::impls::{InMemoryFiberRegistry, NoopCancellationSink};
use crate::ports::{CancellationSink, Clock, FiberRegistry, IdGenerator, SystemClock, UlidGenerator};

/// AnnotationServiceBuilder は AnnotationService を構築
///
/// # 使用例
/// ```ignore
/// let service = AnnotationServiceBuilder::new()
///     .config(ServiceConfig::from_json(raw)?)
///     .cancellation_sink(Arc::new(MySink))
///     .build()?;
/// ```
///
/// 指定しなかった port はデフォルト実装（SystemClock, UlidGenerator,
/// InMemoryFiberRegistry, NoopCancellationSink）で埋めます。
#[derive(Default)]
pub struct AnnotationServiceBuilder {
    config: ServiceConfig,
    clock: Option<Arc<dyn Clock>>,
    registry: Option<Arc<dyn FiberRegistry>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    cancellation_sink: Option<Arc<dyn CancellationSink>>,
}

/// BuildError はサービス構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("report_cancellations is enabled but no cancellation sink was provided")]
    MissingCancellationSink,
}

impl AnnotationServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used by the default id generator and the default registry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn FiberRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    pub fn cancellation_sink(mut self, sink: Arc<dyn CancellationSink>) -> Self {
        self.cancellation_sink = Some(sink);
        self
    }

    /// # 検証
    /// - `report_cancellations` が有効なら sink が必須
    pub fn build(self) -> Result<AnnotationService, BuildError> {
        if self.config.report_cancellations && self.cancellation_sink.is_none() {
            return Err(BuildError::MissingCancellationSink);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(InMemoryFiberRegistry::with_clock(Arc::clone(&clock))));
        let ids = self
            .id_generator
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(AnnotationService::from_inner(Inner {
            config: self.config,
            registry,
            ids,
            cancellation_sink: self
                .cancellation_sink
                .unwrap_or_else(|| Arc::new(NoopCancellationSink)),
        }))
    }
}
