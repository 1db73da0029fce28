//! App - アプリケーション層
//!
//! domain と ports を組み合わせて annotation サービスを実装します。
//!
//! # 主要コンポーネント
//! - **AnnotationServiceBuilder**: サービスの構築とワイヤリング
//! - **AnnotationService**: add_property / get / with_annotation / supervised_fibers
//! - **scope**: fiber-local な ScopeCell（task-local）
//! - **supervision**: supervision tree の平坦化

pub mod builder;
pub mod config;
pub(crate) mod scope;
pub mod service;
pub mod supervision;

pub use self::builder::{AnnotationServiceBuilder, BuildError};
pub use self::config::{ConfigError, LivenessFilter, ServiceConfig};
pub use self::service::{AnnotationService, FiberHandle};
