//! AnnotationService - fiber スコープ付きプロパティのサービス
//!
//! # 主要操作
//! - `add_property` / `get`: 呼び出し元 fiber の現在の scope を読み書き
//! - `with_annotation`: 計算を空の scope で隔離し、結果と一緒に map を返す
//! - `supervised_fibers`: 子孫 fiber 集合（自分自身を除く）
//!
//! # fiber の作り方
//! - `run`: 新しいルート fiber としてサービス環境に入る
//! - `spawn` / `spawn_detached`: copy-on-fork で子 fiber を起動する

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace, warn};

use super::config::ServiceConfig;
use super::scope::{self, IsolatedScope};
use super::supervision;
use crate::domain::{
    Annotated, FiberId, FiberStatusView, Property, PropertyKey, PropertyMap, PropertyValue,
    RegistryCounts, ScopeCell, SupervisedFiberSet,
};
use crate::ports::{CancellationSink, FiberRegistry, IdGenerator};

pub(crate) struct Inner {
    pub(crate) config: ServiceConfig,
    pub(crate) registry: Arc<dyn FiberRegistry>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) cancellation_sink: Arc<dyn CancellationSink>,
}

/// Scoped annotation capability handed to every fiber.
///
/// Cloning is cheap; all clones share the same registry and ports.
///
/// # 使用例
/// ```ignore
/// let service = AnnotationServiceBuilder::new().build()?;
/// service.run(async {
///     service.add_property(&RETRIES, 1);
///     let (value, annotations) = service.with_annotation(step()).await?;
///     Ok(value)
/// }).await
/// ```
#[derive(Clone)]
pub struct AnnotationService {
    inner: Arc<Inner>,
}

impl AnnotationService {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<dyn FiberRegistry> {
        &self.inner.registry
    }

    /// Fold `value` into the calling fiber's current scope.
    ///
    /// Outside any fiber scope the call is ignored.
    pub fn add_property<V: PropertyValue>(&self, key: &PropertyKey<V>, value: V) {
        match scope::current() {
            Some(cell) => {
                cell.annotate(key, value);
                trace!(fiber = %cell.fiber(), key = key.name(), "property added");
            }
            None => {
                warn!(key = key.name(), "add_property called outside a fiber scope; ignored");
            }
        }
    }

    /// Current value for `key`, or its initial value.
    pub fn get<V: PropertyValue>(&self, key: &PropertyKey<V>) -> V {
        match scope::current() {
            Some(cell) => cell.get(key),
            None => key.initial().clone(),
        }
    }

    /// Fold a captured map (e.g. a child's annotations) into the current scope.
    pub fn merge_annotations(&self, annotations: &PropertyMap) {
        match scope::current() {
            Some(cell) => {
                cell.merge(annotations);
                trace!(fiber = %cell.fiber(), keys = annotations.len(), "annotations merged");
            }
            None => {
                warn!("merge_annotations called outside a fiber scope; ignored");
            }
        }
    }

    /// Copy of the calling fiber's current map.
    pub fn snapshot(&self) -> PropertyMap {
        scope::current()
            .map(|cell| cell.snapshot())
            .unwrap_or_default()
    }

    pub fn current_fiber(&self) -> Option<FiberId> {
        scope::current().map(|cell| cell.fiber())
    }

    /// Run `computation` against a fresh, empty scope.
    ///
    /// The caller's scope is back in place once this returns, and also when
    /// the returned future is dropped early. In the latter case the partial
    /// inner map goes to the configured `CancellationSink`.
    pub async fn with_annotation<F, T, E>(
        &self,
        computation: F,
    ) -> Result<(T, PropertyMap), Annotated<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let fiber = self
            .current_fiber()
            .unwrap_or_else(|| self.inner.ids.generate_fiber_id());
        let isolated = IsolatedScope::new(fiber, Arc::clone(&self.inner.cancellation_sink));

        let result = scope::enter(isolated.cell(), computation).await;
        let annotations = isolated.finish();

        debug!(
            fiber = %fiber,
            ok = result.is_ok(),
            keys = annotations.len(),
            "annotation scope closed"
        );
        match result {
            Ok(value) => Ok((value, annotations)),
            Err(error) => Err(Annotated::new(error, annotations)),
        }
    }

    /// Descendant fibers tracked from the current scope, excluding the caller.
    pub fn supervised_fibers(&self) -> SupervisedFiberSet {
        let Some(cell) = scope::current() else {
            return SupervisedFiberSet::empty();
        };
        let roots = cell.get(Property::fibers());
        if roots.is_empty() {
            return roots;
        }
        supervision::flatten(
            &roots,
            Some(cell.fiber()),
            self.inner.registry.as_ref(),
            self.inner.config.liveness,
        )
    }

    /// Enter the service environment as a new root fiber.
    pub async fn run<F: Future>(&self, future: F) -> F::Output {
        let fiber = self.inner.ids.generate_fiber_id();
        let cell = Arc::new(ScopeCell::new(fiber, PropertyMap::empty()));
        self.inner.registry.register(fiber, None, Arc::clone(&cell));
        let _exit = FiberExit::new(fiber, Arc::clone(&self.inner.registry));

        debug!(fiber = %fiber, "root fiber started");
        scope::enter(cell, future).await
    }

    /// Fork a child fiber. It is recorded under the caller's
    /// `Property::fibers()` when `track_children` is enabled.
    pub fn spawn<F>(&self, future: F) -> FiberHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.fork(future, self.inner.config.track_children)
    }

    /// Fork a child fiber that is never recorded under the caller.
    pub fn spawn_detached<F>(&self, future: F) -> FiberHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.fork(future, false)
    }

    fn fork<F>(&self, future: F, track: bool) -> FiberHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let parent = scope::current();
        let child = self.inner.ids.generate_fiber_id();

        // copy-on-fork; the child supervises only its own descendants
        let inherited = parent
            .as_ref()
            .map(|cell| cell.snapshot().without(Property::fibers().id()))
            .unwrap_or_default();
        let cell = Arc::new(ScopeCell::new(child, inherited));

        let parent_id = parent.as_ref().map(|cell| cell.fiber());
        self.inner
            .registry
            .register(child, parent_id, Arc::clone(&cell));
        if track && let Some(parent) = &parent {
            parent.annotate(Property::fibers(), SupervisedFiberSet::single(child));
        }

        debug!(
            fiber = %child,
            parent = ?parent_id,
            tracked = track && parent.is_some(),
            "fiber spawned"
        );

        let exit = FiberExit::new(child, Arc::clone(&self.inner.registry));
        let join = tokio::spawn(async move {
            let _exit = exit;
            scope::enter(cell, future).await
        });
        FiberHandle { fiber: child, join }
    }

    pub fn status(&self, fiber: FiberId) -> Option<FiberStatusView> {
        self.inner.registry.status(fiber)
    }

    pub fn counts(&self) -> RegistryCounts {
        self.inner.registry.counts()
    }
}

/// Marks a fiber terminated in the registry when dropped (completion, abort or panic).
struct FiberExit {
    fiber: FiberId,
    registry: Arc<dyn FiberRegistry>,
}

impl FiberExit {
    fn new(fiber: FiberId, registry: Arc<dyn FiberRegistry>) -> Self {
        Self { fiber, registry }
    }
}

impl Drop for FiberExit {
    fn drop(&mut self) {
        self.registry.mark_terminated(self.fiber);
    }
}

/// Handle to a spawned fiber.
#[derive(Debug)]
pub struct FiberHandle<T> {
    fiber: FiberId,
    join: JoinHandle<T>,
}

impl<T> FiberHandle<T> {
    pub fn id(&self) -> FiberId {
        self.fiber
    }

    pub fn abort(&self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the fiber. Aborted or panicked fibers surface as `JoinError`.
    pub async fn join(self) -> Result<T, JoinError> {
        self.join.await
    }
}
