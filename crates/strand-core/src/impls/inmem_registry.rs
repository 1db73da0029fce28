//! InMemoryFiberRegistry - プロセス内の fiber registry
//!
//! # 実装詳細
//! - `RwLock<Records>` で管理（ロック区間に await はない）
//! - 生きている fiber は ScopeCell を保持し、lookup のたびにその時点の snapshot を読む
//! - 終了時に supervision set を snapshot して tombstone に置き換え、ScopeCell は手放す
//!
//! # tombstone の保持ルール
//! tombstone は次のどちらかが成り立つ間だけ残ります。
//! - 親 fiber がまだ running（親から status を引ける）
//! - 記録された children をたどって running の fiber に届く（孫が supervision から消えない）
//!
//! どちらも成り立たなくなった tombstone は `mark_terminated` の中で自動的に回収されます。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::domain::{
    FiberId, FiberState, FiberStatusView, Property, RegistryCounts, ScopeCell,
    SupervisedFiberSet,
};
use crate::ports::{Clock, FiberEntry, FiberRegistry, SystemClock};

enum Record {
    Live {
        cell: Arc<ScopeCell>,
        parent: Option<FiberId>,
        started_at: DateTime<Utc>,
    },
    Tombstone {
        children: SupervisedFiberSet,
        parent: Option<FiberId>,
        started_at: DateTime<Utc>,
        terminated_at: DateTime<Utc>,
    },
}

impl Record {
    fn entry(&self) -> FiberEntry {
        match self {
            Record::Live { cell, .. } => FiberEntry {
                state: FiberState::Running,
                children: cell.get(Property::fibers()),
            },
            Record::Tombstone { children, .. } => FiberEntry {
                state: FiberState::Terminated,
                children: children.clone(),
            },
        }
    }

    fn view(&self) -> FiberStatusView {
        match self {
            Record::Live {
                parent, started_at, ..
            } => FiberStatusView {
                state: FiberState::Running,
                parent: *parent,
                started_at: *started_at,
                terminated_at: None,
            },
            Record::Tombstone {
                parent,
                started_at,
                terminated_at,
                ..
            } => FiberStatusView {
                state: FiberState::Terminated,
                parent: *parent,
                started_at: *started_at,
                terminated_at: Some(*terminated_at),
            },
        }
    }

    fn parent(&self) -> Option<FiberId> {
        match self {
            Record::Live { parent, .. } | Record::Tombstone { parent, .. } => *parent,
        }
    }

    fn is_live(&self) -> bool {
        matches!(self, Record::Live { .. })
    }
}

#[derive(Default)]
struct Records {
    by_id: HashMap<FiberId, Record>,
    /// parent -> fibers spawned by it (tracked or detached)
    offspring: HashMap<FiberId, HashSet<FiberId>>,
}

impl Records {
    /// Whether the recorded children of `fiber` reach a running fiber.
    fn reaches_live(&self, fiber: FiberId) -> bool {
        let mut visited: HashSet<FiberId> = HashSet::new();
        let mut pending = vec![fiber];

        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(Record::Tombstone { children, .. }) = self.by_id.get(&current) else {
                continue;
            };
            for child in children.iter() {
                match self.by_id.get(&child) {
                    Some(Record::Live { .. }) => return true,
                    Some(Record::Tombstone { .. }) => pending.push(child),
                    None => {}
                }
            }
        }
        false
    }

    fn parent_is_live(&self, fiber: FiberId) -> bool {
        self.by_id
            .get(&fiber)
            .and_then(Record::parent)
            .and_then(|parent| self.by_id.get(&parent))
            .is_some_and(Record::is_live)
    }

    fn is_reclaimable(&self, fiber: FiberId) -> bool {
        match self.by_id.get(&fiber) {
            Some(Record::Tombstone { .. }) => {
                !self.parent_is_live(fiber) && !self.reaches_live(fiber)
            }
            _ => false,
        }
    }

    fn remove(&mut self, fiber: FiberId) {
        if let Some(parent) = self.by_id.remove(&fiber).and_then(|r| r.parent())
            && let Some(siblings) = self.offspring.get_mut(&parent)
        {
            siblings.remove(&fiber);
            if siblings.is_empty() {
                self.offspring.remove(&parent);
            }
        }
        self.offspring.remove(&fiber);
    }

    /// Re-check everything whose retention may depend on `fiber` having ended:
    /// the fiber itself, what it spawned, and its chain of ancestors.
    fn reclaim_around(&mut self, fiber: FiberId) -> usize {
        let mut candidates: Vec<FiberId> = vec![fiber];
        candidates.extend(self.offspring.get(&fiber).into_iter().flatten().copied());

        let mut ancestor = self.by_id.get(&fiber).and_then(Record::parent);
        let mut seen = HashSet::from([fiber]);
        while let Some(id) = ancestor {
            if !seen.insert(id) {
                break;
            }
            match self.by_id.get(&id) {
                Some(record @ Record::Tombstone { .. }) => {
                    candidates.push(id);
                    ancestor = record.parent();
                }
                _ => break,
            }
        }

        let mut reclaimed = 0;
        for id in candidates {
            if self.is_reclaimable(id) {
                self.remove(id);
                reclaimed += 1;
            }
        }
        reclaimed
    }
}

/// InMemoryFiberRegistry は単一プロセス用の registry
///
/// # 使用例
/// ```ignore
/// let registry = Arc::new(InMemoryFiberRegistry::new());
/// let service = AnnotationServiceBuilder::new().registry(registry.clone()).build()?;
/// ```
pub struct InMemoryFiberRegistry {
    records: RwLock<Records>,
    clock: Arc<dyn Clock>,
}

impl InMemoryFiberRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(Records::default()),
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryFiberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FiberRegistry for InMemoryFiberRegistry {
    fn register(&self, fiber: FiberId, parent: Option<FiberId>, cell: Arc<ScopeCell>) {
        let started_at = self.clock.now();
        let mut records = self.write();
        records.by_id.insert(
            fiber,
            Record::Live {
                cell,
                parent,
                started_at,
            },
        );
        if let Some(parent) = parent {
            records.offspring.entry(parent).or_default().insert(fiber);
        }
        trace!(fiber = %fiber, "fiber registered");
    }

    fn mark_terminated(&self, fiber: FiberId) {
        let terminated_at = self.clock.now();
        let mut records = self.write();
        let Some(record) = records.by_id.get_mut(&fiber) else {
            return;
        };
        let Record::Live {
            cell,
            parent,
            started_at,
        } = record
        else {
            return;
        };
        let tombstone = Record::Tombstone {
            children: cell.get(Property::fibers()),
            parent: *parent,
            started_at: *started_at,
            terminated_at,
        };
        *record = tombstone;

        let reclaimed = records.reclaim_around(fiber);
        trace!(fiber = %fiber, reclaimed, "fiber terminated");
    }

    fn lookup(&self, fiber: FiberId) -> Option<FiberEntry> {
        self.read().by_id.get(&fiber).map(Record::entry)
    }

    fn status(&self, fiber: FiberId) -> Option<FiberStatusView> {
        self.read().by_id.get(&fiber).map(Record::view)
    }

    fn counts(&self) -> RegistryCounts {
        self.read()
            .by_id
            .values()
            .fold(RegistryCounts::default(), |mut counts, record| {
                match record {
                    Record::Live { .. } => counts.running += 1,
                    Record::Tombstone { .. } => counts.terminated += 1,
                }
                counts
            })
    }

    /// Drops tombstones kept only for their status view. Tombstones that are
    /// still the path to a running descendant stay.
    fn prune_terminated(&self) -> usize {
        let mut records = self.write();
        let prunable: Vec<FiberId> = records
            .by_id
            .iter()
            .filter(|(_, record)| !record.is_live())
            .map(|(id, _)| *id)
            .filter(|id| !records.reaches_live(*id))
            .collect();
        for id in &prunable {
            records.remove(*id);
        }
        prunable.len()
    }
}
