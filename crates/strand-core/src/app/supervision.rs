//! Supervision - 子孫 fiber 集合の平坦化
//!
//! `Property::fibers()` の set から出発し、registry で各ハンドルの入れ子 set を引いて
//! 到達可能なハンドルをすべて集めます。visited set で重複を除くので循環しても止まります。

use std::collections::HashSet;

use super::config::LivenessFilter;
use crate::domain::{FiberId, SupervisedFiberSet};
use crate::ports::FiberRegistry;

/// Flatten `roots` into every handle reachable through `registry`, minus `caller`.
pub fn flatten(
    roots: &SupervisedFiberSet,
    caller: Option<FiberId>,
    registry: &dyn FiberRegistry,
    filter: LivenessFilter,
) -> SupervisedFiberSet {
    let mut visited: HashSet<FiberId> = HashSet::new();
    let mut pending: Vec<FiberId> = roots.iter().collect();
    let mut reachable = SupervisedFiberSet::empty();

    while let Some(fiber) = pending.pop() {
        if !visited.insert(fiber) {
            continue;
        }

        match registry.lookup(fiber) {
            Some(entry) => {
                if entry.state.is_live() || filter == LivenessFilter::All {
                    reachable.insert(fiber);
                }
                pending.extend(entry.children.iter().filter(|c| !visited.contains(c)));
            }
            // pruned or never registered here: nothing to walk
            None => {
                if filter == LivenessFilter::All {
                    reachable.insert(fiber);
                }
            }
        }
    }

    if let Some(caller) = caller {
        reachable.remove(&caller);
    }
    reachable
}
