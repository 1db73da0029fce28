//! State - fiber の状態

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// FiberState は registry から見た fiber の状態
///
/// # 状態遷移
/// - running: 登録済みで実行中
/// - terminated: 正常終了・失敗・abort・panic のいずれかで終了
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FiberState {
    Running,
    Terminated,
}

impl FiberState {
    pub fn is_live(&self) -> bool {
        matches!(self, FiberState::Running)
    }
}

/// Point-in-time view of one registered fiber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiberStatusView {
    pub state: FiberState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<super::ids::FiberId>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<DateTime<Utc>>,
}

/// Registry-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCounts {
    pub running: usize,
    pub terminated: usize,
}
