//! ServiceConfig - annotation サービスの設定
//!
//! JSON から読み込めます。省略したフィールドはデフォルト値になります。
//!
//! ```json
//! { "track_children": true, "liveness": "live_only", "report_cancellations": false }
//! ```

use serde::{Deserialize, Serialize};

/// Which reachable handles `supervised_fibers` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessFilter {
    /// Only fibers the registry reports as running. Terminated fibers are
    /// still walked so their live descendants stay visible.
    #[default]
    LiveOnly,
    /// Every reachable handle, terminated or unknown to the registry.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Record every `spawn`ed child under the parent's `Property::fibers()`.
    pub track_children: bool,
    pub liveness: LivenessFilter,
    /// Require a `CancellationSink` at build time.
    pub report_cancellations: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            track_children: true,
            liveness: LivenessFilter::LiveOnly,
            report_cancellations: false,
        }
    }
}

/// ConfigError は設定の読み込みエラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid service config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ServiceConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}
