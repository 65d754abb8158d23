//! Application settings models
//!
//! Settings live on the service; the client fetches them whole and submits
//! partial patches. The update endpoint acknowledges without echoing the
//! new state, so a successful patch is also applied locally.

use serde::{Deserialize, Serialize};

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

impl Default for Theme {
    fn default() -> Self {
        Self::Auto
    }
}

/// Research behavior toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub use_hierarchical: bool,
    #[serde(rename = "enableMCP")]
    pub enable_mcp: bool,
    pub auto_save: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            use_hierarchical: true,
            enable_mcp: true,
            auto_save: false,
        }
    }
}

/// Concurrency and timeout limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSettings {
    pub max_concurrent_tasks: u32,
    /// Per-task timeout in seconds
    pub task_timeout: u64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            task_timeout: 300,
        }
    }
}

/// Full settings document as served by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub performance: PerformanceSettings,
    #[serde(default)]
    pub theme: Theme,
}

/// Partial update to the general section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_hierarchical: Option<bool>,
    #[serde(default, rename = "enableMCP", skip_serializing_if = "Option::is_none")]
    pub enable_mcp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_save: Option<bool>,
}

/// Partial update to the performance section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_tasks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timeout: Option<u64>,
}

/// Partial settings update; unset sections are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformancePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_general(mut self, general: GeneralPatch) -> Self {
        self.general = Some(general);
        self
    }

    pub fn with_performance(mut self, performance: PerformancePatch) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_none() && self.performance.is_none() && self.theme.is_none()
    }
}

impl ClientSettings {
    /// Merge an acknowledged patch into this document
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(general) = &patch.general {
            if let Some(value) = general.use_hierarchical {
                self.general.use_hierarchical = value;
            }
            if let Some(value) = general.enable_mcp {
                self.general.enable_mcp = value;
            }
            if let Some(value) = general.auto_save {
                self.general.auto_save = value;
            }
        }
        if let Some(performance) = &patch.performance {
            if let Some(value) = performance.max_concurrent_tasks {
                self.performance.max_concurrent_tasks = value;
            }
            if let Some(value) = performance.task_timeout {
                self.performance.task_timeout = value;
            }
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}
