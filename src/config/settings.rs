use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::targets::RebootSetting;

/// Run-wide defaults. Fields with a matching target-file column can be
/// overridden per row; the rest apply to the whole run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Force one-at-a-time dispatch regardless of `concurrency`.
    pub serial: bool,
    /// Worker cap for parallel dispatch. 0 = pool default sizing.
    pub concurrency: usize,
    /// ISO-8601 duration handed through to the remote operation.
    pub maximum_duration: String,
    pub reboot_setting: RebootSetting,
    pub windows_classifications: Vec<String>,
    pub linux_classifications: Vec<String>,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Cadence of the dispatcher's remaining-running progress reports.
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            serial: false,
            concurrency: 0,
            maximum_duration: "PT2H".to_string(),
            reboot_setting: RebootSetting::IfRequired,
            windows_classifications: vec!["Critical".to_string(), "Security".to_string()],
            linux_classifications: vec!["Critical".to_string(), "Security".to_string()],
            report_dir: PathBuf::from("reports"),
            log_dir: PathBuf::from("logs"),
            poll_interval_secs: 5,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::PatchSweepError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
