use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::layout::{LayoutPolicy, PaneRect};
use super::pane::PaneLimits;
use super::process::ProcessBackend;

/// One pane created at startup
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaneConfig {
    #[serde(flatten)]
    pub rect: PaneRect,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default)]
    pub backend: ProcessBackend,
    #[serde(default)]
    pub layout: LayoutPolicy,
    #[serde(default = "default_scrollback_lines")]
    pub scrollback_lines: usize,
    #[serde(default = "default_history_bytes")]
    pub history_bytes: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_panes")]
    pub panes: Vec<PaneConfig>,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_scrollback_lines() -> usize {
    PaneLimits::default().scrollback_lines
}

fn default_history_bytes() -> usize {
    PaneLimits::default().history_bytes
}

fn default_poll_interval_ms() -> u64 {
    50
}

/// Two side-by-side panes, each echoing its name
pub fn default_panes() -> Vec<PaneConfig> {
    vec![
        PaneConfig {
            rect: PaneRect::new(10, 50, 0, 0),
            command: Some(r#"echo "Pane 1""#.to_string()),
        },
        PaneConfig {
            rect: PaneRect::new(10, 50, 0, 51),
            command: Some(r#"echo "Pane 2""#.to_string()),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            backend: ProcessBackend::default(),
            layout: LayoutPolicy::default(),
            scrollback_lines: default_scrollback_lines(),
            history_bytes: default_history_bytes(),
            poll_interval_ms: default_poll_interval_ms(),
            log_file: None,
            panes: default_panes(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    /// Missing file means defaults; a malformed one is logged and ignored
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    pub fn get_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pmux_config.json")
    }

    pub fn pane_limits(&self) -> PaneLimits {
        PaneLimits {
            scrollback_lines: self.scrollback_lines,
            history_bytes: self.history_bytes,
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
