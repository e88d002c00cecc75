//! Launch sequence: show the overlay, then bring up the hotkey

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::supervise::join_error_message;
use crate::hotkey::{HotkeyManager, HotkeyStatus};
use crate::window::WindowPresenter;

/// Longest environment value written to the log
const MAX_ENV_VALUE_LEN: usize = 100;

/// Process facts that explain most accessibility permission problems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentInfo {
    pub executable: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub sandbox_container: Option<String>,
}

impl EnvironmentInfo {
    pub fn collect() -> Self {
        Self {
            executable: std::env::current_exe().ok(),
            working_dir: std::env::current_dir().ok(),
            sandbox_container: std::env::var("APP_SANDBOX_CONTAINER_ID").ok(),
        }
    }

    /// Installed copies get their own accessibility grant
    pub fn from_applications(&self) -> bool {
        self.executable
            .as_deref()
            .is_some_and(|path| path.starts_with("/Applications"))
    }

    pub fn log(&self) {
        info!(
            executable = %display_path(self.executable.as_deref()),
            working_dir = %display_path(self.working_dir.as_deref()),
            from_applications = self.from_applications(),
            sandbox = self.sandbox_container.as_deref().unwrap_or("none"),
            home = %env_value("HOME"),
            user = %env_value("USER"),
            tmpdir = %env_value("TMPDIR"),
            path = %env_value("PATH"),
            "environment info"
        );
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn env_value(key: &str) -> String {
    truncate(std::env::var(key).unwrap_or_default(), MAX_ENV_VALUE_LEN)
}

fn truncate(mut value: String, max: usize) -> String {
    if value.len() > max {
        let mut end = max;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
        value.push_str("...");
    }
    value
}

/// Show the window on the display under the pointer, wait `delay`, then
/// run hotkey setup
pub async fn launch(
    presenter: Arc<WindowPresenter>,
    hotkeys: Arc<HotkeyManager>,
    delay: Duration,
) -> HotkeyStatus {
    match tokio::task::spawn_blocking(move || presenter.show_on_current_display()).await {
        Ok(()) => info!("window shown on current display"),
        Err(e) => warn!(error = %join_error_message(e), "failed to show window at launch"),
    }

    tokio::time::sleep(delay).await;

    info!("initializing hotkey setup...");
    let status = hotkeys.setup().await;
    info!(%status, "hotkey setup finished");
    status
}
