//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::hotkey::HotkeyCombo;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Pause between showing the window at launch and hotkey setup
    pub startup_delay: Duration,

    pub hotkey: HotkeyConfig,

    pub window: WindowConfig,
}

/// Timings and limits for the hotkey lifecycle
#[derive(Debug, Clone)]
pub struct HotkeyConfig {
    /// Global activation key
    pub combo: HotkeyCombo,

    /// Bound on the whole setup phase (permission check plus registration)
    pub setup_timeout: Duration,

    /// Bound on a single permission check
    pub permission_timeout: Duration,

    /// Registration attempts before giving up
    pub register_attempts: u32,

    /// First retry delay; doubles after each failed attempt
    pub initial_backoff: Duration,

    /// Minimum spacing between accepted activations
    pub debounce: Duration,

    /// Wait before prompting for permission after a denial
    pub permission_request_delay: Duration,

    /// Wait before restarting a listener that died
    pub restart_delay: Duration,

    /// Listener restarts allowed per setup run
    pub max_listener_restarts: u32,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            combo: HotkeyCombo::CTRL_SPACE,
            setup_timeout: Duration::from_secs(30),
            permission_timeout: Duration::from_secs(10),
            register_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            debounce: Duration::from_millis(200),
            permission_request_delay: Duration::from_secs(2),
            restart_delay: Duration::from_secs(5),
            max_listener_restarts: 3,
        }
    }
}

/// Overlay window geometry and activation behavior
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,

    /// How long the window stays always-on-top after an activation
    pub always_on_top_clear: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 450,
            height: 145,
            always_on_top_clear: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Self::from_lookup(&home, |key| std::env::var(key).ok())
    }

    /// Build configuration from a home directory and an environment lookup
    pub fn from_lookup<F>(home: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("flik");

        let socket_path = lookup("FLIK_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let defaults = HotkeyConfig::default();
        let hotkey = HotkeyConfig {
            setup_timeout: millis(&lookup, "FLIK_SETUP_TIMEOUT_MS", defaults.setup_timeout)?,
            permission_timeout: millis(
                &lookup,
                "FLIK_PERMISSION_TIMEOUT_MS",
                defaults.permission_timeout,
            )?,
            register_attempts: match lookup("FLIK_REGISTER_ATTEMPTS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid FLIK_REGISTER_ATTEMPTS: {raw:?}"))?,
                None => defaults.register_attempts,
            },
            debounce: millis(&lookup, "FLIK_DEBOUNCE_MS", defaults.debounce)?,
            ..defaults
        };

        Ok(Self {
            socket_path,
            data_dir,
            startup_delay: Duration::from_millis(500),
            hotkey,
            window: WindowConfig::default(),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn millis<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup("/Users/test", |_| None).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/Users/test/.local/share/flik/daemon.sock")
        );
        assert_eq!(config.hotkey.setup_timeout, Duration::from_secs(30));
        assert_eq!(config.hotkey.register_attempts, 3);
        assert_eq!(config.hotkey.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.hotkey.debounce, Duration::from_millis(200));
        assert_eq!(config.window.width, 450);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup("/Users/test", |key| match key {
            "FLIK_SOCKET" => Some("/tmp/flik.sock".to_string()),
            "FLIK_DEBOUNCE_MS" => Some("350".to_string()),
            "FLIK_REGISTER_ATTEMPTS" => Some(" 5 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/flik.sock"));
        assert_eq!(config.hotkey.debounce, Duration::from_millis(350));
        assert_eq!(config.hotkey.register_attempts, 5);
    }

    #[test]
    fn test_invalid_override_is_an_error() {
        let result = Config::from_lookup("/Users/test", |key| {
            (key == "FLIK_SETUP_TIMEOUT_MS").then(|| "soon".to_string())
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("FLIK_SETUP_TIMEOUT_MS"));
    }
}
