//! flik: background daemon for a modal display and space navigation overlay
//!
//! This daemon runs as a LaunchAgent and provides:
//! - Global Ctrl+Space activation via CGEventTap, with permission gating,
//!   retrying registration and a supervised listener
//! - A modal command processor (Main / WindowNav / DisplayNav) with
//!   numeric repeat counts
//! - IPC server for the overlay UI: key presses in, status and window
//!   commands out

mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod permission;
mod platform;
mod state;
mod status;
mod window;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::UiEvent;
use crate::hotkey::{HotkeyManager, HotkeyStatus};
use crate::ipc::{Server, Services, UiBridge};
use crate::lifecycle::{EnvironmentInfo, ShutdownSignal};
use crate::permission::PermissionGate;
use crate::state::{Collaborators, CommandProcessor};
use crate::status::StatusProjection;
use crate::window::WindowPresenter;

/// Key presses queued ahead of the command processor
const KEY_QUEUE_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "flik starting");

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");
    EnvironmentInfo::collect().log();

    let mut shutdown = ShutdownSignal::install()?;

    // Window commands, alerts and mode changes -> subscribed UI clients
    let (event_tx, _event_rx) = broadcast::channel::<UiEvent>(64);
    let bridge = Arc::new(UiBridge::new(event_tx.clone()));
    let platform = platform::native();

    let presenter = Arc::new(WindowPresenter::new(
        platform.displays.clone(),
        bridge.clone(),
        config.window.clone(),
    ));

    let permission = PermissionGate::new(platform.permission.clone());
    let hotkeys = Arc::new(HotkeyManager::new(
        config.hotkey.clone(),
        permission.clone(),
        platform.hotkeys.clone(),
        presenter.clone(),
        bridge.clone(),
    ));

    let processor = CommandProcessor::new(
        Collaborators {
            audio: platform.audio.clone(),
            displays: platform.displays.clone(),
            spaces: platform.spaces.clone(),
            window: bridge,
        },
        event_tx.clone(),
    );
    let status = StatusProjection::new(
        hotkeys.subscribe(),
        processor.subscribe(),
        platform.audio.clone(),
    );
    let commands = processor.spawn(KEY_QUEUE_CAPACITY)?;

    let server = Server::new(
        &config.socket_path,
        Services {
            status,
            commands,
            presenter: presenter.clone(),
            hotkeys: hotkeys.clone(),
            permission,
            permission_timeout: config.hotkey.permission_timeout,
            events: event_tx.clone(),
        },
    )?;

    let status_forwarder = tokio::spawn(forward_hotkey_status(hotkeys.subscribe(), event_tx));

    // Let the UI come up before any permission prompt can appear
    let setup = tokio::spawn(lifecycle::launch(
        presenter.clone(),
        hotkeys.clone(),
        config.startup_delay,
    ));

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        signal = shutdown.recv() => {
            info!(%signal, "shutdown signal received");
        }
    }

    info!("shutting down...");

    setup.abort();
    hotkeys.shutdown();
    status_forwarder.abort();
    server.shutdown().await;

    info!("flik stopped");

    Ok(())
}

/// Mirror hotkey status changes to the UI
async fn forward_hotkey_status(
    mut status_rx: watch::Receiver<HotkeyStatus>,
    event_tx: broadcast::Sender<UiEvent>,
) {
    while status_rx.changed().await.is_ok() {
        let status = *status_rx.borrow_and_update();
        let _ = event_tx.send(UiEvent::HotkeyStatusChanged { status });
    }
}
