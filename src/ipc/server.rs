//! Unix domain socket server for IPC
//!
//! Provides request-response communication with the UI and pushes UI
//! events (window commands, alerts, mode changes) to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::UiEvent;
use crate::hotkey::HotkeyManager;
use crate::lifecycle::supervise::join_error_message;
use crate::permission::PermissionGate;
use crate::state::{CommandHandle, KeyToken};
use crate::status::StatusProjection;
use crate::window::WindowPresenter;

use super::protocol::{Notification, Request, Response, MAX_FRAME_LEN};

/// Everything a request handler may touch
pub struct Services {
    pub status: StatusProjection,
    pub commands: CommandHandle,
    pub presenter: Arc<WindowPresenter>,
    pub hotkeys: Arc<HotkeyManager>,
    pub permission: PermissionGate,
    pub permission_timeout: Duration,
    pub events: broadcast::Sender<UiEvent>,
}

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    services: Arc<Services>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket, replacing a stale one
    pub fn new(socket_path: &Path, services: Services) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            services: Arc::new(services),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let services = Arc::clone(&self.services);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, services) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, services: Arc<Services>) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let mut forwarder = None;

        let result = Self::serve(&mut reader, &writer, &services, &mut forwarder).await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        result
    }

    async fn serve(
        reader: &mut OwnedReadHalf,
        writer: &SharedWriter,
        services: &Services,
        forwarder: &mut Option<JoinHandle<()>>,
    ) -> Result<()> {
        while let Some(frame) = read_frame(reader).await? {
            let request: Request = match serde_json::from_slice(&frame) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "malformed request");
                    let response = Response::error("invalid_request", e.to_string());
                    send_message(writer, &response).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            if request == Request::Subscribe {
                let events = services.events.subscribe();
                send_message(writer, &Response::Subscribed).await?;
                if forwarder.is_none() {
                    debug!("client subscribed to notifications");
                    *forwarder = Some(spawn_forwarder(events, Arc::clone(writer)));
                }
                continue;
            }

            let response = Self::process_request(request, services).await;
            send_message(writer, &response).await?;
        }

        debug!("client disconnected");
        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(request: Request, services: &Services) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(services.status.snapshot()),

            Request::KeyPress { key } => {
                match services.commands.press(KeyToken::parse(&key)).await {
                    Ok(outcome) => Response::KeyResult { outcome },
                    Err(e) => Response::error("processor_unavailable", e.to_string()),
                }
            }

            Request::Show => {
                let presenter = Arc::clone(&services.presenter);
                match tokio::task::spawn_blocking(move || presenter.show_on_current_display()).await {
                    Ok(()) => Response::Shown,
                    Err(e) => Response::error("show_failed", join_error_message(e)),
                }
            }

            Request::Hide => {
                services.presenter.hide();
                Response::Hidden
            }

            Request::RetryHotkey => {
                info!("manual hotkey retry requested");
                Response::HotkeyRetry {
                    status: services.hotkeys.retry(),
                }
            }

            Request::CheckPermission => {
                let check = services.permission.check(services.permission_timeout).await;
                Response::Permission {
                    granted: check.is_granted(),
                }
            }

            Request::ScreenInfo => {
                let presenter = Arc::clone(&services.presenter);
                match tokio::task::spawn_blocking(move || presenter.screen_info()).await {
                    Ok(Ok(info)) => Response::ScreenInfo(info),
                    Ok(Err(e)) => Response::error("screen_info_failed", e.to_string()),
                    Err(e) => Response::error("screen_info_failed", join_error_message(e)),
                }
            }

            // Answered in `serve`, which owns the connection's writer
            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read one length-prefixed frame; `None` means the client is gone
async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<T: Serialize>(writer: &SharedWriter, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    let mut writer = writer.lock().await;
    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

/// Push UI events to one subscribed client until it goes away
fn spawn_forwarder(
    mut events: broadcast::Receiver<UiEvent>,
    writer: SharedWriter,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = send_message(&writer, &Notification::Event { event }).await {
                        debug!(?e, "subscriber write failed, stopping notifications");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged behind UI events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Value;

    use crate::config::{HotkeyConfig, WindowConfig};
    use crate::ipc::UiBridge;
    use crate::platform::fake::{FakeAudio, FakeDisplays, FakeHotkeys, FakePermission, FakeSpaces};
    use crate::platform::DisplayDescriptor;
    use crate::state::{Collaborators, CommandProcessor};

    static SOCKET_ID: AtomicUsize = AtomicUsize::new(0);

    fn socket_path() -> PathBuf {
        let id = SOCKET_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("flik-test-{}-{id}.sock", std::process::id()))
    }

    fn start_server() -> (Arc<Server>, PathBuf) {
        let (event_tx, _) = broadcast::channel(64);
        let bridge = Arc::new(UiBridge::new(event_tx.clone()));
        let audio = Arc::new(FakeAudio::default());
        let displays = Arc::new(FakeDisplays::with_displays(vec![DisplayDescriptor::new(
            "builtin", 0.0, 0.0, 1440.0, 900.0,
        )]));

        let presenter = Arc::new(WindowPresenter::new(
            displays.clone(),
            bridge.clone(),
            WindowConfig::default(),
        ));
        let permission = PermissionGate::new(Arc::new(FakePermission::granted()));
        let hotkeys = Arc::new(HotkeyManager::new(
            HotkeyConfig::default(),
            permission.clone(),
            Arc::new(FakeHotkeys::succeeding()),
            presenter.clone(),
            bridge.clone(),
        ));

        let processor = CommandProcessor::new(
            Collaborators {
                audio: audio.clone(),
                displays,
                spaces: Arc::new(FakeSpaces::default()),
                window: bridge,
            },
            event_tx.clone(),
        );
        let status = StatusProjection::new(hotkeys.subscribe(), processor.subscribe(), audio);
        let commands = processor.spawn(8).unwrap();

        let path = socket_path();
        let server = Arc::new(
            Server::new(
                &path,
                Services {
                    status,
                    commands,
                    presenter,
                    hotkeys,
                    permission,
                    permission_timeout: Duration::from_secs(1),
                    events: event_tx,
                },
            )
            .unwrap(),
        );

        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        (server, path)
    }

    async fn send_raw(stream: &mut UnixStream, body: &[u8]) {
        stream
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(body).await.unwrap();
    }

    async fn request(stream: &mut UnixStream, body: &str) -> Value {
        send_raw(stream, body.as_bytes()).await;
        receive(stream).await
    }

    async fn receive(stream: &mut UnixStream) -> Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let (server, path) = start_server();
        let mut client = UnixStream::connect(&path).await.unwrap();

        assert_eq!(request(&mut client, r#"{"type":"ping"}"#).await["type"], "pong");

        let status = request(&mut client, r#"{"type":"get_status"}"#).await;
        assert_eq!(status["type"], "status");
        assert_eq!(status["hotkeyStatus"], "disabled");
        assert_eq!(status["currentMode"], "main");
        assert_eq!(status["numberBuffer"], "");

        server.shutdown().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_key_presses_drive_processor() {
        let (server, path) = start_server();
        let mut client = UnixStream::connect(&path).await.unwrap();

        let result = request(&mut client, r#"{"type":"key_press","key":"d"}"#).await;
        assert_eq!(result["type"], "key_result");
        assert_eq!(result["outcome"]["kind"], "mode_changed");
        assert_eq!(result["outcome"]["mode"], "display");

        request(&mut client, r#"{"type":"key_press","key":"4"}"#).await;
        let status = request(&mut client, r#"{"type":"get_status"}"#).await;
        assert_eq!(status["currentMode"], "display");
        assert_eq!(status["numberBuffer"], "4");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_request_keeps_connection() {
        let (server, path) = start_server();
        let mut client = UnixStream::connect(&path).await.unwrap();

        let error = request(&mut client, "not json").await;
        assert_eq!(error["type"], "error");
        assert_eq!(error["code"], "invalid_request");

        assert_eq!(request(&mut client, r#"{"type":"ping"}"#).await["type"], "pong");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_oversized_frame_disconnects() {
        let (server, path) = start_server();
        let mut client = UnixStream::connect(&path).await.unwrap();

        client
            .write_all(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_receives_window_events() {
        let (server, path) = start_server();
        let mut client = UnixStream::connect(&path).await.unwrap();

        assert_eq!(
            request(&mut client, r#"{"type":"subscribe"}"#).await["type"],
            "subscribed"
        );

        send_raw(&mut client, br#"{"type":"key_press","key":"Escape"}"#).await;

        // The hide push and the key result may arrive in either order
        let mut kinds = Vec::new();
        for _ in 0..2 {
            let message = receive(&mut client).await;
            match message["type"].as_str() {
                Some("event") => kinds.push(message["event"]["type"].as_str().unwrap().to_string()),
                Some(other) => kinds.push(other.to_string()),
                None => panic!("untyped message"),
            }
        }
        kinds.sort();
        assert_eq!(kinds, vec!["key_result".to_string(), "window_hide".to_string()]);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_screen_info_and_permission() {
        let (server, path) = start_server();
        let mut client = UnixStream::connect(&path).await.unwrap();

        let info = request(&mut client, r#"{"type":"screen_info"}"#).await;
        assert_eq!(info["type"], "screen_info");
        assert_eq!(info["displayCount"], 1);
        assert_eq!(info["currentDisplay"]["id"], "builtin");

        let permission = request(&mut client, r#"{"type":"check_permission"}"#).await;
        assert_eq!(permission["granted"], true);

        server.shutdown().await;
    }
}
