use crate::error::Result;
use crate::service::{SessionCommand, SessionHandle};
use crate::surface::{Dimensions, SurfaceTarget};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Map a key press to the session commands it triggers, in order
fn commands_for_key(
    code: KeyCode,
    next_surface_id: &AtomicU64,
    surface_size: Dimensions,
) -> Vec<SessionCommand> {
    match code {
        KeyCode::Char('f') | KeyCode::Char(' ') => vec![SessionCommand::RequestAutoFocus],
        KeyCode::Char('x') => vec![SessionCommand::ClearAutoFocus],
        KeyCode::Char('c') => vec![SessionCommand::RequestCapture],
        KeyCode::Char('v') => vec![SessionCommand::RestartPreview],
        KeyCode::Char('p') => vec![SessionCommand::Pause],
        KeyCode::Char('r') => vec![SessionCommand::Resume],
        // A new surface reports its size right away, which starts preview
        KeyCode::Char('s') => {
            let id = next_surface_id.fetch_add(1, Ordering::Relaxed);
            vec![
                SessionCommand::SurfaceReady(SurfaceTarget::new(id, "terminal")),
                SessionCommand::SurfaceResized {
                    width: surface_size.width,
                    height: surface_size.height,
                },
            ]
        }
        KeyCode::Char('g') => vec![SessionCommand::SurfaceGone],
        _ => Vec::new(),
    }
}

/// Keyboard front-end driving a camera session from the terminal
pub struct KeyboardInputHandler {
    session: SessionHandle,
    cancellation_token: CancellationToken,
    next_surface_id: Arc<AtomicU64>,
    surface_size: Dimensions,
}

impl KeyboardInputHandler {
    /// `surface_size` is reported for every surface created from the keyboard
    pub fn new(session: SessionHandle, surface_size: Dimensions) -> Self {
        Self {
            session,
            cancellation_token: CancellationToken::new(),
            next_surface_id: Arc::new(AtomicU64::new(100)),
            surface_size,
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!(
            "Keyboard controls: f focus, x clear focus, c capture, v restart preview, \
             p pause, r resume, s surface ready, g surface gone, i snapshot, q quit"
        );

        let session = self.session.clone();
        let cancellation_token = self.cancellation_token.clone();
        let next_surface_id = Arc::clone(&self.next_surface_id);
        let surface_size = self.surface_size;
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            loop {
                if cancellation_token.is_cancelled() || session.is_shutdown() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match key_event.code {
                            KeyCode::Char('q') | KeyCode::Esc => {
                                info!("Quit key pressed - stopping session");
                                session.shutdown();
                                break;
                            }
                            KeyCode::Char('i') => {
                                let session = session.clone();
                                runtime_handle.spawn(async move {
                                    match session.snapshot().await {
                                        Ok(snapshot) => info!("Session state: {:?}", snapshot),
                                        Err(e) => warn!("Failed to read session state: {}", e),
                                    }
                                });
                            }
                            code => {
                                let commands =
                                    commands_for_key(code, &next_surface_id, surface_size);
                                if commands.is_empty() {
                                    debug!("Key pressed: {:?}", code);
                                    continue;
                                }
                                let session = session.clone();
                                runtime_handle.spawn(async move {
                                    for command in commands {
                                        if let Err(e) = session.send(command).await {
                                            warn!("Failed to send session command: {}", e);
                                            break;
                                        }
                                    }
                                });
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the blocking task a moment to leave raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
