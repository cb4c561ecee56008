use crate::driver::{CompletionReceiver, PreviewSink};
use crate::error::{Result, SessionError};
use crate::session::{CameraSessionController, SessionSnapshot};
use crate::surface::SurfaceTarget;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Inputs accepted by a running session
#[derive(Debug)]
pub enum SessionCommand {
    SurfaceReady(SurfaceTarget),
    SurfaceResized { width: u32, height: u32 },
    SurfaceGone,
    Resume,
    Pause,
    RequestAutoFocus,
    ClearAutoFocus,
    RequestCapture,
    ClearCapture,
    StartPreview,
    RestartPreview,
    SetPreviewFrameSink(Option<PreviewSink>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::SurfaceReady(_) => "surface_ready",
            SessionCommand::SurfaceResized { .. } => "surface_resized",
            SessionCommand::SurfaceGone => "surface_gone",
            SessionCommand::Resume => "resume",
            SessionCommand::Pause => "pause",
            SessionCommand::RequestAutoFocus => "request_auto_focus",
            SessionCommand::ClearAutoFocus => "clear_auto_focus",
            SessionCommand::RequestCapture => "request_capture",
            SessionCommand::ClearCapture => "clear_capture",
            SessionCommand::StartPreview => "start_preview",
            SessionCommand::RestartPreview => "restart_preview",
            SessionCommand::SetPreviewFrameSink(_) => "set_preview_frame_sink",
            SessionCommand::Snapshot(_) => "snapshot",
        }
    }
}

/// Runs a controller on a dedicated task.
///
/// Commands and hardware completions are applied one at a time on that task,
/// which is what keeps completions from overlapping a device release.
pub struct SessionService;

impl SessionService {
    pub fn spawn(
        controller: CameraSessionController,
        completions: CompletionReceiver,
        command_capacity: usize,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(command_capacity);
        let cancellation_token = CancellationToken::new();

        let task = tokio::spawn(Self::run(
            controller,
            completions,
            receiver,
            cancellation_token.clone(),
        ));

        let handle = SessionHandle {
            sender,
            cancellation_token,
        };
        (handle, task)
    }

    async fn run(
        mut controller: CameraSessionController,
        mut completions: CompletionReceiver,
        mut commands: mpsc::Receiver<SessionCommand>,
        cancellation_token: CancellationToken,
    ) {
        info!("Camera session task started");

        loop {
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    debug!("Camera session task cancelled");
                    break;
                }
                Some(event) = completions.recv() => {
                    controller.handle_hardware_event(event);
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => Self::apply(&mut controller, command),
                        None => {
                            debug!("All session handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        controller.shutdown();
        info!("Camera session task stopped");
    }

    fn apply(controller: &mut CameraSessionController, command: SessionCommand) {
        debug!("Session command: {}", command.name());
        match command {
            SessionCommand::SurfaceReady(target) => controller.on_surface_ready(target),
            SessionCommand::SurfaceResized { width, height } => {
                controller.on_surface_resized(width, height)
            }
            SessionCommand::SurfaceGone => controller.on_surface_gone(),
            SessionCommand::Resume => controller.resume(),
            SessionCommand::Pause => controller.pause(),
            SessionCommand::RequestAutoFocus => {
                if let Err(e) = controller.request_auto_focus() {
                    warn!("Autofocus request failed: {}", e);
                }
            }
            SessionCommand::ClearAutoFocus => controller.clear_auto_focus(),
            SessionCommand::RequestCapture => {
                if let Err(e) = controller.request_capture() {
                    warn!("Capture request failed: {}", e);
                }
            }
            SessionCommand::ClearCapture => controller.clear_capture(),
            SessionCommand::StartPreview => {
                if let Err(e) = controller.start_preview() {
                    warn!("Failed to start preview: {}", e);
                }
            }
            SessionCommand::RestartPreview => {
                if let Err(e) = controller.restart_preview() {
                    warn!("Failed to restart preview: {}", e);
                }
            }
            SessionCommand::SetPreviewFrameSink(sink) => {
                controller.set_preview_frame_sink(sink);
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(controller.snapshot());
            }
        }
    }
}

/// Cloneable front-end to a running [`SessionService`]
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    cancellation_token: CancellationToken,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.sender.send(command).await.map_err(|e| {
            SessionError::component(
                "session".to_string(),
                format!("task stopped before {} was applied", e.0.name()),
            )
        })
    }

    pub async fn surface_ready(&self, target: SurfaceTarget) -> Result<()> {
        self.send(SessionCommand::SurfaceReady(target)).await
    }

    pub async fn surface_resized(&self, width: u32, height: u32) -> Result<()> {
        self.send(SessionCommand::SurfaceResized { width, height }).await
    }

    pub async fn surface_gone(&self) -> Result<()> {
        self.send(SessionCommand::SurfaceGone).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(SessionCommand::Resume).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn request_auto_focus(&self) -> Result<()> {
        self.send(SessionCommand::RequestAutoFocus).await
    }

    pub async fn clear_auto_focus(&self) -> Result<()> {
        self.send(SessionCommand::ClearAutoFocus).await
    }

    pub async fn request_capture(&self) -> Result<()> {
        self.send(SessionCommand::RequestCapture).await
    }

    pub async fn clear_capture(&self) -> Result<()> {
        self.send(SessionCommand::ClearCapture).await
    }

    pub async fn start_preview(&self) -> Result<()> {
        self.send(SessionCommand::StartPreview).await
    }

    pub async fn restart_preview(&self) -> Result<()> {
        self.send(SessionCommand::RestartPreview).await
    }

    pub async fn set_preview_frame_sink(&self, sink: Option<PreviewSink>) -> Result<()> {
        self.send(SessionCommand::SetPreviewFrameSink(sink)).await
    }

    /// Current controller state, after every command sent before this call
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply)).await?;
        response
            .await
            .map_err(|_| SessionError::system("Session task dropped snapshot request"))
    }

    /// Stop the session task; the device is released on the way out
    pub fn shutdown(&self) {
        info!("Stopping camera session");
        self.cancellation_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
