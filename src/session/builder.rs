use super::controller::CameraSessionController;
use crate::config::SessionConfig;
use crate::driver::{completion_channel, CameraDriver, CompletionReceiver};
use crate::error::{Result, SessionError};
use crate::events::UiNotifier;

/// Builder wiring a controller to its driver, UI notifier and completion channel
pub struct CameraSessionBuilder {
    config: Option<SessionConfig>,
    driver: Option<Box<dyn CameraDriver>>,
    notifier: Option<Box<dyn UiNotifier>>,
}

impl CameraSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            driver: None,
            notifier: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn driver<D: CameraDriver + 'static>(mut self, driver: D) -> Self {
        self.driver = Some(Box::new(driver));
        self
    }

    pub fn notifier<N: UiNotifier + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Build the controller. The returned receiver carries hardware
    /// completions and must be drained on the controller's context.
    pub fn build(self) -> Result<(CameraSessionController, CompletionReceiver)> {
        let driver = self
            .driver
            .ok_or_else(|| SessionError::system("Camera driver must be specified"))?;
        let notifier = self
            .notifier
            .ok_or_else(|| SessionError::system("UI notifier must be specified"))?;
        let config = self.config.unwrap_or_default();

        let (completions, receiver) = completion_channel();
        let controller = CameraSessionController::new(
            &config.camera,
            config.session.host_starts_active,
            driver,
            notifier,
            completions,
        );

        Ok((controller, receiver))
    }
}

impl Default for CameraSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
