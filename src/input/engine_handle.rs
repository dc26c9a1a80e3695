//! Engine Handle - public API of the input arbitration engine
//!
//! Spawns the engine on a tokio task and gives the host a cheap, non-blocking
//! way to push keyboard transitions, query controller connectivity and tear
//! the engine down.

use crate::input::arbiter::{EventSink, WindowFocus};
use crate::input::connection::GamepadBackend;
use crate::input::engine::{InputEngine, KeyCommand};
use crate::input::gilrs_backend::GilrsBackend;
use crate::input::poller::DEFAULT_AXIS_THRESHOLD;
use crate::input::repeat::RepeatTiming;
use crate::input::types::{Key, Orientation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Timing configuration for the engine
///
/// Defaults reproduce the kiosk's tuned behavior; every field can be
/// overridden from the `[engine]` table of the config file.
///
/// # Examples
///
/// ```rust
/// use kiosknav::input::EngineSettings;
///
/// // Slower pacing for a large TV list
/// let relaxed = EngineSettings {
///     repeat_interval_ms: 220,
///     fast_repeat_interval_ms: 140,
///     ..EngineSettings::default()
/// };
/// assert_eq!(relaxed.initial_delay_ms, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Keyboard repeat evaluation period (~60 Hz)
    pub keyboard_tick_ms: u64,

    /// Controller poll period (20 Hz)
    pub controller_poll_ms: u64,

    /// Controller liveness / reconnect period
    pub connection_check_ms: u64,

    /// Hold time before the first repeated move
    pub initial_delay_ms: u64,

    /// Spacing between repeated moves
    pub repeat_interval_ms: u64,

    /// Spacing between repeated moves once the hold accelerated
    pub fast_repeat_interval_ms: u64,

    /// Hold time after which the fast interval applies
    pub acceleration_after_ms: u64,

    /// Shared minimum spacing between action events of one source
    pub action_cooldown_ms: u64,

    /// Normalized stick deflection that counts as a pressed direction
    pub axis_threshold: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            keyboard_tick_ms: 16,
            controller_poll_ms: 50,
            connection_check_ms: 2000,
            initial_delay_ms: 100,
            repeat_interval_ms: 150,
            fast_repeat_interval_ms: 100,
            acceleration_after_ms: 2000,
            action_cooldown_ms: 300,
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
        }
    }
}

impl EngineSettings {
    pub fn repeat_timing(&self) -> RepeatTiming {
        RepeatTiming {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            repeat_interval: Duration::from_millis(self.repeat_interval_ms),
            fast_repeat_interval: Duration::from_millis(self.fast_repeat_interval_ms),
            acceleration_after: Duration::from_millis(self.acceleration_after_ms),
        }
    }
}

/// Handle for a running input engine
///
/// Dropping the handle cancels the engine task; [`shutdown`](Self::shutdown)
/// additionally waits for the controller to be released.
#[derive(Debug)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<KeyCommand>,
    connection: watch::Receiver<bool>,
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Spawns the engine with an explicit backend.
    ///
    /// Must be called from within a tokio runtime. `backend: None` runs the
    /// engine keyboard-only.
    pub fn spawn(
        orientation: Orientation,
        settings: Option<EngineSettings>,
        backend: Option<Box<dyn GamepadBackend>>,
        focus: impl WindowFocus + 'static,
        sink: impl EventSink + 'static,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        info!(
            "Spawning input engine: orientation={}, gamepad backend={}",
            orientation,
            backend.is_some()
        );

        let mut engine = InputEngine::create(settings, backend, Box::new(focus), Box::new(sink));
        engine.set_orientation(orientation);
        let connection = engine.subscribe_connection();
        let running = engine.start();

        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task_handle = tokio::spawn(async move {
            debug!("Input engine task started");
            let stopped = running.run_until_shutdown(command_rx, task_cancel).await;
            stopped.release();
        });

        Self {
            commands,
            connection,
            cancel,
            task_handle: Some(task_handle),
        }
    }

    /// Spawns the engine on gilrs, falling back to keyboard-only if gilrs
    /// cannot be initialized
    pub fn spawn_with_gilrs(
        orientation: Orientation,
        settings: Option<EngineSettings>,
        focus: impl WindowFocus + 'static,
        sink: impl EventSink + 'static,
    ) -> Self {
        let backend: Option<Box<dyn GamepadBackend>> = match GilrsBackend::new() {
            Ok(backend) => Some(Box::new(backend)),
            Err(e) => {
                warn!("Continuing keyboard-only: {}", e);
                None
            }
        };
        Self::spawn(orientation, settings, backend, focus, sink)
    }

    pub fn key_down(&self, key: Key) {
        self.send(KeyCommand::Down(key));
    }

    pub fn key_up(&self, key: Key) {
        self.send(KeyCommand::Up(key));
    }

    pub fn is_gamepad_connected(&self) -> bool {
        *self.connection.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<bool> {
        self.connection.clone()
    }

    /// Stops all timers and releases the controller. Idempotent.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(()) => debug!("Input engine task completed"),
                Err(e) => error!("Input engine task failed: {}", e),
            }
        } else {
            debug!("Input engine already shut down");
        }
    }

    fn send(&self, command: KeyCommand) {
        if self.commands.send(command).is_err() {
            debug!("Input engine stopped, dropping {:?}", command);
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
