//! Engine lifecycle with statum state machine
//!
//! ```text
//! Configuring ──► Running ──► Stopped
//!  (orientation)   (scheduling loop)   (device released)
//! ```
//!
//! Orientation can only be changed while `Configuring`, so it is fixed before
//! the first tick by construction.
//!
//! # Scheduling
//!
//! One task, one `select!` loop. Keyboard transitions, the keyboard repeat
//! tick, the controller poll and the connection check all run to completion
//! on it in arrival order, so arbitration state needs no locking.

use crate::input::arbiter::{ArbiterSettings, EventSink, WindowFocus, InputArbiter};
use crate::input::connection::GamepadBackend;
use crate::input::engine_handle::EngineSettings;
use crate::input::types::{Key, Orientation};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Keyboard transitions pushed by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Down(Key),
    Up(Key),
}

#[state]
#[derive(Debug, Clone)]
pub enum EngineState {
    Configuring,
    Running,
    Stopped,
}

#[machine]
pub struct InputEngine<S: EngineState> {
    arbiter: InputArbiter,
    settings: EngineSettings,
    connection_tx: watch::Sender<bool>,
}

impl<S: EngineState> InputEngine<S> {
    /// Receiver that always holds the current connectivity
    pub fn subscribe_connection(&self) -> watch::Receiver<bool> {
        self.connection_tx.subscribe()
    }

    fn publish_connection(&self) {
        let connected = self.arbiter.is_gamepad_connected();
        self.connection_tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
    }
}

impl InputEngine<Configuring> {
    /// Builds the engine and performs the initial controller enumeration.
    ///
    /// `backend: None` runs keyboard-only for the whole session.
    pub fn create(
        settings: EngineSettings,
        backend: Option<Box<dyn GamepadBackend>>,
        focus: Box<dyn WindowFocus>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        info!("Creating input engine with settings: {:?}", settings);

        let mut arbiter = InputArbiter::new(
            Orientation::default(),
            ArbiterSettings::from(&settings),
            backend,
            focus,
            sink,
        );
        arbiter.connect();

        let (connection_tx, _) = watch::channel(arbiter.is_gamepad_connected());
        Self::new(arbiter, settings, connection_tx)
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        debug!("Orientation set to {}", orientation);
        self.arbiter.set_orientation(orientation);
    }

    pub fn start(self) -> InputEngine<Running> {
        info!(
            "Starting input engine ({} navigation)",
            self.arbiter.orientation()
        );
        self.transition()
    }
}

impl InputEngine<Running> {
    pub fn handle_command(&mut self, command: KeyCommand, now: Instant) {
        trace!("Key command: {:?}", command);
        match command {
            KeyCommand::Down(key) => self.arbiter.key_down(key, now),
            KeyCommand::Up(key) => self.arbiter.key_up(key),
        }
    }

    pub fn keyboard_tick(&mut self, now: Instant) {
        self.arbiter.keyboard_tick(now);
    }

    pub fn controller_tick(&mut self, now: Instant) {
        self.arbiter.controller_tick(now);
    }

    pub fn connection_check(&mut self) {
        self.arbiter.connection_check();
        self.publish_connection();
    }

    /// Main loop; returns once `cancel` fires or every command sender is gone
    pub async fn run_until_shutdown(
        mut self,
        mut commands: mpsc::UnboundedReceiver<KeyCommand>,
        cancel: CancellationToken,
    ) -> InputEngine<Stopped> {
        let mut keyboard_timer = ticker(self.settings.keyboard_tick_ms);
        let mut controller_timer = ticker(self.settings.controller_poll_ms);
        let mut connection_timer = ticker(self.settings.connection_check_ms);
        // construction already checked the connection
        connection_timer.reset();

        info!("Entering input engine loop");
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown signal received for input engine");
                    break;
                }

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, Instant::now()),
                    None => {
                        debug!("Key command channel closed");
                        break;
                    }
                },

                now = keyboard_timer.tick() => self.keyboard_tick(now),

                now = controller_timer.tick() => self.controller_tick(now),

                _ = connection_timer.tick() => self.connection_check(),
            }
        }

        self.transition()
    }
}

impl InputEngine<Stopped> {
    /// Releases the controller and drops the arbiter
    pub fn release(mut self) {
        self.arbiter.shutdown();
        info!("Input engine stopped");
    }
}

fn ticker(period_ms: u64) -> tokio::time::Interval {
    let mut timer = interval(Duration::from_millis(period_ms.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

impl From<&EngineSettings> for ArbiterSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            timing: settings.repeat_timing(),
            action_cooldown: Duration::from_millis(settings.action_cooldown_ms),
            axis_threshold: settings.axis_threshold,
        }
    }
}
