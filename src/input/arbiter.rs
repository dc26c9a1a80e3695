//! Event arbiter
//!
//! Synchronous core of the engine. Every entry point takes the current
//! monotonic instant and runs to completion, which keeps the whole timing
//! model deterministic and lets the scheduling loop stay trivial.
//!
//! ```text
//! key_down/key_up ──► keyboard state ──┐
//! keyboard_tick ───────────────────────┤──► RepeatDriver ─┐
//! controller_tick ─► monitor.poll() ───┘    ActionCooldown ├──► EventSink
//! connection_check ─► monitor.check() ──────────────────────┘
//! ```

use crate::input::connection::{ConnectionMonitor, GamepadBackend};
use crate::input::poller::{self, ActionButton, KeyInput, DEFAULT_AXIS_THRESHOLD};
use crate::input::repeat::{
    ActionCooldown, DirectionSource, DirectionalButtonState, RepeatDriver, RepeatTiming,
};
use crate::input::types::{EngineEvent, InputSource, Key, NavigationEvent, Orientation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, trace};

/// Receives the arbitrated event stream
pub trait EventSink: Send {
    fn emit(&mut self, event: EngineEvent);
}

impl EventSink for mpsc::Sender<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) {
        if let Err(e) = self.try_send(event) {
            error!("Failed to deliver {:?}: {}", event, e);
        }
    }
}

impl EventSink for mpsc::UnboundedSender<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) {
        if let Err(e) = self.send(event) {
            error!("Failed to deliver {:?}: {}", e.0, e);
        }
    }
}

type MoveCallback = Box<dyn FnMut(i32) + Send>;
type ActionCallback = Box<dyn FnMut() + Send>;
type ConnectionCallback = Box<dyn FnMut(bool) + Send>;

/// Callback-style subscriber.
///
/// Events without a registered callback are dropped, which is how a shell on
/// a single display leaves `ToggleDisplay` unwired.
#[derive(Default)]
pub struct Callbacks {
    on_move: Option<MoveCallback>,
    on_launch: Option<ActionCallback>,
    on_exit: Option<ActionCallback>,
    on_toggle_display: Option<ActionCallback>,
    on_connection_changed: Option<ConnectionCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_move(mut self, callback: impl FnMut(i32) + Send + 'static) -> Self {
        self.on_move = Some(Box::new(callback));
        self
    }

    pub fn on_launch(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_launch = Some(Box::new(callback));
        self
    }

    pub fn on_exit(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_exit = Some(Box::new(callback));
        self
    }

    pub fn on_toggle_display(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_toggle_display = Some(Box::new(callback));
        self
    }

    pub fn on_connection_changed(mut self, callback: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_connection_changed = Some(Box::new(callback));
        self
    }
}

impl EventSink for Callbacks {
    fn emit(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Navigation(NavigationEvent::Move(step)) => {
                if let Some(callback) = self.on_move.as_mut() {
                    callback(step.offset());
                }
            }
            EngineEvent::Navigation(NavigationEvent::Launch) => {
                if let Some(callback) = self.on_launch.as_mut() {
                    callback();
                }
            }
            EngineEvent::Navigation(NavigationEvent::Exit) => {
                if let Some(callback) = self.on_exit.as_mut() {
                    callback();
                }
            }
            EngineEvent::Navigation(NavigationEvent::ToggleDisplay) => {
                if let Some(callback) = self.on_toggle_display.as_mut() {
                    callback();
                }
            }
            EngineEvent::ConnectionChanged(connected) => {
                if let Some(callback) = self.on_connection_changed.as_mut() {
                    callback(connected);
                }
            }
        }
    }
}

/// "Is this process's window in the foreground?"
pub trait WindowFocus: Send {
    fn has_focus(&self) -> bool;
}

impl<F> WindowFocus for F
where
    F: Fn() -> bool + Send,
{
    fn has_focus(&self) -> bool {
        self()
    }
}

/// Shared focus flag the shell flips from its window events
#[derive(Clone, Debug)]
pub struct FocusFlag(Arc<AtomicBool>);

impl FocusFlag {
    pub fn new(focused: bool) -> Self {
        Self(Arc::new(AtomicBool::new(focused)))
    }

    pub fn set(&self, focused: bool) {
        self.0.store(focused, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl WindowFocus for FocusFlag {
    fn has_focus(&self) -> bool {
        self.get()
    }
}

// Per-source arbitration state
struct SourceState {
    source: InputSource,
    buttons: DirectionalButtonState,
    repeat: RepeatDriver,
    actions: ActionCooldown,
}

impl SourceState {
    fn new(
        source: InputSource,
        orientation: Orientation,
        timing: RepeatTiming,
        cooldown: Duration,
    ) -> Self {
        Self {
            source,
            buttons: DirectionalButtonState::new(),
            repeat: RepeatDriver::new(orientation, timing),
            actions: ActionCooldown::new(cooldown),
        }
    }

    fn navigation(&mut self, now: Instant) -> Option<NavigationEvent> {
        self.repeat
            .update(&self.buttons, now)
            .map(NavigationEvent::Move)
    }

    // Tracks holds while output is suppressed so they resume as running holds
    fn observe(&mut self) {
        self.repeat.observe(&self.buttons);
    }

    fn action(&mut self, button: ActionButton, now: Instant) -> Option<NavigationEvent> {
        if !self.actions.try_fire(now) {
            trace!("{} {:?} inside action cooldown", self.source, button);
            return None;
        }
        Some(match button {
            ActionButton::Confirm => NavigationEvent::Launch,
            ActionButton::Cancel => NavigationEvent::Exit,
            ActionButton::Auxiliary => NavigationEvent::ToggleDisplay,
        })
    }
}

/// Arbitration tunables
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArbiterSettings {
    pub timing: RepeatTiming,
    pub action_cooldown: Duration,
    pub axis_threshold: f32,
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self {
            timing: RepeatTiming::default(),
            action_cooldown: Duration::from_millis(300),
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
        }
    }
}

/// Merges keyboard and controller input into one navigation stream
pub struct InputArbiter {
    orientation: Orientation,
    settings: ArbiterSettings,
    keyboard: SourceState,
    controller: SourceState,
    monitor: ConnectionMonitor,
    focus: Box<dyn WindowFocus>,
    sink: Box<dyn EventSink>,
}

impl InputArbiter {
    pub fn new(
        orientation: Orientation,
        settings: ArbiterSettings,
        backend: Option<Box<dyn GamepadBackend>>,
        focus: Box<dyn WindowFocus>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        debug!(
            "Creating input arbiter: orientation={}, settings={:?}",
            orientation, settings
        );
        Self {
            orientation,
            settings,
            keyboard: SourceState::new(
                InputSource::Keyboard,
                orientation,
                settings.timing,
                settings.action_cooldown,
            ),
            controller: SourceState::new(
                InputSource::Controller,
                orientation,
                settings.timing,
                settings.action_cooldown,
            ),
            monitor: ConnectionMonitor::new(backend),
            focus,
            sink,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Changes the live axis and forgets all held state.
    ///
    /// Only meaningful before the first tick; the typed engine lifecycle
    /// makes it unreachable afterwards.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        let timing = self.settings.timing;
        for state in [&mut self.keyboard, &mut self.controller] {
            state.buttons.release_all();
            state.repeat = RepeatDriver::new(orientation, timing);
        }
    }

    pub fn is_gamepad_connected(&self) -> bool {
        self.monitor.is_connected()
    }

    pub fn keyboard_state(&self) -> &DirectionalButtonState {
        &self.keyboard.buttons
    }

    pub fn controller_state(&self) -> &DirectionalButtonState {
        &self.controller.buttons
    }

    /// Initial enumeration, done once when the engine is built
    pub fn connect(&mut self) {
        if let Some(connected) = self.monitor.connect() {
            self.emit(EngineEvent::ConnectionChanged(connected));
        }
    }

    pub fn key_down(&mut self, key: Key, now: Instant) {
        match KeyInput::classify(key) {
            KeyInput::Direction(direction) => {
                if !self.orientation.is_live(direction) {
                    trace!("Ignoring off-axis key {:?}", key);
                    return;
                }
                if !self.keyboard.buttons.press(direction, now) {
                    // host auto-repeat
                    return;
                }
                if !self.focus.has_focus() {
                    self.keyboard.observe();
                    return;
                }
                if let Some(event) = self.keyboard.navigation(now) {
                    self.emit(event.into());
                }
            }
            KeyInput::Action(button) => {
                if !self.focus.has_focus() {
                    return;
                }
                if let Some(event) = self.keyboard.action(button, now) {
                    self.emit(event.into());
                }
            }
            KeyInput::Ignored => trace!("Ignoring key {:?}", key),
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if let KeyInput::Direction(direction) = KeyInput::classify(key) {
            if self.keyboard.buttons.release(direction) {
                self.keyboard.repeat.release(direction);
            }
        }
    }

    /// Keyboard repeat evaluation (~60 Hz)
    pub fn keyboard_tick(&mut self, now: Instant) {
        if !self.focus.has_focus() {
            self.keyboard.observe();
            return;
        }
        if let Some(event) = self.keyboard.navigation(now) {
            self.emit(event.into());
        }
    }

    /// Controller poll (~20 Hz)
    pub fn controller_tick(&mut self, now: Instant) {
        let Some(snapshot) = self.monitor.poll() else {
            return;
        };

        poller::sync_controller_state(
            &mut self.controller.buttons,
            &snapshot,
            self.orientation,
            self.settings.axis_threshold,
            now,
        );
        for direction in self.orientation.axis() {
            if !self.controller.buttons.is_pressed(direction) {
                self.controller.repeat.release(direction);
            }
        }

        if !self.focus.has_focus() {
            self.controller.observe();
            return;
        }

        if let Some(event) = self.controller.navigation(now) {
            self.emit(event.into());
        }
        if let Some(button) = snapshot.action() {
            if let Some(event) = self.controller.action(button, now) {
                self.emit(event.into());
            }
        }
    }

    /// Controller liveness check (every 2 s)
    pub fn connection_check(&mut self) {
        if let Some(connected) = self.monitor.check() {
            if !connected {
                self.controller.buttons.release_all();
                self.controller.repeat.reset();
            }
            self.emit(EngineEvent::ConnectionChanged(connected));
        }
    }

    /// Releases the controller; safe to call more than once
    pub fn shutdown(&mut self) {
        self.monitor.release();
        for state in [&mut self.keyboard, &mut self.controller] {
            state.buttons.release_all();
            state.repeat.reset();
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        debug!("Emitting {:?}", event);
        self.sink.emit(event);
    }
}
