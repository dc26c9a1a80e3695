//! Device poller
//!
//! Raw device state without interpretation. The controller side is a plain
//! [`PadSnapshot`] read once per poll; the keyboard side classifies host key
//! codes. Neither applies timing, focus or cooldown rules.

use crate::input::repeat::DirectionalButtonState;
use crate::input::types::{Direction, Key, Orientation};
use tokio::time::Instant;

/// Normalized stick deflection that counts as a press.
///
/// Half of the way from center, i.e. below 16384 or above 49152 on a raw
/// 0..65535 axis.
pub const DEFAULT_AXIS_THRESHOLD: f32 = 0.5;

/// One poll of the controller.
///
/// Stick values are normalized to -1.0..=1.0 with positive Y pointing up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PadSnapshot {
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub stick_x: f32,
    pub stick_y: f32,
    pub confirm: bool,
    pub cancel: bool,
    pub auxiliary: bool,
}

impl PadSnapshot {
    /// D-pad OR stick past `threshold`
    pub fn direction_pressed(&self, direction: Direction, threshold: f32) -> bool {
        match direction {
            Direction::Up => self.dpad_up || self.stick_y > threshold,
            Direction::Down => self.dpad_down || self.stick_y < -threshold,
            Direction::Left => self.dpad_left || self.stick_x < -threshold,
            Direction::Right => self.dpad_right || self.stick_x > threshold,
        }
    }

    /// First pressed action button, checked as Confirm, Cancel, Auxiliary
    pub fn action(&self) -> Option<ActionButton> {
        if self.confirm {
            Some(ActionButton::Confirm)
        } else if self.cancel {
            Some(ActionButton::Cancel)
        } else if self.auxiliary {
            Some(ActionButton::Auxiliary)
        } else {
            None
        }
    }
}

// Action buttons, named by role rather than by face label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionButton {
    Confirm,
    Cancel,
    Auxiliary,
}

/// What a host key means to the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Direction(Direction),
    Action(ActionButton),
    Ignored,
}

impl KeyInput {
    pub fn classify(key: Key) -> Self {
        match key {
            Key::ArrowUp => KeyInput::Direction(Direction::Up),
            Key::ArrowDown => KeyInput::Direction(Direction::Down),
            Key::ArrowLeft => KeyInput::Direction(Direction::Left),
            Key::ArrowRight => KeyInput::Direction(Direction::Right),
            Key::Enter => KeyInput::Action(ActionButton::Confirm),
            Key::Escape => KeyInput::Action(ActionButton::Cancel),
            Key::Char('x') | Key::Char('X') => KeyInput::Action(ActionButton::Auxiliary),
            Key::Char(_) => KeyInput::Ignored,
        }
    }
}

/// Copies the live axis of `snapshot` into `state`.
///
/// Off-axis directions are left untouched, so they never acquire a hold-start.
pub fn sync_controller_state(
    state: &mut DirectionalButtonState,
    snapshot: &PadSnapshot,
    orientation: Orientation,
    threshold: f32,
    now: Instant,
) {
    for direction in orientation.axis() {
        state.set(
            direction,
            snapshot.direction_pressed(direction, threshold),
            now,
        );
    }
}
