use serde::{Deserialize, Serialize};
use std::fmt;

// Logical direction, shared by keyboard and controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Step this direction produces on its axis (Up/Left go back, Down/Right go forward)
    pub fn step(self) -> Step {
        match self {
            Direction::Up | Direction::Left => Step::Previous,
            Direction::Down | Direction::Right => Step::Next,
        }
    }
}

/// Navigation axis mode, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

impl Orientation {
    /// Directions of the live axis, negative direction first.
    ///
    /// The order doubles as the check order when both directions are held.
    pub fn axis(self) -> [Direction; 2] {
        match self {
            Orientation::Horizontal => [Direction::Left, Direction::Right],
            Orientation::Vertical => [Direction::Up, Direction::Down],
        }
    }

    pub fn is_live(self, direction: Direction) -> bool {
        self.axis().contains(&direction)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

// One selection step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

impl Step {
    /// Signed offset handed to `on_move` consumers (-1 or +1)
    pub fn offset(self) -> i32 {
        match self {
            Step::Previous => -1,
            Step::Next => 1,
        }
    }
}

/// Logical navigation event.
///
/// Carries no source attribution: once arbitrated, keyboard and controller
/// input are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    Move(Step),
    Launch,
    Exit,
    ToggleDisplay,
}

// Everything the engine delivers to its consumer, in tick order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Navigation(NavigationEvent),
    ConnectionChanged(bool),
}

impl From<NavigationEvent> for EngineEvent {
    fn from(event: NavigationEvent) -> Self {
        EngineEvent::Navigation(event)
    }
}

/// Keyboard keys the host forwards to the engine.
///
/// The host maps its toolkit's key codes onto this set; anything without a
/// meaning here can be passed as `Char` or dropped before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Char(char),
}

// Which physical source an input came from (used for logging and per-source state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Keyboard,
    Controller,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Keyboard => write!(f, "keyboard"),
            InputSource::Controller => write!(f, "controller"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_lists_negative_direction_first() {
        assert_eq!(Orientation::Vertical.axis(), [Direction::Up, Direction::Down]);
        assert_eq!(
            Orientation::Horizontal.axis(),
            [Direction::Left, Direction::Right]
        );
        for orientation in [Orientation::Vertical, Orientation::Horizontal] {
            let [negative, positive] = orientation.axis();
            assert_eq!(negative.step().offset(), -1);
            assert_eq!(positive.step().offset(), 1);
        }
    }

    #[test]
    fn off_axis_directions_are_not_live() {
        assert!(!Orientation::Vertical.is_live(Direction::Left));
        assert!(!Orientation::Vertical.is_live(Direction::Right));
        assert!(!Orientation::Horizontal.is_live(Direction::Up));
        assert!(!Orientation::Horizontal.is_live(Direction::Down));
    }
}
