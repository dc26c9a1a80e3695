//! Repeat-timing state machine
//!
//! Turns a held direction into a paced stream of [`Step`]s. The same driver
//! serves both sources; each source only has to answer "since when is this
//! direction held" through [`DirectionSource`]. Hold starts are owned by the
//! source, so a hold keeps aging while the driver is not evaluated.
//!
//! ```text
//! new press ──► Step (immediately)
//!      │
//!      ├─ held < initial_delay ─────────────► nothing
//!      ├─ held ≥ initial_delay, first time ─► Step
//!      └─ since last Step ≥ interval(held) ─► Step
//!                      interval = 150ms, 100ms once held ≥ 2000ms
//! ```
//!
//! Repeats are gated on "time since the last emitted step", never on a fixed
//! period timer, so the poll cadence only bounds the jitter.

use crate::input::types::{Direction, Orientation, Step};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Anything that can report when a logical direction started being held
pub trait DirectionSource {
    /// `None` while the direction is released
    fn hold_start(&self, direction: Direction) -> Option<Instant>;

    fn is_pressed(&self, direction: Direction) -> bool {
        self.hold_start(direction).is_some()
    }
}

/// Timing constants of the repeat model
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatTiming {
    /// Hold time before the first repeat
    pub initial_delay: Duration,
    /// Spacing between repeats until the hold accelerates
    pub repeat_interval: Duration,
    /// Spacing between repeats once the hold accelerated
    pub fast_repeat_interval: Duration,
    /// Total hold time after which repeats use `fast_repeat_interval`
    pub acceleration_after: Duration,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            repeat_interval: Duration::from_millis(150),
            fast_repeat_interval: Duration::from_millis(100),
            acceleration_after: Duration::from_millis(2000),
        }
    }
}

impl RepeatTiming {
    /// Repeat interval that applies after holding for `held_for`
    pub fn interval_at(&self, held_for: Duration) -> Duration {
        if held_for >= self.acceleration_after {
            self.fast_repeat_interval
        } else {
            self.repeat_interval
        }
    }
}

// Pressed flag plus hold-start for one direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonHold {
    pressed: bool,
    hold_start: Option<Instant>,
}

/// Per-source pressed state of the four directions.
///
/// Invariant: `hold_start` is `Some` exactly while `pressed` is true.
#[derive(Clone, Debug, Default)]
pub struct DirectionalButtonState {
    buttons: [ButtonHold; 4],
}

impl DirectionalButtonState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `direction` pressed. Returns true on the rising edge only.
    pub fn press(&mut self, direction: Direction, now: Instant) -> bool {
        let button = &mut self.buttons[direction.index()];
        if button.pressed {
            return false;
        }
        button.pressed = true;
        button.hold_start = Some(now);
        true
    }

    /// Marks `direction` released. Returns true if it was pressed.
    pub fn release(&mut self, direction: Direction) -> bool {
        let button = &mut self.buttons[direction.index()];
        let was_pressed = button.pressed;
        *button = ButtonHold::default();
        was_pressed
    }

    pub fn set(&mut self, direction: Direction, pressed: bool, now: Instant) {
        if pressed {
            self.press(direction, now);
        } else {
            self.release(direction);
        }
    }

    pub fn release_all(&mut self) {
        self.buttons = Default::default();
    }

    pub fn hold_start(&self, direction: Direction) -> Option<Instant> {
        self.buttons[direction.index()].hold_start
    }
}

impl DirectionSource for DirectionalButtonState {
    fn hold_start(&self, direction: Direction) -> Option<Instant> {
        self.buttons[direction.index()].hold_start
    }
}

/// Pacing state of the current hold on the live axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepeatClock {
    last_emit: Option<Instant>,
    repeating: bool,
}

impl RepeatClock {
    pub fn last_emit(&self) -> Option<Instant> {
        self.last_emit
    }
}

/// Repeat driver for one source
#[derive(Clone, Debug)]
pub struct RepeatDriver {
    orientation: Orientation,
    timing: RepeatTiming,
    clock: RepeatClock,
    // hold starts of the live axis as of the previous evaluation
    seen: [Option<Instant>; 2],
}

impl RepeatDriver {
    pub fn new(orientation: Orientation, timing: RepeatTiming) -> Self {
        Self {
            orientation,
            timing,
            clock: RepeatClock::default(),
            seen: [None; 2],
        }
    }

    pub fn clock(&self) -> &RepeatClock {
        &self.clock
    }

    pub fn is_holding(&self) -> bool {
        self.seen.iter().any(Option::is_some)
    }

    /// Evaluates one tick against `source` and returns the step to emit, if any.
    ///
    /// At most one step per call. A direction pressed since the previous
    /// evaluation wins the tick; otherwise the negative direction of the axis
    /// is checked first. Hold time is measured from the most recent press on
    /// the axis.
    pub fn update<S>(&mut self, source: &S, now: Instant) -> Option<Step>
    where
        S: DirectionSource + ?Sized,
    {
        let axis = self.orientation.axis();
        let holds = axis.map(|direction| source.hold_start(direction));
        let new_press =
            (0..axis.len()).find(|&i| holds[i].is_some() && holds[i] != self.seen[i]);
        self.seen = holds;

        let hold_start = holds.iter().flatten().max().copied();
        let Some(hold_start) = hold_start else {
            if self.clock.last_emit.is_some() {
                trace!("Hold released on {} axis", self.orientation);
            }
            self.clock = RepeatClock::default();
            return None;
        };

        if let Some(i) = new_press {
            self.clock = RepeatClock {
                last_emit: Some(now),
                repeating: false,
            };
            trace!("Hold started: {:?}", axis[i]);
            return Some(axis[i].step());
        }

        let held_for = now.saturating_duration_since(hold_start);
        if held_for < self.timing.initial_delay {
            return None;
        }

        if self.clock.repeating {
            if let Some(last_emit) = self.clock.last_emit {
                let since_last = now.saturating_duration_since(last_emit);
                if since_last < self.timing.interval_at(held_for) {
                    return None;
                }
            }
        }

        self.clock.repeating = true;
        self.clock.last_emit = Some(now);

        let direction = if holds[0].is_some() { axis[0] } else { axis[1] };
        trace!(
            "Repeat {:?} after {}ms hold",
            direction,
            held_for.as_millis()
        );
        Some(direction.step())
    }

    /// Takes note of the current holds without emitting.
    ///
    /// Used while output is suppressed: presses seen here are continued as
    /// running holds once evaluation resumes, not treated as new presses.
    pub fn observe<S>(&mut self, source: &S)
    where
        S: DirectionSource + ?Sized,
    {
        self.seen = self
            .orientation
            .axis()
            .map(|direction| source.hold_start(direction));
        if !self.is_holding() {
            self.clock = RepeatClock::default();
        }
    }

    /// Records a release observed outside of [`update`](Self::update).
    ///
    /// Keeps edge detection honest when a direction is released and pressed
    /// again between two evaluated ticks.
    pub fn release(&mut self, direction: Direction) {
        if let Some(i) = self.orientation.axis().iter().position(|d| *d == direction) {
            self.seen[i] = None;
        }
        if !self.is_holding() {
            self.clock = RepeatClock::default();
        }
    }

    /// Forgets the current hold; the next pressed direction counts as a new press
    pub fn reset(&mut self) {
        self.clock = RepeatClock::default();
        self.seen = [None; 2];
    }
}

/// Shared cooldown across all action buttons of one source
#[derive(Clone, Debug)]
pub struct ActionCooldown {
    cooldown: Duration,
    last_action: Option<Instant>,
}

impl ActionCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_action: None,
        }
    }

    /// Claims the cooldown if it has elapsed. Returns whether the action may fire.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_action {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_action = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    // Holds `direction` from t=0 and ticks every `tick` until `until` (exclusive)
    fn hold_and_collect(direction: Direction, tick: u64, until: u64) -> Vec<u64> {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());
        state.press(direction, base);

        let mut emitted = Vec::new();
        let mut t = 0;
        while t < until {
            if driver.update(&state, base + ms(t)).is_some() {
                emitted.push(t);
            }
            t += tick;
        }
        emitted
    }

    #[test]
    fn first_step_fires_on_press() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        assert_eq!(driver.update(&state, base), None);
        state.press(Direction::Down, base);
        assert_eq!(driver.update(&state, base), Some(Step::Next));
        assert_eq!(driver.update(&state, base + ms(50)), None);
        assert_eq!(driver.update(&state, base + ms(99)), None);
    }

    #[test]
    fn repeats_follow_delay_interval_and_acceleration() {
        let emitted = hold_and_collect(Direction::Down, 10, 2500);

        let mut expected = vec![0];
        expected.extend((0..=12).map(|k| 100 + 150 * k));
        expected.extend([2000, 2100, 2200, 2300, 2400]);
        assert_eq!(emitted, expected);
    }

    #[test]
    fn coarse_ticks_only_add_jitter() {
        let emitted = hold_and_collect(Direction::Up, 16, 1000);

        assert_eq!(emitted[0], 0);
        assert_eq!(emitted[1], 112);
        for pair in emitted.windows(2).skip(1) {
            let gap = pair[1] - pair[0];
            assert!((150..150 + 16).contains(&gap), "gap {gap}");
        }
    }

    #[test]
    fn release_restarts_at_the_initial_press() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Up, base);
        assert_eq!(driver.update(&state, base), Some(Step::Previous));
        assert_eq!(driver.update(&state, base + ms(100)), Some(Step::Previous));

        state.release(Direction::Up);
        assert_eq!(driver.update(&state, base + ms(120)), None);
        assert!(!driver.is_holding());

        state.press(Direction::Up, base + ms(130));
        assert_eq!(driver.update(&state, base + ms(130)), Some(Step::Previous));
        assert_eq!(driver.update(&state, base + ms(200)), None);
        assert_eq!(driver.update(&state, base + ms(230)), Some(Step::Previous));
    }

    #[test]
    fn release_between_ticks_still_counts_as_new_press() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Down, base);
        assert_eq!(driver.update(&state, base), Some(Step::Next));

        state.release(Direction::Down);
        driver.release(Direction::Down);
        state.press(Direction::Down, base + ms(40));
        assert_eq!(driver.update(&state, base + ms(40)), Some(Step::Next));
        assert_eq!(driver.clock().last_emit(), Some(base + ms(40)));
    }

    #[test]
    fn release_and_press_at_one_instant_is_a_new_press() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Down, base);
        assert_eq!(driver.update(&state, base), Some(Step::Next));

        state.release(Direction::Down);
        driver.release(Direction::Down);
        state.press(Direction::Down, base);
        assert_eq!(driver.update(&state, base), Some(Step::Next));
    }

    #[test]
    fn observed_hold_keeps_aging_without_a_new_press() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Down, base);
        driver.observe(&state);
        assert!(driver.is_holding());

        let emitted: Vec<u64> = (2500..2800)
            .step_by(10)
            .filter(|&t| driver.update(&state, base + ms(t)).is_some())
            .collect();
        assert_eq!(emitted, vec![2500, 2600, 2700]);
    }

    #[test]
    fn observed_short_hold_waits_for_the_initial_delay() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Up, base);
        driver.observe(&state);
        assert_eq!(driver.update(&state, base + ms(60)), None);
        assert_eq!(driver.update(&state, base + ms(100)), Some(Step::Previous));
        assert_eq!(driver.update(&state, base + ms(200)), None);
        assert_eq!(driver.update(&state, base + ms(250)), Some(Step::Previous));
    }

    #[test]
    fn negative_direction_wins_conflicting_hold() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Horizontal, RepeatTiming::default());

        state.press(Direction::Left, base);
        state.press(Direction::Right, base);
        assert_eq!(driver.update(&state, base), Some(Step::Previous));
        assert_eq!(driver.update(&state, base + ms(100)), Some(Step::Previous));
    }

    #[test]
    fn new_press_on_held_axis_fires_once_then_restarts_delay() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Up, base);
        assert_eq!(driver.update(&state, base), Some(Step::Previous));

        state.press(Direction::Down, base + ms(500));
        assert_eq!(driver.update(&state, base + ms(500)), Some(Step::Next));
        assert_eq!(driver.update(&state, base + ms(550)), None);
        assert_eq!(driver.update(&state, base + ms(600)), Some(Step::Previous));
    }

    #[test]
    fn off_axis_directions_never_step() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();
        let mut driver = RepeatDriver::new(Orientation::Vertical, RepeatTiming::default());

        state.press(Direction::Left, base);
        state.press(Direction::Right, base);
        for t in (0..3000).step_by(16) {
            assert_eq!(driver.update(&state, base + ms(t)), None);
        }
        assert!(!driver.is_holding());
    }

    #[test]
    fn hold_start_tracks_pressed_flag() {
        let base = Instant::now();
        let mut state = DirectionalButtonState::new();

        assert!(state.press(Direction::Left, base));
        assert!(!state.press(Direction::Left, base + ms(40)));
        assert_eq!(state.hold_start(Direction::Left), Some(base));
        assert!(state.is_pressed(Direction::Left));

        assert!(state.release(Direction::Left));
        assert!(!state.is_pressed(Direction::Left));
        assert_eq!(state.hold_start(Direction::Left), None);
        assert!(!state.release(Direction::Left));
    }

    #[test]
    fn cooldown_is_shared_and_spaced() {
        let base = Instant::now();
        let mut cooldown = ActionCooldown::new(ms(300));

        assert!(cooldown.try_fire(base));
        assert!(!cooldown.try_fire(base + ms(1)));
        assert!(!cooldown.try_fire(base + ms(299)));
        assert!(cooldown.try_fire(base + ms(300)));
        assert!(!cooldown.try_fire(base + ms(450)));
    }

    #[test]
    fn interval_shrinks_at_acceleration_mark() {
        let timing = RepeatTiming::default();
        assert_eq!(timing.interval_at(ms(1999)), ms(150));
        assert_eq!(timing.interval_at(ms(2000)), ms(100));
    }
}
