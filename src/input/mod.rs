//! Input arbitration engine
//!
//! Merges keyboard and gamepad input into one ordered stream of
//! high-level navigation events:
//!
//! 1. [`poller`] - Raw device state sampling and key classification
//! 2. [`repeat`] - Hold-to-repeat timing with acceleration
//! 3. [`connection`] - Controller discovery, liveness and reconnect
//! 4. [`arbiter`] - Focus gating, action cooldown and event delivery
//! 5. [`engine`] / [`engine_handle`] - Scheduling loop and public API
//!
//! # Architecture
//!
//! ```text
//! host keys ──► EngineHandle ──► KeyCommand ─┐
//!                                            ├──► InputArbiter ──► EventSink
//! gamepad ──► GamepadBackend ──► PadSnapshot ┘
//!                   ▲
//!          ConnectionMonitor (2s)
//! ```
//!
//! Keyboard repeat is evaluated at ~60 Hz, the controller is polled at 20 Hz.
//! Both sources share one repeat model but keep independent state.

pub mod arbiter;
pub mod connection;
pub mod engine;
pub mod engine_handle;
pub mod gilrs_backend;
pub mod poller;
pub mod repeat;
pub mod types;

pub use arbiter::{ArbiterSettings, Callbacks, EventSink, FocusFlag, WindowFocus, InputArbiter};
pub use connection::{ConnectionMonitor, DeviceError, DeviceHandle, DeviceInfo, GamepadBackend};
pub use engine::KeyCommand;
pub use engine_handle::{EngineHandle, EngineSettings};
pub use gilrs_backend::GilrsBackend;
pub use poller::PadSnapshot;
pub use repeat::RepeatTiming;
pub use types::{Direction, EngineEvent, InputSource, Key, NavigationEvent, Orientation, Step};
