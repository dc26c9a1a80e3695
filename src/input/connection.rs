//! Connection monitor
//!
//! Owns the gamepad backend and the acquired device handle. Nothing else in
//! the engine touches either; the arbiter only ever sees [`PadSnapshot`]s.
//!
//! # Check cycle
//!
//! ```text
//! no device ──► enumerate ──► first found ──► acquire ──► connected
//!                   │                            │
//!                   └── none ──► disconnected ◄──┘ (acquire failed)
//!
//! device ──► read state ── ok ──► connected
//!                   │
//!                   └── error ──► release ──► enumerate again (same check)
//! ```
//!
//! Connectivity notifications are edge-triggered: [`ConnectionMonitor::check`]
//! returns `Some(state)` only when the connected flag flips.

use crate::input::poller::PadSnapshot;
use tracing::{debug, info, warn};

/// Errors raised by a gamepad backend.
///
/// These never leave the engine; the monitor absorbs them and degrades to
/// "no controller".
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Gamepad backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Failed to acquire device: {0}")]
    AcquireFailed(String),

    #[error("Failed to read device state: {0}")]
    ReadFailed(String),

    #[error("Device disconnected: {0}")]
    Disconnected(String),
}

// Enumerated device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
}

/// Handle to an acquired device
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    info: DeviceInfo,
}

impl DeviceHandle {
    pub fn new(info: DeviceInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

/// Access to gamepad hardware.
///
/// Implementations must not block: every call is made from the engine's
/// scheduling loop.
pub trait GamepadBackend: Send {
    /// Lists candidate devices, preferred device first
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, DeviceError>;

    fn acquire(&mut self, device: &DeviceInfo) -> Result<DeviceHandle, DeviceError>;

    /// Polls the device and reads its current state
    fn read_state(&mut self, device: &DeviceHandle) -> Result<PadSnapshot, DeviceError>;

    fn release(&mut self, device: DeviceHandle);
}

/// Best-effort live controller connection
pub struct ConnectionMonitor {
    backend: Option<Box<dyn GamepadBackend>>,
    device: Option<DeviceHandle>,
    connected: bool,
}

impl ConnectionMonitor {
    /// Monitor without a backend stays disconnected for its whole lifetime
    pub fn new(backend: Option<Box<dyn GamepadBackend>>) -> Self {
        if backend.is_none() {
            warn!("No gamepad backend available, running keyboard-only");
        }
        Self {
            backend,
            device: None,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref().map(DeviceHandle::info)
    }

    /// Releases any held device, then enumerates and acquires the first one found
    pub fn connect(&mut self) -> Option<bool> {
        let Some(backend) = self.backend.as_mut() else {
            return None;
        };

        if let Some(device) = self.device.take() {
            debug!("Releasing {} before reconnect", device.info().name);
            backend.release(device);
        }

        let devices = match backend.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                debug!("Gamepad enumeration failed: {}", e);
                Vec::new()
            }
        };

        let acquired = match devices.first() {
            Some(first) => match backend.acquire(first) {
                Ok(handle) => {
                    info!("Acquired gamepad [{}] {}", first.index, first.name);
                    self.device = Some(handle);
                    true
                }
                Err(e) => {
                    warn!("Could not acquire gamepad {}: {}", first.name, e);
                    false
                }
            },
            None => {
                debug!("No gamepad found");
                false
            }
        };

        self.set_connected(acquired)
    }

    /// Periodic liveness check with reconnect on failure
    pub fn check(&mut self) -> Option<bool> {
        let Some(backend) = self.backend.as_mut() else {
            return None;
        };
        let Some(device) = self.device.take() else {
            return self.connect();
        };

        match backend.read_state(&device) {
            Ok(_) => {
                self.device = Some(device);
                self.set_connected(true)
            }
            Err(e) => {
                warn!("Gamepad {} failed liveness check: {}", device.info().name, e);
                backend.release(device);
                self.connect()
            }
        }
    }

    /// Reads the acquired device. Absence and read faults both yield `None`.
    pub fn poll(&mut self) -> Option<PadSnapshot> {
        let (Some(backend), Some(device)) = (self.backend.as_mut(), self.device.as_ref()) else {
            return None;
        };

        match backend.read_state(device) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!("Gamepad poll failed, skipping tick: {}", e);
                None
            }
        }
    }

    /// Releases the device; safe to call repeatedly
    pub fn release(&mut self) {
        if let (Some(backend), Some(device)) = (self.backend.as_mut(), self.device.take()) {
            info!("Releasing gamepad {}", device.info().name);
            backend.release(device);
        }
    }

    fn set_connected(&mut self, connected: bool) -> Option<bool> {
        if self.connected == connected {
            return None;
        }
        self.connected = connected;
        if connected {
            info!("Gamepad connected");
        } else {
            warn!("Gamepad disconnected");
        }
        Some(connected)
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.release();
    }
}
