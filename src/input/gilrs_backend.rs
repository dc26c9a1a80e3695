use crate::input::connection::{DeviceError, DeviceHandle, DeviceInfo, GamepadBackend};
use crate::input::poller::PadSnapshot;
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, error, info, trace};

// Gamepad backend on top of gilrs
pub struct GilrsBackend {
    gilrs: Gilrs,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        match Gilrs::new() {
            Ok(gilrs) => {
                info!("Successfully initialized gilrs");
                Ok(Self { gilrs })
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                Err(DeviceError::BackendUnavailable(e.to_string()))
            }
        }
    }

    // gilrs only refreshes its cached gamepad state while events are drained
    fn pump_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => debug!("gilrs reported gamepad {} connected", id),
                EventType::Disconnected => debug!("gilrs reported gamepad {} disconnected", id),
                _ => trace!("gilrs event from {}: {:?}", id, event),
            }
        }
    }

    fn find(&self, index: usize) -> Option<GamepadId> {
        self.gilrs
            .gamepads()
            .map(|(id, _)| id)
            .find(|id| usize::from(*id) == index)
    }
}

impl GamepadBackend for GilrsBackend {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, DeviceError> {
        self.pump_events();

        let devices: Vec<DeviceInfo> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, gamepad)| DeviceInfo {
                index: usize::from(id),
                name: gamepad.name().to_string(),
            })
            .collect();

        if !devices.is_empty() {
            debug!("Found {} gamepads:", devices.len());
            for device in &devices {
                debug!("  [{}] {}", device.index, device.name);
            }
        }
        Ok(devices)
    }

    fn acquire(&mut self, device: &DeviceInfo) -> Result<DeviceHandle, DeviceError> {
        let id = self
            .find(device.index)
            .ok_or_else(|| DeviceError::NotFound(device.name.clone()))?;

        match self.gilrs.connected_gamepad(id) {
            Some(_) => Ok(DeviceHandle::new(device.clone())),
            None => Err(DeviceError::AcquireFailed(format!(
                "{} is no longer connected",
                device.name
            ))),
        }
    }

    fn read_state(&mut self, device: &DeviceHandle) -> Result<PadSnapshot, DeviceError> {
        self.pump_events();

        let info = device.info();
        let id = self
            .find(info.index)
            .ok_or_else(|| DeviceError::Disconnected(info.name.clone()))?;
        let gamepad = self
            .gilrs
            .connected_gamepad(id)
            .ok_or_else(|| DeviceError::Disconnected(info.name.clone()))?;

        Ok(PadSnapshot {
            dpad_up: gamepad.is_pressed(Button::DPadUp),
            dpad_down: gamepad.is_pressed(Button::DPadDown),
            dpad_left: gamepad.is_pressed(Button::DPadLeft),
            dpad_right: gamepad.is_pressed(Button::DPadRight),
            stick_x: gamepad.value(Axis::LeftStickX),
            stick_y: gamepad.value(Axis::LeftStickY),
            confirm: gamepad.is_pressed(Button::South),
            cancel: gamepad.is_pressed(Button::East),
            auxiliary: gamepad.is_pressed(Button::West),
        })
    }

    fn release(&mut self, device: DeviceHandle) {
        // gilrs has no exclusive acquisition; dropping the handle is enough
        debug!("Released gamepad {}", device.info().name);
    }
}
