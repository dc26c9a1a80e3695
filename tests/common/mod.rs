//! Scripted gamepad backend and event helpers shared by the integration tests.

#![allow(dead_code)]

use kiosknav::input::{
    ArbiterSettings, DeviceError, DeviceHandle, DeviceInfo, EngineEvent, FocusFlag,
    GamepadBackend, InputArbiter, NavigationEvent, Orientation, PadSnapshot, Step,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
pub struct Pad {
    pub plugged_in: bool,
    pub snapshot: PadSnapshot,
    pub fail_reads: bool,
    pub released: usize,
}

/// Backend whose single device is driven by the test through a shared handle
#[derive(Clone, Default)]
pub struct ScriptedPad(pub Arc<Mutex<Pad>>);

impl ScriptedPad {
    pub fn plugged_in() -> Self {
        let pad = Self::default();
        pad.0.lock().unwrap().plugged_in = true;
        pad
    }

    pub fn set(&self, snapshot: PadSnapshot) {
        self.0.lock().unwrap().snapshot = snapshot;
    }

    pub fn unplug(&self) {
        let mut pad = self.0.lock().unwrap();
        pad.plugged_in = false;
        pad.fail_reads = true;
    }

    pub fn plug(&self) {
        let mut pad = self.0.lock().unwrap();
        pad.plugged_in = true;
        pad.fail_reads = false;
    }

    pub fn released(&self) -> usize {
        self.0.lock().unwrap().released
    }

    pub fn boxed(&self) -> Option<Box<dyn GamepadBackend>> {
        Some(Box::new(self.clone()))
    }
}

impl GamepadBackend for ScriptedPad {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let pad = self.0.lock().unwrap();
        if pad.plugged_in {
            Ok(vec![DeviceInfo {
                index: 0,
                name: "Scripted Pad".into(),
            }])
        } else {
            Ok(Vec::new())
        }
    }

    fn acquire(&mut self, device: &DeviceInfo) -> Result<DeviceHandle, DeviceError> {
        Ok(DeviceHandle::new(device.clone()))
    }

    fn read_state(&mut self, device: &DeviceHandle) -> Result<PadSnapshot, DeviceError> {
        let pad = self.0.lock().unwrap();
        if pad.fail_reads {
            return Err(DeviceError::ReadFailed(device.info().name.clone()));
        }
        Ok(pad.snapshot)
    }

    fn release(&mut self, _device: DeviceHandle) {
        self.0.lock().unwrap().released += 1;
    }
}

pub fn arbiter(
    orientation: Orientation,
    backend: Option<Box<dyn GamepadBackend>>,
    focus: FocusFlag,
) -> (InputArbiter, mpsc::UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let arbiter = InputArbiter::new(
        orientation,
        ArbiterSettings::default(),
        backend,
        Box::new(focus),
        Box::new(tx),
    );
    (arbiter, rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn moves(events: &[EngineEvent]) -> Vec<Step> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Navigation(NavigationEvent::Move(step)) => Some(*step),
            _ => None,
        })
        .collect()
}

pub fn is_navigation(event: &EngineEvent) -> bool {
    matches!(event, EngineEvent::Navigation(_))
}
