// This is free and unencumbered software released into the public domain.

use crate::shared::Facing;
use derive_more::Display;
use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicU64, Ordering},
};

/// Rotation of the display from its natural orientation.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    #[display("0")]
    Rotation0,
    #[display("90")]
    Rotation90,
    #[display("180")]
    Rotation180,
    #[display("270")]
    Rotation270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Rotation0 => 0,
            Rotation::Rotation90 => 90,
            Rotation::Rotation180 => 180,
            Rotation::Rotation270 => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Rotation0),
            90 => Some(Rotation::Rotation90),
            180 => Some(Rotation::Rotation180),
            270 => Some(Rotation::Rotation270),
            _ => None,
        }
    }
}

/// Physical orientation reported by the device sensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationEvent {
    /// Device is flat or the angle cannot be determined.
    Unknown,
    Degrees(u32),
}

pub type OrientationListener = Arc<dyn Fn(OrientationEvent) + Send + Sync + 'static>;

pub trait RotationSource: Send + Sync {
    fn display_rotation(&self) -> Rotation;

    fn subscribe(&self, listener: OrientationListener) -> u64;

    fn unsubscribe(&self, id: u64);
}

/// A rotation source driven by the host, e.g. from its activity callbacks.
#[derive(Default)]
pub struct ManualRotationSource {
    rotation: Mutex<Rotation>,
    listeners: Mutex<Vec<(u64, OrientationListener)>>,
    next_id: AtomicU64,
}

impl ManualRotationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotates the display and reports the matching sensor angle.
    pub fn rotate(&self, rotation: Rotation) {
        *self.rotation.lock().unwrap_or_else(|p| p.into_inner()) = rotation;
        self.notify(OrientationEvent::Degrees(rotation.degrees()));
    }

    pub fn notify(&self, event: OrientationEvent) {
        let listeners: Vec<OrientationListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

impl RotationSource for ManualRotationSource {
    fn display_rotation(&self) -> Rotation {
        *self.rotation.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn subscribe(&self, listener: OrientationListener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|(i, _)| *i != id);
    }
}

/// Reports display rotation changes, in degrees, to a single handler.
pub struct OrientationMonitor {
    source: Arc<dyn RotationSource>,
    handler: Arc<dyn Fn(u32) + Send + Sync + 'static>,
    last: Arc<Mutex<Option<Rotation>>>,
    subscription: Option<u64>,
}

impl OrientationMonitor {
    pub fn new(
        source: Arc<dyn RotationSource>,
        handler: impl Fn(u32) + Send + Sync + 'static,
    ) -> Self {
        Self {
            source,
            handler: Arc::new(handler),
            last: Arc::new(Mutex::new(None)),
            subscription: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribes to the source and reports the current rotation right away.
    pub fn enable(&mut self) {
        if self.subscription.is_some() {
            return;
        }

        let source: Weak<dyn RotationSource> = Arc::downgrade(&self.source);
        let last = Arc::clone(&self.last);
        let handler = Arc::clone(&self.handler);
        let listener: OrientationListener = Arc::new(move |event| {
            if event == OrientationEvent::Unknown {
                return;
            }
            let Some(source) = source.upgrade() else {
                return;
            };
            let rotation = source.display_rotation();
            {
                let mut last = last.lock().unwrap_or_else(|p| p.into_inner());
                if *last == Some(rotation) {
                    return;
                }
                *last = Some(rotation);
            }
            handler(rotation.degrees());
        });
        self.subscription = Some(self.source.subscribe(listener));

        let rotation = self.source.display_rotation();
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = Some(rotation);
        (self.handler)(rotation.degrees());
    }

    pub fn disable(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.source.unsubscribe(id);
        }
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

impl Drop for OrientationMonitor {
    fn drop(&mut self) {
        self.disable();
    }
}

/// Clockwise rotation to apply to the preview for a display rotation.
pub fn display_orientation(sensor: u32, display: u32, facing: Facing) -> u32 {
    match facing {
        // Front previews are mirrored.
        Facing::Front => (360 - (sensor + display) % 360) % 360,
        Facing::Back => (sensor + 360 - display % 360) % 360,
    }
}

/// Clockwise rotation to record in a still picture for a display rotation.
pub fn jpeg_orientation(sensor: u32, display: u32, facing: Facing) -> u32 {
    match facing {
        Facing::Front => (sensor + display) % 360,
        Facing::Back => (sensor + 360 - display % 360) % 360,
    }
}
