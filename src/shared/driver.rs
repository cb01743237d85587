// This is free and unencumbered software released into the public domain.

use crate::shared::{
    AspectRatio, CameraConfig, CameraError, CameraEvent, CameraResult, CameraService, EventSender,
    Facing, Flash, PreviewSurface,
};
use alloc::collections::BTreeSet;
use bytes::Bytes;
use derive_more::Display;
use std::{
    any::Any,
    sync::{Arc, Mutex},
};

/// Camera API generation a driver is built on, lowest capability first.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CameraBackend {
    #[display("camera1")]
    Camera1,
    #[display("camera2")]
    Camera2,
    #[display("camera2-api23")]
    Camera2Api23,
}

/// User-facing settings a driver carries, kept across restarts and fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverSettings {
    pub facing: Facing,
    pub flash: Flash,
    /// Requested auto-focus; the effective value depends on the device.
    pub auto_focus: bool,
    pub aspect_ratio: AspectRatio,
    pub display_orientation: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from(&CameraConfig::default())
    }
}

impl From<&CameraConfig> for DriverSettings {
    fn from(config: &CameraConfig) -> Self {
        Self {
            facing: config.facing,
            flash: config.flash,
            auto_focus: config.auto_focus,
            aspect_ratio: config.aspect_ratio,
            display_orientation: 0,
        }
    }
}

/// Everything a driver needs from its owner.
#[derive(Clone)]
pub struct DriverContext {
    pub service: Arc<dyn CameraService>,
    pub preview: Arc<dyn PreviewSurface>,
    pub events: EventSender,
}

pub trait CameraDriver: dogma::Named + Send {
    fn backend(&self) -> CameraBackend;

    /// Opens the device and starts the preview.
    fn start(&mut self) -> Result<(), CameraError>;

    /// Closes the device. Does nothing if it is not open.
    fn stop(&mut self);

    fn is_camera_opened(&self) -> bool;

    fn settings(&self) -> &DriverSettings;

    fn set_facing(&mut self, facing: Facing);

    fn facing(&self) -> Facing {
        self.settings().facing
    }

    /// Ratios the open camera can deliver. Empty while closed.
    fn supported_aspect_ratios(&self) -> BTreeSet<AspectRatio>;

    /// Returns `false` if the open camera does not support `ratio`.
    fn set_aspect_ratio(&mut self, ratio: AspectRatio) -> bool;

    fn aspect_ratio(&self) -> AspectRatio {
        self.settings().aspect_ratio
    }

    fn set_auto_focus(&mut self, enabled: bool);

    fn auto_focus(&self) -> bool;

    fn set_flash(&mut self, flash: Flash);

    fn flash(&self) -> Flash {
        self.settings().flash
    }

    /// Starts a still capture; the result arrives as a picture-taken event.
    fn take_picture(&mut self) -> Result<(), CameraError>;

    fn set_display_orientation(&mut self, degrees: u32);

    fn as_any(&self) -> &dyn Any;
}

/// Serializes still captures with the device lifecycle.
///
/// Each open session has an epoch. A capture completing after its session was
/// closed is discarded, so no picture is delivered after the closed event.
#[derive(Clone, Debug, Default)]
pub(crate) struct CaptureGate {
    state: Arc<Mutex<GateState>>,
}

#[derive(Debug, Default)]
struct GateState {
    epoch: u64,
    in_flight: bool,
}

impl CaptureGate {
    /// Reserves the gate, or returns `None` if a capture is already in flight.
    pub(crate) fn begin(&self) -> Option<u64> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(state.epoch)
    }

    /// Releases a reservation whose capture never started.
    pub(crate) fn cancel(&self, epoch: u64) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.epoch == epoch {
            state.in_flight = false;
        }
    }

    pub(crate) fn complete(
        &self,
        epoch: u64,
        result: CameraResult<Bytes>,
        events: &EventSender,
        _backend: CameraBackend,
    ) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.epoch != epoch {
            #[cfg(feature = "tracing")]
            asimov_module::tracing::debug!(
                target: "asimov_cameraview_module",
                backend = %_backend,
                "discarding picture completed after the camera was closed"
            );
            return;
        }
        state.in_flight = false;
        match result {
            Ok(data) => events.send(CameraEvent::PictureTaken(data)),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                asimov_module::tracing::warn!(
                    target: "asimov_cameraview_module",
                    backend = %_backend,
                    error = %_err,
                    "picture capture failed"
                );
            },
        }
    }

    /// Ends the current session and emits the closed event under the gate.
    pub(crate) fn close(&self, events: &EventSender) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.epoch += 1;
        state.in_flight = false;
        events.send(CameraEvent::Closed);
    }
}
