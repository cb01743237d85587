// This is free and unencumbered software released into the public domain.

//! The system camera service as seen by the drivers.
//!
//! A camera service enumerates devices and opens them. Drivers only talk to
//! these traits, so the same Camera1/Camera2 logic runs against the NDK on
//! Android and against [`SimulatedPlatform`](crate::shared::SimulatedPlatform)
//! everywhere else.

use crate::shared::{CameraResult, Facing, Flash, RawFrame, Size};
use bytes::Bytes;
use derive_more::Display;
use std::sync::Arc;

pub type FrameSink = Arc<dyn Fn(RawFrame) + Send + Sync + 'static>;

pub type CaptureCallback = Box<dyn FnOnce(CameraResult<Bytes>) + Send + 'static>;

/// Camera2 hardware support level, ordered by capability.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HardwareLevel {
    #[display("legacy")]
    Legacy,
    #[display("limited")]
    Limited,
    #[display("full")]
    Full,
    #[display("level3")]
    Level3,
}

#[derive(Clone, Debug)]
pub struct CameraCharacteristics {
    pub facing: Facing,
    pub hardware_level: HardwareLevel,
    /// Clockwise angle the sensor image must be rotated to be upright.
    pub sensor_orientation: u32,
    pub preview_sizes: Vec<Size>,
    pub picture_sizes: Vec<Size>,
    /// Extra still sizes only reachable through the API 23 stream configuration.
    pub high_resolution_picture_sizes: Vec<Size>,
    pub flash_modes: Vec<Flash>,
    pub auto_focus: bool,
}

impl CameraCharacteristics {
    pub fn supports_flash(&self, flash: Flash) -> bool {
        self.flash_modes.contains(&flash)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    pub size: Size,
    pub flash: Flash,
    pub auto_focus: bool,
    /// Clockwise rotation to record in the JPEG.
    pub jpeg_orientation: u32,
}

pub trait CameraService: Send + Sync {
    fn camera_ids(&self) -> CameraResult<Vec<String>>;

    fn characteristics(&self, id: &str) -> CameraResult<CameraCharacteristics>;

    fn open(&self, id: &str) -> CameraResult<Box<dyn CameraDevice>>;
}

/// An opened camera. Dropping it must release the device.
pub trait CameraDevice: Send {
    fn id(&self) -> &str;

    /// Starts streaming frames of `size` into `sink`, from a device thread.
    fn start_preview(&mut self, size: Size, sink: FrameSink) -> CameraResult;

    fn stop_preview(&mut self);

    fn set_display_orientation(&mut self, degrees: u32);

    /// Requests a still capture. `done` runs later, on a device thread.
    fn capture(&mut self, request: CaptureRequest, done: CaptureCallback) -> CameraResult;

    fn close(&mut self);
}

/// Returns the id of the first camera facing `facing`, with its characteristics.
pub fn find_camera(
    service: &dyn CameraService,
    facing: Facing,
) -> CameraResult<Option<(String, CameraCharacteristics)>> {
    for id in service.camera_ids()? {
        let characteristics = service.characteristics(&id)?;
        if characteristics.facing == facing {
            return Ok(Some((id, characteristics)));
        }
    }
    Ok(None)
}
