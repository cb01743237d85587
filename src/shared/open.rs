// This is free and unencumbered software released into the public domain.

use super::{
    CameraBackend, CameraDriver, DriverContext, DriverSettings, Platform,
    drivers::{camera1::Camera1CameraDriver, camera2::Camera2CameraDriver},
};
use std::sync::Arc;

pub fn open_driver(
    backend: CameraBackend,
    context: DriverContext,
    settings: DriverSettings,
) -> Box<dyn CameraDriver> {
    match backend {
        CameraBackend::Camera1 => Box::new(Camera1CameraDriver::new(context, settings)),
        CameraBackend::Camera2 => Box::new(Camera2CameraDriver::new(context, settings)),
        CameraBackend::Camera2Api23 => Box::new(Camera2CameraDriver::new_api23(context, settings)),
    }
}

/// The native camera platform of this target, or the simulated one.
pub fn default_platform() -> Arc<dyn Platform> {
    cfg_if::cfg_if! {
        if #[cfg(all(feature = "android", target_os = "android"))] {
            Arc::new(super::AndroidPlatform::new())
        } else {
            Arc::new(super::SimulatedPlatform::default())
        }
    }
}
