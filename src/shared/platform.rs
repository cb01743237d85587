// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraBackend, CameraService, HeadlessPreview, PreviewSurface, RotationSource};
use derive_more::Display;
use std::sync::Arc;

/// First API level with the Camera2 API.
pub const CAMERA2_API_LEVEL: u32 = 21;

/// First API level with the extended Camera2 stream configuration.
pub const CAMERA2_API23_LEVEL: u32 = 23;

/// The system a camera runs on.
pub trait Platform: Send + Sync {
    fn api_level(&self) -> u32;

    fn camera_service(&self) -> Arc<dyn CameraService>;

    fn rotation_source(&self) -> Arc<dyn RotationSource>;

    fn create_preview(&self) -> Arc<dyn PreviewSurface> {
        Arc::new(HeadlessPreview::new())
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiTier {
    #[display("low")]
    Low,
    #[display("mid")]
    Mid,
    #[display("high")]
    High,
}

impl ApiTier {
    pub fn from_api_level(api_level: u32) -> Self {
        if api_level < CAMERA2_API_LEVEL {
            ApiTier::Low
        } else if api_level < CAMERA2_API23_LEVEL {
            ApiTier::Mid
        } else {
            ApiTier::High
        }
    }

    pub fn backend(self) -> CameraBackend {
        match self {
            ApiTier::Low => CameraBackend::Camera1,
            ApiTier::Mid => CameraBackend::Camera2,
            ApiTier::High => CameraBackend::Camera2Api23,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_api_level() {
        assert_eq!(ApiTier::from_api_level(14).backend(), CameraBackend::Camera1);
        assert_eq!(ApiTier::from_api_level(20).backend(), CameraBackend::Camera1);
        assert_eq!(ApiTier::from_api_level(21).backend(), CameraBackend::Camera2);
        assert_eq!(ApiTier::from_api_level(22).backend(), CameraBackend::Camera2);
        assert_eq!(ApiTier::from_api_level(23).backend(), CameraBackend::Camera2Api23);
        assert_eq!(ApiTier::from_api_level(34).backend(), CameraBackend::Camera2Api23);
    }
}
