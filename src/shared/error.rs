// This is free and unencumbered software released into the public domain.

use derive_more::Display;
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera device available")]
    NoCamera,

    #[error("camera is not opened; call start() first")]
    NotOpened,

    #[error("camera hardware only supports the legacy camera API")]
    LegacyHardware,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("camera closed")]
    Closed,

    #[error("driver error while {context}")]
    DriverError {
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    #[inline]
    pub fn driver(context: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::DriverError {
            context,
            source: Box::new(source),
        }
    }

    #[inline]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    #[inline]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Status code reported by a camera service or device.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum CameraStatus {
    #[display("camera device is in use")]
    InUse,
    #[display("camera device was disconnected")]
    Disconnected,
    #[display("camera service failed")]
    ServiceFailure,
    #[display("camera device failed")]
    DeviceFailure,
    #[display("permission denied")]
    PermissionDenied,
    #[display("unknown camera id")]
    UnknownCamera,
    #[display("operation not supported by the camera service")]
    Unsupported,
    #[display("camera status {_0}")]
    Code(i32),
}

impl core::error::Error for CameraStatus {}

pub type CameraResult<T = ()> = core::result::Result<T, CameraStatus>;
