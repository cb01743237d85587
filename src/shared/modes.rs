// This is free and unencumbered software released into the public domain.

use crate::shared::CameraError;
use core::str::FromStr;
use derive_more::Display;

/// Direction the camera faces relative to the device screen.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Faces away from the screen.
    #[default]
    #[display("back")]
    Back,
    /// Faces the same direction as the screen.
    #[display("front")]
    Front,
}

impl FromStr for Facing {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => Ok(Self::Back),
            "front" => Ok(Self::Front),
            other => Err(CameraError::invalid_config(format!("unknown facing: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Flash {
    /// Never fired.
    #[display("off")]
    Off,
    /// Always fired during snapshot.
    #[display("on")]
    On,
    /// Constant light during preview, auto-focus and snapshot.
    #[display("torch")]
    Torch,
    /// Fired when required.
    #[default]
    #[display("auto")]
    Auto,
    /// Fired in red-eye reduction mode.
    #[display("red-eye")]
    RedEye,
}

impl Flash {
    pub const ALL: [Flash; 5] = [
        Flash::Off,
        Flash::On,
        Flash::Torch,
        Flash::Auto,
        Flash::RedEye,
    ];
}

impl FromStr for Flash {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "torch" => Ok(Self::Torch),
            "auto" => Ok(Self::Auto),
            "red-eye" | "redeye" | "red_eye" => Ok(Self::RedEye),
            other => Err(CameraError::invalid_config(format!("unknown flash mode: {other}"))),
        }
    }
}
