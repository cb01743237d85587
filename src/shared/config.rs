// This is free and unencumbered software released into the public domain.

use crate::shared::{AspectRatio, Facing, Flash};

/// Initial settings for a [`Camera`](crate::shared::Camera).
#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub facing: Facing,
    pub flash: Flash,
    pub auto_focus: bool,
    pub aspect_ratio: AspectRatio,
    /// Preview frames allowed to wait for the dispatcher before new ones are dropped.
    pub buffer_frames: usize,
    pub diagnostics: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Back,
            flash: Flash::Auto,
            auto_focus: true,
            aspect_ratio: AspectRatio::DEFAULT,
            buffer_frames: 2,
            diagnostics: false,
        }
    }
}

impl CameraConfig {
    pub fn new(facing: Facing) -> Self {
        Self {
            facing,
            ..Default::default()
        }
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = flash;
        self
    }

    pub fn with_auto_focus(mut self, enabled: bool) -> Self {
        self.auto_focus = enabled;
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn with_buffer_frames(mut self, n: usize) -> Self {
        self.buffer_frames = n.max(1);
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }
}
