// This is free and unencumbered software released into the public domain.

use crate::shared::Size;
use std::sync::Mutex;

/// The surface a camera preview is rendered into.
pub trait PreviewSurface: Send + Sync {
    fn is_ready(&self) -> bool;

    /// On-screen size, if the surface has been laid out.
    fn size(&self) -> Option<Size>;

    fn set_buffer_size(&self, size: Size);

    fn set_display_orientation(&self, degrees: u32);
}

/// An off-screen surface that is always ready and never laid out.
#[derive(Debug, Default)]
pub struct HeadlessPreview {
    state: Mutex<HeadlessState>,
}

#[derive(Clone, Copy, Debug, Default)]
struct HeadlessState {
    buffer_size: Option<Size>,
    display_orientation: u32,
}

impl HeadlessPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(&self) -> Option<Size> {
        self.state().buffer_size
    }

    pub fn display_orientation(&self) -> u32 {
        self.state().display_orientation
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl PreviewSurface for HeadlessPreview {
    fn is_ready(&self) -> bool {
        true
    }

    fn size(&self) -> Option<Size> {
        None
    }

    fn set_buffer_size(&self, size: Size) {
        self.state().buffer_size = Some(size);
    }

    fn set_display_orientation(&self, degrees: u32) {
        self.state().display_orientation = degrees;
    }
}
