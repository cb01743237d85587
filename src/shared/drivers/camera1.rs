// This is free and unencumbered software released into the public domain.

use super::session::Session;
use crate::shared::{
    AspectRatio, CameraBackend, CameraDriver, CameraError, CameraEvent, CaptureGate,
    DriverContext, DriverSettings, Facing, Flash, FrameSink, PreviewFrame, RawFrame, SizeMap,
    choose_aspect_ratio, display_orientation, find_camera,
};
use alloc::{borrow::Cow, collections::BTreeSet};
use std::{any::Any, sync::Arc};

/// Driver for the original camera API.
///
/// Works with every hardware level, which makes it the fallback target.
pub struct Camera1CameraDriver {
    context: DriverContext,
    settings: DriverSettings,
    session: Option<Session>,
    preview_sizes: SizeMap,
    picture_sizes: SizeMap,
    gate: CaptureGate,
}

impl Camera1CameraDriver {
    pub fn new(context: DriverContext, settings: DriverSettings) -> Self {
        Self {
            context,
            settings,
            session: None,
            preview_sizes: SizeMap::new(),
            picture_sizes: SizeMap::new(),
            gate: CaptureGate::default(),
        }
    }

    fn frame_sink(&self) -> FrameSink {
        let events = self.context.events.clone();
        Arc::new(move |frame: RawFrame| {
            events.try_send_frame(PreviewFrame::Packed {
                data: frame.to_nv21(),
            });
        })
    }

    /// Applies the settings to a freshly opened session.
    fn configure(&mut self) -> Result<(), CameraError> {
        let ratio = choose_aspect_ratio(&self.preview_sizes, self.settings.aspect_ratio)
            .ok_or_else(|| CameraError::unsupported("camera reports no preview sizes"))?;
        self.settings.aspect_ratio = ratio;

        let Some(session) = self.session.as_ref() else {
            return Err(CameraError::NotOpened);
        };
        if !session.characteristics.supports_flash(self.settings.flash) {
            self.settings.flash = Flash::Off;
        }

        self.apply_display_orientation();
        self.restart_preview()
    }

    fn restart_preview(&mut self) -> Result<(), CameraError> {
        let sink = self.frame_sink();
        let Some(session) = self.session.as_mut() else {
            return Err(CameraError::NotOpened);
        };
        session.restart_preview(
            &*self.context.preview,
            &self.preview_sizes,
            self.settings.aspect_ratio,
            self.settings.display_orientation,
            sink,
        )
    }

    fn apply_display_orientation(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let degrees = display_orientation(
            session.characteristics.sensor_orientation,
            self.settings.display_orientation,
            self.settings.facing,
        );
        session.device.set_display_orientation(degrees);
        self.context.preview.set_display_orientation(degrees);
    }
}

impl dogma::Named for Camera1CameraDriver {
    fn name(&self) -> Cow<'_, str> {
        "camera1".into()
    }
}

impl CameraDriver for Camera1CameraDriver {
    fn backend(&self) -> CameraBackend {
        CameraBackend::Camera1
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if self.session.is_some() {
            return Ok(());
        }

        let service = Arc::clone(&self.context.service);
        let (id, characteristics) = find_camera(&*service, self.settings.facing)
            .map_err(|e| CameraError::driver("listing cameras", e))?
            .ok_or(CameraError::NoCamera)?;

        self.preview_sizes = characteristics.preview_sizes.iter().copied().collect();
        self.picture_sizes = characteristics.picture_sizes.iter().copied().collect();
        self.session = Some(Session::open(&*service, &id, characteristics)?);

        if let Err(err) = self.configure() {
            self.session = None;
            self.preview_sizes.clear();
            self.picture_sizes.clear();
            return Err(err);
        }

        self.context.events.send(CameraEvent::Opened);
        Ok(())
    }

    fn stop(&mut self) {
        if self.session.take().is_none() {
            return;
        }
        self.preview_sizes.clear();
        self.picture_sizes.clear();
        self.gate.close(&self.context.events);
    }

    fn is_camera_opened(&self) -> bool {
        self.session.is_some()
    }

    fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    fn set_facing(&mut self, facing: Facing) {
        if self.settings.facing == facing {
            return;
        }
        self.settings.facing = facing;
        if self.is_camera_opened() {
            self.stop();
            if let Err(_err) = self.start() {
                #[cfg(feature = "tracing")]
                asimov_module::tracing::warn!(
                    target: "asimov_cameraview_module",
                    %facing,
                    error = %_err,
                    "failed to reopen camera after facing change"
                );
            }
        }
    }

    fn supported_aspect_ratios(&self) -> BTreeSet<AspectRatio> {
        self.preview_sizes.ratios()
    }

    fn set_aspect_ratio(&mut self, ratio: AspectRatio) -> bool {
        if self.session.is_none() || ratio == self.settings.aspect_ratio {
            self.settings.aspect_ratio = ratio;
            return true;
        }
        if !self.preview_sizes.contains(ratio) {
            return false;
        }
        self.settings.aspect_ratio = ratio;
        if let Err(_err) = self.restart_preview() {
            #[cfg(feature = "tracing")]
            asimov_module::tracing::warn!(
                target: "asimov_cameraview_module",
                %ratio,
                error = %_err,
                "failed to restart preview"
            );
        }
        true
    }

    fn set_auto_focus(&mut self, enabled: bool) {
        self.settings.auto_focus = enabled;
    }

    fn auto_focus(&self) -> bool {
        match &self.session {
            Some(session) => self.settings.auto_focus && session.characteristics.auto_focus,
            None => self.settings.auto_focus,
        }
    }

    fn set_flash(&mut self, flash: Flash) {
        let Some(session) = &self.session else {
            self.settings.flash = flash;
            return;
        };
        if session.characteristics.supports_flash(flash) {
            self.settings.flash = flash;
        } else if !session.characteristics.supports_flash(self.settings.flash) {
            self.settings.flash = Flash::Off;
        }
    }

    fn take_picture(&mut self) -> Result<(), CameraError> {
        let auto_focus = self.auto_focus();
        let Some(session) = self.session.as_mut() else {
            return Err(CameraError::NotOpened);
        };
        session.capture(
            &self.gate,
            &self.context.events,
            CameraBackend::Camera1,
            &self.picture_sizes,
            &self.settings,
            auto_focus,
        )
    }

    fn set_display_orientation(&mut self, degrees: u32) {
        self.settings.display_orientation = degrees;
        self.apply_display_orientation();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Camera1CameraDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
