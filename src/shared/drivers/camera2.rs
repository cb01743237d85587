// This is free and unencumbered software released into the public domain.

use super::session::Session;
use crate::shared::{
    AspectRatio, CameraBackend, CameraCharacteristics, CameraDriver, CameraError, CameraEvent,
    CameraService, CaptureGate, DriverContext, DriverSettings, Facing, Flash, FrameSink,
    HardwareLevel, PreviewFrame, RawFrame, SizeMap, choose_aspect_ratio, find_camera,
};
use alloc::{borrow::Cow, collections::BTreeSet};
use std::{any::Any, sync::Arc};

/// Driver for the Camera2 API.
///
/// Refuses devices that only implement the legacy hardware level; the
/// camera falls back to Camera1 for those.
pub struct Camera2CameraDriver {
    context: DriverContext,
    settings: DriverSettings,
    session: Option<Session>,
    preview_sizes: SizeMap,
    picture_sizes: SizeMap,
    gate: CaptureGate,
    high_resolution: bool,
}

impl Camera2CameraDriver {
    pub fn new(context: DriverContext, settings: DriverSettings) -> Self {
        Self {
            context,
            settings,
            session: None,
            preview_sizes: SizeMap::new(),
            picture_sizes: SizeMap::new(),
            gate: CaptureGate::default(),
            high_resolution: false,
        }
    }

    /// Camera2 with the API 23 high-resolution still sizes.
    pub fn new_api23(context: DriverContext, settings: DriverSettings) -> Self {
        let mut driver = Self::new(context, settings);
        driver.high_resolution = true;
        driver
    }

    pub fn picture_sizes(&self) -> &SizeMap {
        &self.picture_sizes
    }

    fn choose_camera(
        &mut self,
        service: &dyn CameraService,
    ) -> Result<(String, CameraCharacteristics), CameraError> {
        let found = find_camera(service, self.settings.facing)
            .map_err(|e| CameraError::driver("listing cameras", e))?;
        let (id, characteristics) = match found {
            Some(found) => found,
            None => {
                let ids = service
                    .camera_ids()
                    .map_err(|e| CameraError::driver("listing cameras", e))?;
                let id = ids.into_iter().next().ok_or(CameraError::NoCamera)?;
                let characteristics = service
                    .characteristics(&id)
                    .map_err(|e| CameraError::driver("reading camera characteristics", e))?;
                self.settings.facing = characteristics.facing;
                (id, characteristics)
            },
        };
        if characteristics.hardware_level == HardwareLevel::Legacy {
            return Err(CameraError::LegacyHardware);
        }
        Ok((id, characteristics))
    }

    fn collect_sizes(&mut self, characteristics: &CameraCharacteristics) {
        self.preview_sizes = characteristics.preview_sizes.iter().copied().collect();
        self.picture_sizes = characteristics.picture_sizes.iter().copied().collect();
        if self.high_resolution {
            for size in &characteristics.high_resolution_picture_sizes {
                self.picture_sizes.add(*size);
            }
        }
        for ratio in self.preview_sizes.ratios() {
            if !self.picture_sizes.contains(ratio) {
                self.preview_sizes.remove(ratio);
            }
        }
    }

    fn frame_sink(&self) -> FrameSink {
        let events = self.context.events.clone();
        Arc::new(move |frame: RawFrame| {
            events.try_send_frame(PreviewFrame::from(frame));
        })
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

    fn reset(&mut self) {
        self.session = None;
        self.preview_sizes.clear();
        self.picture_sizes.clear();
    }
}

impl dogma::Named for Camera2CameraDriver {
    fn name(&self) -> Cow<'_, str> {
        if self.high_resolution {
            "camera2-api23".into()
        } else {
            "camera2".into()
        }
    }
}

impl CameraDriver for Camera2CameraDriver {
    fn backend(&self) -> CameraBackend {
        if self.high_resolution {
            CameraBackend::Camera2Api23
        } else {
            CameraBackend::Camera2
        }
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if self.session.is_some() {
            return Ok(());
        }

        let service = Arc::clone(&self.context.service);
        let (id, characteristics) = self.choose_camera(&*service)?;
        self.collect_sizes(&characteristics);
        let ratio = match choose_aspect_ratio(&self.preview_sizes, self.settings.aspect_ratio) {
            Some(ratio) => ratio,
            None => {
                self.reset();
                return Err(CameraError::unsupported("camera reports no usable preview sizes"));
            },
        };
        self.settings.aspect_ratio = ratio;
        if self.settings.auto_focus && !characteristics.auto_focus {
            self.settings.auto_focus = false;
        }

        match Session::open(&*service, &id, characteristics) {
            Ok(session) => self.session = Some(session),
            Err(err) => {
                self.reset();
                return Err(err);
            },
        }
        self.context
            .preview
            .set_display_orientation(self.settings.display_orientation);
        if let Err(err) = self.restart_preview() {
            self.reset();
            return Err(err);
        }

        self.context.events.send(CameraEvent::Opened);
        Ok(())
    }

    fn stop(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.reset();
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
                "failed to restart capture session"
            );
        }
        true
    }

    fn set_auto_focus(&mut self, enabled: bool) {
        self.settings.auto_focus = match &self.session {
            Some(session) => enabled && session.characteristics.auto_focus,
            None => enabled,
        };
    }

    fn auto_focus(&self) -> bool {
        self.settings.auto_focus
    }

    fn set_flash(&mut self, flash: Flash) {
        self.settings.flash = flash;
    }

    fn take_picture(&mut self) -> Result<(), CameraError> {
        let auto_focus = self.settings.auto_focus;
        let backend = self.backend();
        let Some(session) = self.session.as_mut() else {
            return Err(CameraError::NotOpened);
        };
        session.capture(
            &self.gate,
            &self.context.events,
            backend,
            &self.picture_sizes,
            &self.settings,
            auto_focus,
        )
    }

    fn set_display_orientation(&mut self, degrees: u32) {
        self.settings.display_orientation = degrees;
        self.context.preview.set_display_orientation(degrees);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Camera2CameraDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
