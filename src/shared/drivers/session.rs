// This is free and unencumbered software released into the public domain.

use crate::shared::{
    AspectRatio, CameraBackend, CameraCharacteristics, CameraDevice, CameraError, CameraResult,
    CameraService, CaptureCallback, CaptureGate, CaptureRequest, DriverSettings, EventSender,
    FrameSink, PreviewSurface, Size, SizeMap, choose_optimal_size, jpeg_orientation,
};
use bytes::Bytes;

/// An open device with the characteristics it was opened with.
pub(crate) struct Session {
    pub(crate) device: Box<dyn CameraDevice>,
    pub(crate) characteristics: CameraCharacteristics,
    pub(crate) preview_size: Option<Size>,
}

impl Session {
    pub(crate) fn open(
        service: &dyn CameraService,
        id: &str,
        characteristics: CameraCharacteristics,
    ) -> Result<Self, CameraError> {
        let device = service
            .open(id)
            .map_err(|e| CameraError::driver("opening camera", e))?;
        #[cfg(feature = "tracing")]
        asimov_module::tracing::debug!(
            target: "asimov_cameraview_module",
            id = device.id(),
            facing = %characteristics.facing,
            level = %characteristics.hardware_level,
            "camera device opened"
        );
        Ok(Self {
            device,
            characteristics,
            preview_size: None,
        })
    }

    /// (Re)starts the preview at the best size of `ratio` for `surface`.
    pub(crate) fn restart_preview(
        &mut self,
        surface: &dyn PreviewSurface,
        sizes: &SizeMap,
        ratio: AspectRatio,
        display_orientation: u32,
        sink: FrameSink,
    ) -> Result<(), CameraError> {
        if self.preview_size.take().is_some() {
            self.device.stop_preview();
        }
        if !surface.is_ready() {
            return Ok(());
        }
        let rotated = display_orientation % 180 == 90;
        let size = choose_optimal_size(sizes, ratio, surface.size(), rotated)
            .ok_or_else(|| CameraError::unsupported(format!("no preview size for {ratio}")))?;
        surface.set_buffer_size(size);
        self.device
            .start_preview(size, sink)
            .map_err(|e| CameraError::driver("starting preview", e))?;
        self.preview_size = Some(size);
        Ok(())
    }

    /// Requests a still capture whose result is delivered through `gate`.
    pub(crate) fn capture(
        &mut self,
        gate: &CaptureGate,
        events: &EventSender,
        backend: CameraBackend,
        picture_sizes: &SizeMap,
        settings: &DriverSettings,
        auto_focus: bool,
    ) -> Result<(), CameraError> {
        let Some(epoch) = gate.begin() else {
            #[cfg(feature = "tracing")]
            asimov_module::tracing::debug!(
                target: "asimov_cameraview_module",
                %backend,
                "picture capture already in progress"
            );
            return Ok(());
        };

        let size = picture_sizes
            .largest(settings.aspect_ratio)
            .or(self.preview_size)
            .ok_or_else(|| {
                gate.cancel(epoch);
                CameraError::unsupported(format!("no picture size for {}", settings.aspect_ratio))
            })?;
        let request = CaptureRequest {
            size,
            flash: settings.flash,
            auto_focus,
            jpeg_orientation: jpeg_orientation(
                self.characteristics.sensor_orientation,
                settings.display_orientation,
                settings.facing,
            ),
        };

        let gate2 = gate.clone();
        let events2 = events.clone();
        let done: CaptureCallback = Box::new(move |result: CameraResult<Bytes>| {
            gate2.complete(epoch, result, &events2, backend)
        });
        self.device.capture(request, done).map_err(|e| {
            gate.cancel(epoch);
            CameraError::driver("capturing picture", e)
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.preview_size.take().is_some() {
            self.device.stop_preview();
        }
        self.device.close();
    }
}
