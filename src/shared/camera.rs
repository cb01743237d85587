// This is free and unencumbered software released into the public domain.

use crate::shared::{
    ApiTier, AspectRatio, Callback, CameraBackend, CameraConfig, CameraDriver, CameraError,
    Dispatcher, DriverContext, DriverSettings, Facing, Flash, OrientationMonitor, Platform,
    open_driver,
};
use alloc::collections::BTreeSet;
use std::{
    any::Any,
    sync::{
        Arc, Mutex, MutexGuard, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

/// A headless camera.
///
/// The backend is chosen from the platform's API level when the camera is
/// created. If it cannot open the device, [`Camera::start`] replaces it with
/// a Camera1 backend and tries once more.
///
/// `Camera` is a cheap handle; clones refer to the same camera.
#[derive(Clone)]
pub struct Camera {
    inner: Arc<CameraInner>,
}

pub(crate) struct CameraInner {
    context: DriverContext,
    driver: Mutex<Box<dyn CameraDriver>>,
    dispatcher: Dispatcher,
    orientation: Mutex<OrientationMonitor>,
    adjust_view_bounds: AtomicBool,
    diagnostics: bool,
}

impl core::fmt::Debug for Camera {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Camera")
            .field("backend", &self.backend())
            .field("opened", &self.is_camera_opened())
            .finish()
    }
}

impl Camera {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self::with_config(platform, CameraConfig::default())
    }

    pub fn with_config(platform: Arc<dyn Platform>, config: CameraConfig) -> Self {
        let tier = ApiTier::from_api_level(platform.api_level());
        let inner = Arc::new_cyclic(|weak: &Weak<CameraInner>| {
            let dispatcher = Dispatcher::new(config.buffer_frames, weak.clone());
            let context = DriverContext {
                service: platform.camera_service(),
                preview: platform.create_preview(),
                events: dispatcher.sender(),
            };
            let driver = open_driver(
                tier.backend(),
                context.clone(),
                DriverSettings::from(&config),
            );

            #[cfg(feature = "tracing")]
            asimov_module::tracing::debug!(
                target: "asimov_cameraview_module",
                api_level = platform.api_level(),
                %tier,
                backend = %driver.backend(),
                "camera backend selected"
            );

            let owner = weak.clone();
            let orientation = OrientationMonitor::new(platform.rotation_source(), move |degrees| {
                if let Some(inner) = owner.upgrade() {
                    inner.driver().set_display_orientation(degrees);
                }
            });

            CameraInner {
                context,
                driver: Mutex::new(driver),
                dispatcher,
                orientation: Mutex::new(orientation),
                adjust_view_bounds: AtomicBool::new(false),
                diagnostics: config.diagnostics,
            }
        });
        Self { inner }
    }

    pub(crate) fn upgrade(inner: &Weak<CameraInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub fn backend(&self) -> CameraBackend {
        self.inner.driver().backend()
    }

    /// Name of the active driver, e.g. `camera2-api23`.
    pub fn driver_name(&self) -> String {
        self.inner.driver().name().into_owned()
    }

    /// Opens the camera and starts the preview.
    ///
    /// Falls back to Camera1 once if the current backend fails to open. The
    /// returned error is the last failure; the camera state itself is
    /// reported by [`Camera::is_camera_opened`].
    pub fn start(&self) -> Result<(), CameraError> {
        let result = {
            let mut driver = self.inner.driver();
            match driver.start() {
                Ok(()) => Ok(()),
                Err(_err) => {
                    let _from = driver.name().into_owned();
                    let settings = driver.settings().clone();
                    // Release the device before the replacement can open it.
                    driver.stop();
                    *driver = open_driver(
                        CameraBackend::Camera1,
                        self.inner.context.clone(),
                        settings,
                    );

                    #[cfg(feature = "tracing")]
                    asimov_module::tracing::warn!(
                        target: "asimov_cameraview_module",
                        from = %_from,
                        error = %_err,
                        "camera backend failed to open; falling back to camera1"
                    );
                    driver.start()
                },
            }
        };

        if self.is_camera_opened() {
            self.inner.orientation().enable();
        }
        if self.inner.diagnostics {
            self.report("started");
        }
        result
    }

    /// Stops the preview and closes the camera. Safe to call repeatedly.
    pub fn stop(&self) {
        self.inner.driver().stop();
        self.inner.orientation().disable();
        if self.inner.diagnostics {
            self.report("stopped");
        }
    }

    pub fn is_camera_opened(&self) -> bool {
        self.inner.driver().is_camera_opened()
    }

    pub fn add_callback(&self, callback: Arc<dyn Callback>) {
        self.inner.dispatcher.add_callback(callback);
    }

    pub fn remove_callback(&self, callback: &Arc<dyn Callback>) {
        self.inner.dispatcher.remove_callback(callback);
    }

    pub fn callback_count(&self) -> usize {
        self.inner.dispatcher.callback_count()
    }

    pub fn set_adjust_view_bounds(&self, adjust: bool) {
        self.inner.adjust_view_bounds.store(adjust, Ordering::Relaxed);
    }

    pub fn adjust_view_bounds(&self) -> bool {
        self.inner.adjust_view_bounds.load(Ordering::Relaxed)
    }

    /// Chooses the camera by the direction it faces, reopening it if needed.
    pub fn set_facing(&self, facing: Facing) {
        self.inner.driver().set_facing(facing);
    }

    pub fn facing(&self) -> Facing {
        self.inner.driver().facing()
    }

    pub fn supported_aspect_ratios(&self) -> BTreeSet<AspectRatio> {
        self.inner.driver().supported_aspect_ratios()
    }

    /// Ratios the open camera does not support are ignored.
    pub fn set_aspect_ratio(&self, ratio: AspectRatio) {
        if !self.inner.driver().set_aspect_ratio(ratio) {
            #[cfg(feature = "tracing")]
            asimov_module::tracing::debug!(
                target: "asimov_cameraview_module",
                %ratio,
                "aspect ratio not applied"
            );
        }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.inner.driver().aspect_ratio()
    }

    /// Requests continuous auto-focus. Ignored by cameras without it.
    pub fn set_auto_focus(&self, enabled: bool) {
        self.inner.driver().set_auto_focus(enabled);
    }

    pub fn auto_focus(&self) -> bool {
        self.inner.driver().auto_focus()
    }

    pub fn set_flash(&self, flash: Flash) {
        self.inner.driver().set_flash(flash);
    }

    pub fn flash(&self) -> Flash {
        self.inner.driver().flash()
    }

    /// Takes a picture; the JPEG arrives through [`Callback::on_picture_taken`].
    pub fn take_picture(&self) -> Result<(), CameraError> {
        self.inner.driver().take_picture()
    }

    /// Runs `f` against the active driver if it is a `T`.
    pub fn with_driver<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let driver = self.inner.driver();
        let any: &dyn Any = driver.as_any();
        any.downcast_ref::<T>().map(f)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.inner.context.events.dropped_frames()
    }

    fn report(&self, _phase: &str) {
        #[cfg(feature = "tracing")]
        {
            let driver = self.inner.driver();
            asimov_module::tracing::info!(
                target: "asimov_cameraview_module",
                phase = _phase,
                backend = %driver.backend(),
                opened = driver.is_camera_opened(),
                facing = %driver.facing(),
                aspect_ratio = %driver.aspect_ratio(),
                flash = %driver.flash(),
                auto_focus = driver.auto_focus(),
                dropped_frames = self.dropped_frames(),
                "camera diagnostics"
            );
        }
    }
}

impl CameraInner {
    fn driver(&self) -> MutexGuard<'_, Box<dyn CameraDriver>> {
        self.driver.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn orientation(&self) -> MutexGuard<'_, OrientationMonitor> {
        self.orientation.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for CameraInner {
    fn drop(&mut self) {
        self.orientation().disable();
        self.driver().stop();
        self.dispatcher.stop();
    }
}
