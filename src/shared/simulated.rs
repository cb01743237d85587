// This is free and unencumbered software released into the public domain.

//! An in-process camera platform.
//!
//! Devices stream a moving YUV test pattern and encode stills as JPEG. Used
//! on targets without a native camera platform, and by the tests.

use crate::shared::{
    CameraCharacteristics, CameraDevice, CameraResult, CameraService, CameraStatus,
    CaptureCallback, CaptureRequest, Facing, Flash, FrameSink, HardwareLevel,
    ManualRotationSource, Platform, RawFrame, RotationSource, Size,
};
use alloc::collections::BTreeSet;
use bytes::{Bytes, BytesMut};
use image::{ImageFormat, Rgb, RgbImage, imageops};
use std::{
    io::Cursor,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

#[derive(Clone, Debug)]
pub struct SimulatedConfig {
    pub api_level: u32,
    /// Camera `i` gets the id `"i"`.
    pub cameras: Vec<CameraCharacteristics>,
    pub frame_interval: Duration,
    /// Delay before a requested picture is delivered.
    pub capture_delay: Duration,
    /// Makes every `open` fail.
    pub fail_open: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            api_level: 23,
            cameras: vec![default_back_camera(), default_front_camera()],
            frame_interval: Duration::from_millis(33),
            capture_delay: Duration::ZERO,
            fail_open: false,
        }
    }
}

impl SimulatedConfig {
    pub fn new(api_level: u32) -> Self {
        Self {
            api_level,
            ..Default::default()
        }
    }

    pub fn with_cameras(mut self, cameras: Vec<CameraCharacteristics>) -> Self {
        self.cameras = cameras;
        self
    }

    /// Downgrades every camera to the legacy hardware level.
    pub fn with_legacy_hardware(mut self) -> Self {
        for camera in &mut self.cameras {
            camera.hardware_level = HardwareLevel::Legacy;
        }
        self
    }

    pub fn with_failing_open(mut self, fail: bool) -> Self {
        self.fail_open = fail;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }
}

pub fn default_back_camera() -> CameraCharacteristics {
    CameraCharacteristics {
        facing: Facing::Back,
        hardware_level: HardwareLevel::Full,
        sensor_orientation: 90,
        preview_sizes: vec![
            Size::new(320, 240),
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(1280, 960),
            Size::new(1920, 1080),
        ],
        picture_sizes: vec![
            Size::new(640, 480),
            Size::new(1280, 960),
            Size::new(1920, 1080),
        ],
        high_resolution_picture_sizes: vec![Size::new(2048, 1536)],
        flash_modes: Flash::ALL.to_vec(),
        auto_focus: true,
    }
}

pub fn default_front_camera() -> CameraCharacteristics {
    CameraCharacteristics {
        facing: Facing::Front,
        hardware_level: HardwareLevel::Limited,
        sensor_orientation: 270,
        preview_sizes: vec![Size::new(320, 240), Size::new(640, 480), Size::new(1280, 720)],
        picture_sizes: vec![Size::new(640, 480), Size::new(1280, 720)],
        high_resolution_picture_sizes: vec![],
        flash_modes: vec![Flash::Off],
        auto_focus: false,
    }
}

pub struct SimulatedPlatform {
    api_level: u32,
    service: Arc<SimulatedCameraService>,
    rotation: Arc<ManualRotationSource>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

impl SimulatedPlatform {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            api_level: config.api_level,
            service: Arc::new(SimulatedCameraService::new(config)),
            rotation: Arc::new(ManualRotationSource::new()),
        }
    }

    pub fn service(&self) -> &Arc<SimulatedCameraService> {
        &self.service
    }

    pub fn rotation(&self) -> &Arc<ManualRotationSource> {
        &self.rotation
    }
}

impl Platform for SimulatedPlatform {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn camera_service(&self) -> Arc<dyn CameraService> {
        self.service.clone()
    }

    fn rotation_source(&self) -> Arc<dyn RotationSource> {
        self.rotation.clone()
    }
}

pub struct SimulatedCameraService {
    cameras: Vec<(String, CameraCharacteristics)>,
    frame_interval: Duration,
    capture_delay: Duration,
    fail_open: AtomicBool,
    open_ids: Arc<Mutex<BTreeSet<String>>>,
    open_attempts: AtomicUsize,
}

impl SimulatedCameraService {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            cameras: config
                .cameras
                .into_iter()
                .enumerate()
                .map(|(i, c)| (i.to_string(), c))
                .collect(),
            frame_interval: config.frame_interval,
            capture_delay: config.capture_delay,
            fail_open: AtomicBool::new(config.fail_open),
            open_ids: Arc::new(Mutex::new(BTreeSet::new())),
            open_attempts: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Number of `open` calls so far, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Number of devices currently open.
    pub fn open_devices(&self) -> usize {
        self.open_ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

impl CameraService for SimulatedCameraService {
    fn camera_ids(&self) -> CameraResult<Vec<String>> {
        Ok(self.cameras.iter().map(|(id, _)| id.clone()).collect())
    }

    fn characteristics(&self, id: &str) -> CameraResult<CameraCharacteristics> {
        self.cameras
            .iter()
            .find(|(i, _)| i == id)
            .map(|(_, c)| c.clone())
            .ok_or(CameraStatus::UnknownCamera)
    }

    fn open(&self, id: &str) -> CameraResult<Box<dyn CameraDevice>> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.cameras.iter().any(|(i, _)| i == id) {
            return Err(CameraStatus::UnknownCamera);
        }
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(CameraStatus::DeviceFailure);
        }
        let mut open_ids = self.open_ids.lock().unwrap_or_else(|p| p.into_inner());
        if !open_ids.insert(id.to_string()) {
            return Err(CameraStatus::InUse);
        }
        Ok(Box::new(SimulatedDevice {
            id: id.to_string(),
            open_ids: Arc::clone(&self.open_ids),
            frame_interval: self.frame_interval,
            capture_delay: self.capture_delay,
            display_orientation: 0,
            preview: None,
            closed: false,
        }))
    }
}

struct PreviewThread {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

pub struct SimulatedDevice {
    id: String,
    open_ids: Arc<Mutex<BTreeSet<String>>>,
    frame_interval: Duration,
    capture_delay: Duration,
    display_orientation: u32,
    preview: Option<PreviewThread>,
    closed: bool,
}

impl SimulatedDevice {
    pub fn display_orientation(&self) -> u32 {
        self.display_orientation
    }
}

impl CameraDevice for SimulatedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn start_preview(&mut self, size: Size, sink: FrameSink) -> CameraResult {
        if self.closed {
            return Err(CameraStatus::Disconnected);
        }
        self.stop_preview();

        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = Arc::clone(&stop);
        let interval = self.frame_interval;
        let join = std::thread::Builder::new()
            .name(format!("simulated-camera-{}", self.id))
            .spawn(move || {
                let started = Instant::now();
                let mut n: u32 = 0;
                while !stop2.load(Ordering::Relaxed) {
                    let ts = started.elapsed().as_nanos() as u64;
                    sink(test_pattern_frame(size, n, ts));
                    n = n.wrapping_add(1);
                    std::thread::sleep(interval);
                }
            })
            .map_err(|_| CameraStatus::DeviceFailure)?;

        self.preview = Some(PreviewThread { stop, join });
        Ok(())
    }

    fn stop_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.stop.store(true, Ordering::Relaxed);
            let _ = preview.join.join();
        }
    }

    fn set_display_orientation(&mut self, degrees: u32) {
        self.display_orientation = degrees;
    }

    fn capture(&mut self, request: CaptureRequest, done: CaptureCallback) -> CameraResult {
        if self.closed {
            return Err(CameraStatus::Disconnected);
        }
        let delay = self.capture_delay;
        std::thread::Builder::new()
            .name(format!("simulated-capture-{}", self.id))
            .spawn(move || {
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                done(encode_picture(&request));
            })
            .map(|_| ())
            .map_err(|_| CameraStatus::DeviceFailure)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.stop_preview();
        self.closed = true;
        self.open_ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.id);
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Luma ramp scrolling one step per frame, neutral chroma.
fn test_pattern_frame(size: Size, n: u32, timestamp_ns: u64) -> RawFrame {
    let w = size.width as usize;
    let h = size.height as usize;
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);

    let mut y = BytesMut::with_capacity(w * h);
    for row in 0..h {
        for col in 0..w {
            y.extend_from_slice(&[((row + col + n as usize) & 0xff) as u8]);
        }
    }
    let chroma = Bytes::from(vec![128u8; cw * ch]);

    RawFrame {
        planes: [y.freeze(), chroma.clone(), chroma],
        strides: [w, cw, cw],
        width: size.width,
        height: size.height,
        timestamp_ns,
    }
}

fn encode_picture(request: &CaptureRequest) -> CameraResult<Bytes> {
    let Size { width, height } = request.size;
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            if request.flash == Flash::Off { 64 } else { 192 },
        ])
    });
    let image = match request.jpeg_orientation {
        90 => imageops::rotate90(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate270(&image),
        _ => image,
    };

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|_| CameraStatus::DeviceFailure)?;
    Ok(Bytes::from(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devices_are_exclusive() {
        let service = SimulatedCameraService::new(SimulatedConfig::default());
        let mut first = service.open("0").unwrap();
        assert_eq!(first.id(), "0");
        assert!(matches!(service.open("0"), Err(CameraStatus::InUse)));
        assert!(matches!(service.open("9"), Err(CameraStatus::UnknownCamera)));
        assert_eq!(service.open_devices(), 1);
        first.close();
        assert_eq!(service.open_devices(), 0);
        let _again = service.open("0").unwrap();
        assert_eq!(service.open_attempts(), 4);
    }

    #[test]
    fn failing_open() {
        let service =
            SimulatedCameraService::new(SimulatedConfig::default().with_failing_open(true));
        assert!(matches!(service.open("0"), Err(CameraStatus::DeviceFailure)));
        service.set_fail_open(false);
        assert!(service.open("0").is_ok());
    }

    #[test]
    fn pictures_are_rotated_jpegs() {
        let request = CaptureRequest {
            size: Size::new(64, 48),
            flash: Flash::Auto,
            auto_focus: true,
            jpeg_orientation: 90,
        };
        let data = encode_picture(&request).unwrap();
        let decoded = image::load_from_memory_with_format(&data, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 64));
    }

    #[test]
    fn test_pattern_has_three_planes() {
        let frame = test_pattern_frame(Size::new(5, 3), 1, 0);
        assert_eq!(frame.planes[0].len(), 15);
        assert_eq!(frame.planes[1].len(), 6);
        assert_eq!(frame.strides, [5, 3, 3]);
        assert_eq!(frame.to_nv21().len(), 15 + 12);
    }
}
