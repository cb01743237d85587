// This is free and unencumbered software released into the public domain.

//! Integration tests for the camera facade on the simulated platform.

use asimov_cameraview_module::shared::{
    AspectRatio, Callback, Camera, CameraBackend, CameraCharacteristics, CameraConfig,
    CameraDriver, CameraError, Facing, Flash, HardwareLevel, Rotation, SimulatedConfig,
    SimulatedPlatform, Size,
    drivers::{camera1::Camera1CameraDriver, camera2::Camera2CameraDriver},
};
use bytes::Bytes;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc::{Receiver, Sender, channel},
    },
    time::{Duration, Instant},
};

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

fn small_camera(facing: Facing, hardware_level: HardwareLevel) -> CameraCharacteristics {
    CameraCharacteristics {
        facing,
        hardware_level,
        sensor_orientation: if facing == Facing::Front { 270 } else { 90 },
        preview_sizes: vec![Size::new(8, 6), Size::new(16, 12), Size::new(16, 9)],
        picture_sizes: vec![Size::new(16, 12), Size::new(32, 24), Size::new(32, 18)],
        high_resolution_picture_sizes: vec![Size::new(64, 48)],
        flash_modes: match facing {
            Facing::Back => Flash::ALL.to_vec(),
            Facing::Front => vec![Flash::Off],
        },
        auto_focus: facing == Facing::Back,
    }
}

fn simulated(api_level: u32) -> SimulatedConfig {
    SimulatedConfig::new(api_level)
        .with_cameras(vec![
            small_camera(Facing::Back, HardwareLevel::Full),
            small_camera(Facing::Front, HardwareLevel::Limited),
        ])
        .with_frame_interval(Duration::from_millis(5))
}

fn platform(config: SimulatedConfig) -> Arc<SimulatedPlatform> {
    Arc::new(SimulatedPlatform::new(config))
}

#[derive(Debug)]
enum Seen {
    Opened,
    Closed,
    Picture(Bytes),
    Nv21(usize),
    Planar(usize, u32, u32),
}

/// Forwards every event it sees to a channel.
struct Recorder {
    tx: Sender<Seen>,
    frames: bool,
}

impl Recorder {
    fn new(frames: bool) -> (Arc<dyn Callback>, Receiver<Seen>) {
        let (tx, rx) = channel();
        (Arc::new(Self { tx, frames }), rx)
    }
}

impl Callback for Recorder {
    fn on_camera_opened(&self, _camera: &Camera) {
        let _ = self.tx.send(Seen::Opened);
    }

    fn on_camera_closed(&self, _camera: &Camera) {
        let _ = self.tx.send(Seen::Closed);
    }

    fn on_picture_taken(&self, _camera: &Camera, data: Bytes) {
        let _ = self.tx.send(Seen::Picture(data));
    }

    fn on_preview_frame(&self, data: &[u8]) {
        if self.frames {
            let _ = self.tx.send(Seen::Nv21(data.len()));
        }
    }

    fn on_preview_frame_planar(
        &self,
        planes: &[Bytes],
        _strides: &[usize],
        width: u32,
        height: u32,
    ) {
        if self.frames {
            let _ = self.tx.send(Seen::Planar(planes.len(), width, height));
        }
    }
}

struct Panicker;

impl Callback for Panicker {
    fn on_camera_opened(&self, _camera: &Camera) {
        panic!("listener failure");
    }
}

fn wait_for(rx: &Receiver<Seen>, timeout: Duration, pred: impl Fn(&Seen) -> bool) -> Option<Seen> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.checked_duration_since(Instant::now())?;
        match rx.recv_timeout(left) {
            Ok(seen) if pred(&seen) => return Some(seen),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

fn count_for(rx: &Receiver<Seen>, window: Duration, pred: impl Fn(&Seen) -> bool) -> usize {
    let deadline = Instant::now() + window;
    let mut n = 0;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(seen) if pred(&seen) => n += 1,
            Ok(_) => {},
            Err(_) => break,
        }
    }
    n
}

fn is_opened(seen: &Seen) -> bool {
    matches!(seen, Seen::Opened)
}

fn is_closed(seen: &Seen) -> bool {
    matches!(seen, Seen::Closed)
}

fn is_picture(seen: &Seen) -> bool {
    matches!(seen, Seen::Picture(_))
}

#[test]
fn backend_follows_api_level() {
    for (api_level, backend) in [
        (14, CameraBackend::Camera1),
        (20, CameraBackend::Camera1),
        (21, CameraBackend::Camera2),
        (22, CameraBackend::Camera2),
        (23, CameraBackend::Camera2Api23),
        (30, CameraBackend::Camera2Api23),
    ] {
        let camera = Camera::new(platform(simulated(api_level)));
        assert_eq!(camera.backend(), backend, "api level {api_level}");
        assert_eq!(camera.driver_name(), backend.to_string());
        assert!(!camera.is_camera_opened());
    }
}

#[test]
fn low_tier_opens_without_fallback() {
    let platform = platform(simulated(14));
    let camera = Camera::new(platform.clone());
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);

    camera.start().unwrap();

    assert!(camera.is_camera_opened());
    assert_eq!(camera.backend(), CameraBackend::Camera1);
    assert_eq!(platform.service().open_attempts(), 1);
    assert!(wait_for(&rx, TIMEOUT, is_opened).is_some());
}

#[test]
fn legacy_hardware_falls_back_to_camera1() {
    let platform = platform(simulated(23).with_legacy_hardware());
    let camera = Camera::new(platform.clone());
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);

    assert_eq!(camera.backend(), CameraBackend::Camera2Api23);
    camera.start().unwrap();

    assert!(camera.is_camera_opened());
    assert_eq!(camera.backend(), CameraBackend::Camera1);
    assert_eq!(platform.service().open_devices(), 1);
    assert!(wait_for(&rx, TIMEOUT, is_opened).is_some());
    // The refused backend never opened, so it never reports closed.
    assert_eq!(count_for(&rx, QUIET, is_closed), 0);
}

#[test]
fn failed_open_retries_exactly_once() {
    let platform = platform(simulated(23).with_failing_open(true));
    let camera = Camera::new(platform.clone());

    assert!(camera.start().is_err());

    assert!(!camera.is_camera_opened());
    assert_eq!(camera.backend(), CameraBackend::Camera1);
    assert_eq!(platform.service().open_attempts(), 2);
    assert_eq!(platform.service().open_devices(), 0);
}

#[test]
fn camera_can_start_after_a_failed_attempt() {
    let platform = platform(simulated(21).with_failing_open(true));
    let camera = Camera::new(platform.clone());
    assert!(camera.start().is_err());

    platform.service().set_fail_open(false);
    camera.start().unwrap();
    assert!(camera.is_camera_opened());
    assert_eq!(camera.backend(), CameraBackend::Camera1);
}

#[test]
fn fallback_keeps_user_settings() {
    let config = CameraConfig::new(Facing::Front)
        .with_flash(Flash::Off)
        .with_aspect_ratio(AspectRatio::of(16, 9));
    let camera = Camera::with_config(platform(simulated(22).with_legacy_hardware()), config);

    camera.start().unwrap();

    assert_eq!(camera.backend(), CameraBackend::Camera1);
    assert_eq!(camera.facing(), Facing::Front);
    assert_eq!(camera.aspect_ratio(), AspectRatio::of(16, 9));
    assert_eq!(camera.flash(), Flash::Off);
}

#[test]
fn stop_is_idempotent() {
    let platform = platform(simulated(23));
    let camera = Camera::new(platform.clone());
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);

    camera.stop();
    camera.start().unwrap();
    assert!(wait_for(&rx, TIMEOUT, is_opened).is_some());

    camera.stop();
    camera.stop();

    assert!(!camera.is_camera_opened());
    assert_eq!(platform.service().open_devices(), 0);
    assert_eq!(count_for(&rx, QUIET, is_closed), 1);
}

#[test]
fn callbacks_can_be_added_and_removed() {
    let camera = Camera::new(platform(simulated(23)));
    let (kept, kept_rx) = Recorder::new(false);
    let (removed, removed_rx) = Recorder::new(false);

    camera.add_callback(kept.clone());
    camera.add_callback(removed.clone());
    assert_eq!(camera.callback_count(), 2);

    camera.remove_callback(&removed);
    assert_eq!(camera.callback_count(), 1);
    camera.remove_callback(&removed);
    assert_eq!(camera.callback_count(), 1);

    camera.start().unwrap();
    assert!(wait_for(&kept_rx, TIMEOUT, is_opened).is_some());
    assert_eq!(count_for(&removed_rx, QUIET, is_opened), 0);
}

/// Reports its tag on every opened event.
struct Tagged {
    tag: &'static str,
    tx: Sender<&'static str>,
}

impl Callback for Tagged {
    fn on_camera_opened(&self, _camera: &Camera) {
        let _ = self.tx.send(self.tag);
    }
}

fn collect_tags(rx: &Receiver<&'static str>, n: usize) -> Vec<&'static str> {
    let mut tags = Vec::new();
    while tags.len() < n {
        match rx.recv_timeout(TIMEOUT) {
            Ok(tag) => tags.push(tag),
            Err(_) => break,
        }
    }
    tags
}

#[test]
fn listeners_keep_registration_order_and_duplicates() {
    let camera = Camera::new(platform(simulated(23)));
    let (tx, rx) = channel();
    let a: Arc<dyn Callback> = Arc::new(Tagged {
        tag: "a",
        tx: tx.clone(),
    });
    let b: Arc<dyn Callback> = Arc::new(Tagged { tag: "b", tx });

    camera.add_callback(a.clone());
    camera.add_callback(b.clone());
    camera.add_callback(a.clone());
    assert_eq!(camera.callback_count(), 3);

    camera.start().unwrap();
    assert_eq!(collect_tags(&rx, 3), ["a", "b", "a"]);

    // Only the first registration of `a` goes away.
    camera.remove_callback(&a);
    assert_eq!(camera.callback_count(), 2);

    camera.stop();
    camera.start().unwrap();
    assert_eq!(collect_tags(&rx, 2), ["b", "a"]);
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn panicking_listener_does_not_starve_the_others() {
    let camera = Camera::new(platform(simulated(23)));
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(Arc::new(Panicker));
    camera.add_callback(recorder);

    camera.start().unwrap();
    assert!(wait_for(&rx, TIMEOUT, is_opened).is_some());

    camera.stop();
    assert!(wait_for(&rx, TIMEOUT, is_closed).is_some());
}

#[test]
fn unsupported_aspect_ratio_is_ignored() {
    let camera = Camera::new(platform(simulated(23)));
    camera.start().unwrap();

    let supported = camera.supported_aspect_ratios();
    assert!(supported.contains(&AspectRatio::of(4, 3)));
    assert!(supported.contains(&AspectRatio::of(16, 9)));
    assert_eq!(camera.aspect_ratio(), AspectRatio::of(4, 3));

    camera.set_aspect_ratio(AspectRatio::of(1, 1));
    assert_eq!(camera.aspect_ratio(), AspectRatio::of(4, 3));

    camera.set_aspect_ratio(AspectRatio::of(16, 9));
    assert_eq!(camera.aspect_ratio(), AspectRatio::of(16, 9));
}

#[test]
fn aspect_ratio_set_while_closed_applies_on_start() {
    let camera = Camera::new(platform(simulated(23)));
    assert!(camera.supported_aspect_ratios().is_empty());

    camera.set_aspect_ratio(AspectRatio::of(16, 9));
    assert_eq!(camera.aspect_ratio(), AspectRatio::of(16, 9));

    camera.start().unwrap();
    assert_eq!(camera.aspect_ratio(), AspectRatio::of(16, 9));
}

fn square_preview_camera() -> CameraCharacteristics {
    let mut camera = small_camera(Facing::Back, HardwareLevel::Full);
    // 1:1 preview without any 1:1 still size.
    camera.preview_sizes.push(Size::new(12, 12));
    camera
}

#[test]
fn camera2_hides_ratios_without_picture_sizes() {
    let square = AspectRatio::of(1, 1);
    let config = |api_level| {
        simulated(api_level).with_cameras(vec![square_preview_camera()])
    };

    let camera2 = Camera::new(platform(config(21)));
    camera2.start().unwrap();
    assert_eq!(camera2.backend(), CameraBackend::Camera2);
    let ratios = camera2.supported_aspect_ratios();
    assert!(!ratios.contains(&square));
    assert!(ratios.contains(&AspectRatio::of(4, 3)));

    let camera1 = Camera::new(platform(config(14)));
    camera1.start().unwrap();
    assert_eq!(camera1.backend(), CameraBackend::Camera1);
    assert!(camera1.supported_aspect_ratios().contains(&square));
}

#[test]
fn camera2_opens_the_first_camera_when_no_facing_matches() {
    let back_only = vec![small_camera(Facing::Back, HardwareLevel::Full)];
    let config = simulated(21).with_cameras(back_only);
    let platform = platform(config);
    let camera = Camera::with_config(platform.clone(), CameraConfig::new(Facing::Front));

    camera.start().unwrap();

    assert!(camera.is_camera_opened());
    assert_eq!(camera.backend(), CameraBackend::Camera2);
    assert_eq!(camera.facing(), Facing::Back);
    assert_eq!(platform.service().open_devices(), 1);
}

#[test]
fn take_picture_requires_an_open_camera() {
    let camera = Camera::new(platform(simulated(23)));
    assert!(matches!(camera.take_picture(), Err(CameraError::NotOpened)));
}

#[test]
fn camera1_picture_is_an_upright_jpeg() {
    let camera = Camera::new(platform(simulated(14)));
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);
    camera.start().unwrap();

    camera.take_picture().unwrap();

    let Some(Seen::Picture(data)) = wait_for(&rx, TIMEOUT, is_picture) else {
        panic!("no picture delivered");
    };
    let image = image::load_from_memory(&data).unwrap();
    // 32x24 sensor image rotated by the 90 degree sensor orientation.
    assert_eq!((image.width(), image.height()), (24, 32));
}

#[test]
fn api23_pictures_use_high_resolution_sizes() {
    let camera = Camera::new(platform(simulated(23)));
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);
    camera.start().unwrap();

    let largest = camera.with_driver(|d: &Camera2CameraDriver| {
        d.picture_sizes().largest(AspectRatio::of(4, 3))
    });
    assert_eq!(largest, Some(Some(Size::new(64, 48))));

    camera.take_picture().unwrap();
    let Some(Seen::Picture(data)) = wait_for(&rx, TIMEOUT, is_picture) else {
        panic!("no picture delivered");
    };
    let image = image::load_from_memory(&data).unwrap();
    assert_eq!((image.width(), image.height()), (48, 64));
}

#[test]
fn picture_completing_after_stop_is_discarded() {
    let config = simulated(23).with_capture_delay(Duration::from_millis(200));
    let camera = Camera::new(platform(config));
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);
    camera.start().unwrap();

    camera.take_picture().unwrap();
    camera.stop();

    assert!(wait_for(&rx, TIMEOUT, is_closed).is_some());
    assert_eq!(count_for(&rx, Duration::from_millis(600), is_picture), 0);
}

#[test]
fn second_picture_request_while_busy_is_ignored() {
    let config = simulated(23).with_capture_delay(Duration::from_millis(100));
    let camera = Camera::new(platform(config));
    let (recorder, rx) = Recorder::new(false);
    camera.add_callback(recorder);
    camera.start().unwrap();

    camera.take_picture().unwrap();
    camera.take_picture().unwrap();

    assert_eq!(count_for(&rx, Duration::from_millis(800), is_picture), 1);
}

#[test]
fn orientation_monitor_follows_the_camera_lifecycle() {
    let platform = platform(simulated(23));
    let camera = Camera::new(platform.clone());
    let rotation = platform.rotation();
    assert_eq!(rotation.listener_count(), 0);

    camera.start().unwrap();
    assert_eq!(rotation.listener_count(), 1);

    rotation.rotate(Rotation::Rotation90);
    let degrees = camera.with_driver(|d: &Camera2CameraDriver| d.settings().display_orientation);
    assert_eq!(degrees, Some(90));

    camera.stop();
    assert_eq!(rotation.listener_count(), 0);
}

#[test]
fn orientation_monitor_stays_off_when_the_camera_fails_to_open() {
    let platform = platform(simulated(23).with_failing_open(true));
    let camera = Camera::new(platform.clone());

    assert!(camera.start().is_err());

    assert!(!camera.is_camera_opened());
    assert_eq!(platform.rotation().listener_count(), 0);
}

#[test]
fn camera1_preview_frames_are_nv21() {
    let camera = Camera::new(platform(simulated(14)));
    let (recorder, rx) = Recorder::new(true);
    camera.add_callback(recorder);
    camera.start().unwrap();

    let frame = wait_for(&rx, TIMEOUT, |s| matches!(s, Seen::Nv21(_)));
    // Largest 4:3 preview is 16x12: 192 luma bytes, 96 interleaved chroma bytes.
    assert!(matches!(frame, Some(Seen::Nv21(288))), "{frame:?}");
}

#[test]
fn camera2_preview_frames_are_planar() {
    let camera = Camera::new(platform(simulated(21)));
    let (recorder, rx) = Recorder::new(true);
    camera.add_callback(recorder);
    camera.start().unwrap();

    let frame = wait_for(&rx, TIMEOUT, |s| matches!(s, Seen::Planar(..)));
    assert!(matches!(frame, Some(Seen::Planar(3, 16, 12))), "{frame:?}");
}

/// Sleeps on every frame so the dispatcher falls behind.
struct SlowListener {
    frames: AtomicUsize,
    tx: Sender<Seen>,
}

impl Callback for SlowListener {
    fn on_camera_closed(&self, _camera: &Camera) {
        let _ = self.tx.send(Seen::Closed);
    }

    fn on_preview_frame(&self, _data: &[u8]) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn slow_listeners_drop_frames_but_not_lifecycle_events() {
    let config = simulated(14).with_frame_interval(Duration::from_millis(1));
    let camera = Camera::with_config(
        platform(config),
        CameraConfig::default().with_buffer_frames(1),
    );
    let (tx, rx) = channel();
    let listener = Arc::new(SlowListener {
        frames: AtomicUsize::new(0),
        tx,
    });
    camera.add_callback(listener.clone());
    camera.start().unwrap();

    std::thread::sleep(Duration::from_millis(300));
    camera.stop();

    assert!(wait_for(&rx, TIMEOUT, is_closed).is_some());
    assert!(camera.dropped_frames() > 0);
    assert!(listener.frames.load(Ordering::Relaxed) > 0);
}

#[test]
fn facing_change_reopens_the_camera() {
    let platform = platform(simulated(23));
    let camera = Camera::new(platform.clone());
    camera.start().unwrap();

    camera.set_facing(Facing::Front);

    assert!(camera.is_camera_opened());
    assert_eq!(camera.facing(), Facing::Front);
    assert_eq!(platform.service().open_devices(), 1);
}

#[test]
fn camera1_turns_off_unsupported_flash() {
    let config = CameraConfig::new(Facing::Front).with_flash(Flash::Auto);
    let camera = Camera::with_config(platform(simulated(14)), config);
    camera.start().unwrap();
    assert_eq!(camera.flash(), Flash::Off);

    camera.set_facing(Facing::Back);
    camera.set_flash(Flash::Torch);
    assert_eq!(camera.flash(), Flash::Torch);
    let backend = camera.with_driver(|d: &Camera1CameraDriver| d.backend());
    assert_eq!(backend, Some(CameraBackend::Camera1));
}

#[test]
fn auto_focus_reflects_the_device() {
    let config = CameraConfig::new(Facing::Front).with_auto_focus(true);
    let camera = Camera::with_config(platform(simulated(23)), config);
    assert!(camera.auto_focus());

    camera.start().unwrap();
    assert!(!camera.auto_focus());
}

#[test]
fn dropping_the_last_handle_releases_the_device() {
    let platform = platform(simulated(23));
    let camera = Camera::new(platform.clone());
    let clone = camera.clone();
    camera.start().unwrap();
    assert_eq!(platform.service().open_devices(), 1);

    drop(camera);
    assert!(clone.is_camera_opened());
    drop(clone);

    let deadline = Instant::now() + TIMEOUT;
    while platform.service().open_devices() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(platform.service().open_devices(), 0);
}

#[test]
fn adjust_view_bounds_is_stored() {
    let camera = Camera::new(platform(simulated(23)));
    assert!(!camera.adjust_view_bounds());
    camera.set_adjust_view_bounds(true);
    assert!(camera.adjust_view_bounds());
}
