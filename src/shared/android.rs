// This is free and unencumbered software released into the public domain.

//! Camera NDK platform.
//!
//! Enumerates and opens devices through `ACameraManager`. Frame delivery and
//! still capture need an `AImageReader` session and are not wired up yet;
//! capture requests report [`CameraStatus::Unsupported`].

use crate::shared::{
    CameraCharacteristics, CameraDevice, CameraResult, CameraService, CameraStatus,
    CaptureCallback, CaptureRequest, Facing, Flash, FrameSink, HardwareLevel,
    ManualRotationSource, Platform, RotationSource, Size,
};
use alloc::ffi::CString;
use core::{ffi::CStr, mem::zeroed, ptr::null_mut};
use ndk_sys::{
    ACameraDevice, ACameraDevice_StateCallbacks, ACameraDevice_close, ACameraManager,
    ACameraManager_create, ACameraManager_delete, ACameraManager_deleteCameraIdList,
    ACameraManager_getCameraCharacteristics, ACameraManager_getCameraIdList,
    ACameraManager_openCamera, ACameraMetadata, ACameraMetadata_const_entry, ACameraMetadata_free,
    ACameraMetadata_getConstEntry, acamera_metadata_tag, android_get_device_api_level,
    camera_status_t,
};
use scopeguard::defer;
use std::sync::Arc;

#[link(name = "camera2ndk")]
unsafe extern "C" {}

const LENS_FACING_FRONT: u8 = 0;
const HARDWARE_LEVEL_LIMITED: u8 = 0;
const HARDWARE_LEVEL_FULL: u8 = 1;
const HARDWARE_LEVEL_3: u8 = 3;
const AF_MODE_CONTINUOUS_PICTURE: u8 = 4;
const FORMAT_YUV_420_888: i32 = 0x23;
const FORMAT_JPEG: i32 = 0x100;
const STREAM_CONFIGURATION_OUTPUT: i32 = 0;

impl From<camera_status_t> for CameraStatus {
    fn from(input: camera_status_t) -> Self {
        match input {
            camera_status_t::ACAMERA_ERROR_CAMERA_IN_USE => CameraStatus::InUse,
            camera_status_t::ACAMERA_ERROR_CAMERA_DISCONNECTED => CameraStatus::Disconnected,
            camera_status_t::ACAMERA_ERROR_CAMERA_SERVICE => CameraStatus::ServiceFailure,
            camera_status_t::ACAMERA_ERROR_CAMERA_DEVICE => CameraStatus::DeviceFailure,
            camera_status_t::ACAMERA_ERROR_PERMISSION_DENIED => CameraStatus::PermissionDenied,
            other => CameraStatus::Code(other.0),
        }
    }
}

fn check(status: camera_status_t) -> CameraResult {
    if status == camera_status_t::ACAMERA_OK {
        Ok(())
    } else {
        Err(status.into())
    }
}

pub struct AndroidPlatform {
    api_level: u32,
    service: Arc<AndroidCameraService>,
    rotation: Arc<ManualRotationSource>,
}

impl AndroidPlatform {
    pub fn new() -> Self {
        Self {
            api_level: unsafe { android_get_device_api_level() } as u32,
            service: Arc::new(AndroidCameraService::new()),
            rotation: Arc::new(ManualRotationSource::new()),
        }
    }

    /// The host forwards display rotation changes here.
    pub fn rotation(&self) -> &Arc<ManualRotationSource> {
        &self.rotation
    }
}

impl Default for AndroidPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for AndroidPlatform {
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

pub struct AndroidCameraService {
    handle: *mut ACameraManager,
}

// The NDK camera manager is thread-safe.
unsafe impl Send for AndroidCameraService {}
unsafe impl Sync for AndroidCameraService {}

impl Drop for AndroidCameraService {
    fn drop(&mut self) {
        unsafe {
            ACameraManager_delete(self.handle);
        }
        self.handle = null_mut();
    }
}

impl AndroidCameraService {
    pub fn new() -> Self {
        Self {
            handle: unsafe { ACameraManager_create() },
        }
    }
}

impl Default for AndroidCameraService {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraService for AndroidCameraService {
    fn camera_ids(&self) -> CameraResult<Vec<String>> {
        let mut list_ptr = null_mut();
        check(unsafe { ACameraManager_getCameraIdList(self.handle, &mut list_ptr) })?;
        defer! {
            unsafe { ACameraManager_deleteCameraIdList(list_ptr); }
        }

        let list = unsafe { &*list_ptr };
        if list.numCameras < 1 {
            return Ok(Vec::new());
        }
        let ids = unsafe { core::slice::from_raw_parts(list.cameraIds, list.numCameras as usize) };
        Ok(ids
            .iter()
            .map(|p| unsafe { CStr::from_ptr(*p) }.to_string_lossy().into_owned())
            .collect())
    }

    fn characteristics(&self, id: &str) -> CameraResult<CameraCharacteristics> {
        let id = CString::new(id).map_err(|_| CameraStatus::UnknownCamera)?;
        let mut metadata: *mut ACameraMetadata = null_mut();
        check(unsafe {
            ACameraManager_getCameraCharacteristics(self.handle, id.as_ptr(), &mut metadata)
        })?;
        defer! {
            unsafe { ACameraMetadata_free(metadata); }
        }
        let metadata = Metadata(metadata);

        let facing = match metadata.u8s(acamera_metadata_tag::ACAMERA_LENS_FACING).first() {
            Some(&LENS_FACING_FRONT) => Facing::Front,
            _ => Facing::Back,
        };
        let hardware_level = match metadata
            .u8s(acamera_metadata_tag::ACAMERA_INFO_SUPPORTED_HARDWARE_LEVEL)
            .first()
        {
            Some(&HARDWARE_LEVEL_LIMITED) => HardwareLevel::Limited,
            Some(&HARDWARE_LEVEL_FULL) => HardwareLevel::Full,
            Some(&HARDWARE_LEVEL_3) => HardwareLevel::Level3,
            _ => HardwareLevel::Legacy,
        };
        let sensor_orientation = metadata
            .i32s(acamera_metadata_tag::ACAMERA_SENSOR_ORIENTATION)
            .first()
            .map(|o| *o as u32)
            .unwrap_or(0);

        let configs =
            metadata.i32s(acamera_metadata_tag::ACAMERA_SCALER_AVAILABLE_STREAM_CONFIGURATIONS);
        let sizes_of = |format: i32| -> Vec<Size> {
            configs
                .chunks_exact(4)
                .filter(|c| c[0] == format && c[3] == STREAM_CONFIGURATION_OUTPUT)
                .map(|c| Size::new(c[1] as u32, c[2] as u32))
                .collect()
        };

        let flash_available = metadata
            .u8s(acamera_metadata_tag::ACAMERA_FLASH_INFO_AVAILABLE)
            .first()
            .is_some_and(|v| *v != 0);
        let auto_focus = metadata
            .u8s(acamera_metadata_tag::ACAMERA_CONTROL_AF_AVAILABLE_MODES)
            .contains(&AF_MODE_CONTINUOUS_PICTURE);

        Ok(CameraCharacteristics {
            facing,
            hardware_level,
            sensor_orientation,
            preview_sizes: sizes_of(FORMAT_YUV_420_888),
            picture_sizes: sizes_of(FORMAT_JPEG),
            high_resolution_picture_sizes: Vec::new(),
            flash_modes: if flash_available {
                Flash::ALL.to_vec()
            } else {
                vec![Flash::Off]
            },
            auto_focus,
        })
    }

    fn open(&self, id: &str) -> CameraResult<Box<dyn CameraDevice>> {
        let c_id = CString::new(id).map_err(|_| CameraStatus::UnknownCamera)?;
        let mut device = Box::new(AndroidCameraDevice {
            id: id.to_string(),
            handle: null_mut(),
            state_callbacks: unsafe { zeroed() },
        });
        check(unsafe {
            ACameraManager_openCamera(
                self.handle,
                c_id.as_ptr(),
                &mut device.state_callbacks,
                &mut device.handle,
            )
        })?;
        Ok(device)
    }
}

/// Borrowed view of camera characteristics.
struct Metadata(*mut ACameraMetadata);

impl Metadata {
    fn entry(&self, tag: acamera_metadata_tag) -> Option<ACameraMetadata_const_entry> {
        let mut entry: ACameraMetadata_const_entry = unsafe { zeroed() };
        let status = unsafe { ACameraMetadata_getConstEntry(self.0, tag.0, &mut entry) };
        (status == camera_status_t::ACAMERA_OK && entry.count > 0).then_some(entry)
    }

    fn u8s(&self, tag: acamera_metadata_tag) -> &[u8] {
        match self.entry(tag) {
            Some(e) => unsafe { core::slice::from_raw_parts(e.data.u8_, e.count as usize) },
            None => &[],
        }
    }

    fn i32s(&self, tag: acamera_metadata_tag) -> &[i32] {
        match self.entry(tag) {
            Some(e) => unsafe { core::slice::from_raw_parts(e.data.i32_, e.count as usize) },
            None => &[],
        }
    }
}

pub struct AndroidCameraDevice {
    id: String,
    handle: *mut ACameraDevice,
    // Must outlive the device handle.
    state_callbacks: ACameraDevice_StateCallbacks,
}

unsafe impl Send for AndroidCameraDevice {}

impl CameraDevice for AndroidCameraDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn start_preview(&mut self, _size: Size, _sink: FrameSink) -> CameraResult {
        // TODO: feed `_sink` from an AImageReader session for YUV_420_888 frames.
        Ok(())
    }

    fn stop_preview(&mut self) {}

    fn set_display_orientation(&mut self, _degrees: u32) {}

    fn capture(&mut self, _request: CaptureRequest, _done: CaptureCallback) -> CameraResult {
        Err(CameraStatus::Unsupported)
    }

    fn close(&mut self) {
        if self.handle.is_null() {
            return;
        }
        unsafe {
            ACameraDevice_close(self.handle);
        }
        self.handle = null_mut();
    }
}

impl Drop for AndroidCameraDevice {
    fn drop(&mut self) {
        self.close();
    }
}
