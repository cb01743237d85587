// This is free and unencumbered software released into the public domain.

use crate::shared::{Camera, CameraInner, PreviewFrame};
use bytes::Bytes;
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, RwLock, Weak,
        atomic::{AtomicU64, AtomicUsize, Ordering},
        mpsc::{Receiver, Sender, channel},
    },
    thread::JoinHandle,
};

/// Listener for camera events. All methods default to doing nothing.
///
/// Events are delivered on the dispatcher thread, in the order the camera
/// emitted them, to each listener in registration order.
#[allow(unused_variables)]
pub trait Callback: Send + Sync {
    fn on_camera_opened(&self, camera: &Camera) {}

    fn on_camera_closed(&self, camera: &Camera) {}

    /// `data` is a JPEG image.
    fn on_picture_taken(&self, camera: &Camera, data: Bytes) {}

    /// NV21 preview frame, from the Camera1 backend.
    fn on_preview_frame(&self, data: &[u8]) {}

    /// YUV 4:2:0 preview frame, from the Camera2 backends.
    fn on_preview_frame_planar(
        &self,
        planes: &[Bytes],
        strides: &[usize],
        width: u32,
        height: u32,
    ) {
    }
}

#[derive(Clone, Debug)]
pub enum CameraEvent {
    Opened,
    Closed,
    PictureTaken(Bytes),
    PreviewFrame(PreviewFrame),
}

impl CameraEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CameraEvent::Opened => "opened",
            CameraEvent::Closed => "closed",
            CameraEvent::PictureTaken(_) => "picture-taken",
            CameraEvent::PreviewFrame(_) => "preview-frame",
        }
    }
}

enum EventMsg {
    Event(CameraEvent),
    Stop,
}

/// Sending half of the dispatcher, handed to drivers.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<EventMsg>,
    pending_frames: Arc<AtomicUsize>,
    dropped_frames: Arc<AtomicU64>,
    capacity: usize,
}

impl EventSender {
    /// Queues a lifecycle or picture event. These are never dropped.
    pub fn send(&self, event: CameraEvent) {
        if let CameraEvent::PreviewFrame(frame) = event {
            self.try_send_frame(frame);
            return;
        }
        let _ = self.tx.send(EventMsg::Event(event));
    }

    /// Queues a preview frame unless too many are already waiting.
    pub fn try_send_frame(&self, frame: PreviewFrame) -> bool {
        let pending = self.pending_frames.fetch_add(1, Ordering::AcqRel);
        if pending >= self.capacity {
            self.pending_frames.fetch_sub(1, Ordering::AcqRel);
            let _dropped = self.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
            #[cfg(feature = "tracing")]
            asimov_module::tracing::trace!(
                target: "asimov_cameraview_module",
                dropped = _dropped,
                "preview frame dropped"
            );
            return false;
        }
        if self
            .tx
            .send(EventMsg::Event(CameraEvent::PreviewFrame(frame)))
            .is_err()
        {
            self.pending_frames.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

pub type CallbackList = Arc<RwLock<Vec<Arc<dyn Callback>>>>;

/// Fans camera events out to the registered callbacks on its own thread.
pub struct Dispatcher {
    sender: EventSender,
    callbacks: CallbackList,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize, owner: Weak<CameraInner>) -> Self {
        let (tx, rx) = channel::<EventMsg>();
        let sender = EventSender {
            tx,
            pending_frames: Arc::new(AtomicUsize::new(0)),
            dropped_frames: Arc::new(AtomicU64::new(0)),
            capacity: capacity.max(1),
        };
        let callbacks: CallbackList = Arc::new(RwLock::new(Vec::new()));

        let callbacks2 = Arc::clone(&callbacks);
        let pending = Arc::clone(&sender.pending_frames);
        let join = std::thread::Builder::new()
            .name("cameraview-dispatch".into())
            .spawn(move || run(rx, owner, callbacks2, pending))
            .ok();

        Self {
            sender,
            callbacks,
            join: Mutex::new(join),
        }
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn add_callback(&self, callback: Arc<dyn Callback>) {
        if let Ok(mut list) = self.callbacks.write() {
            list.push(callback);
        }
    }

    /// Removes the first registration of `callback`.
    pub fn remove_callback(&self, callback: &Arc<dyn Callback>) {
        if let Ok(mut list) = self.callbacks.write() {
            if let Some(pos) = list.iter().position(|c| Arc::ptr_eq(c, callback)) {
                list.remove(pos);
            }
        }
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn stop(&self) {
        let _ = self.sender.tx.send(EventMsg::Stop);
        let join = self.join.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(j) = join {
            // The last camera handle may be dropped by a callback.
            if j.thread().id() != std::thread::current().id() {
                let _ = j.join();
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    rx: Receiver<EventMsg>,
    owner: Weak<CameraInner>,
    callbacks: CallbackList,
    pending_frames: Arc<AtomicUsize>,
) {
    while let Ok(msg) = rx.recv() {
        let event = match msg {
            EventMsg::Event(event) => event,
            EventMsg::Stop => break,
        };
        if matches!(event, CameraEvent::PreviewFrame(_)) {
            pending_frames.fetch_sub(1, Ordering::AcqRel);
        }
        let Some(camera) = Camera::upgrade(&owner) else {
            break;
        };
        let list: Vec<Arc<dyn Callback>> = match callbacks.read() {
            Ok(list) => list.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        dispatch(&camera, &list, &event);
    }
}

/// Delivers `event` to every callback. A panicking callback is skipped.
pub(crate) fn dispatch(camera: &Camera, callbacks: &[Arc<dyn Callback>], event: &CameraEvent) {
    for (_index, callback) in callbacks.iter().enumerate() {
        let result = catch_unwind(AssertUnwindSafe(|| match event {
            CameraEvent::Opened => callback.on_camera_opened(camera),
            CameraEvent::Closed => callback.on_camera_closed(camera),
            CameraEvent::PictureTaken(data) => callback.on_picture_taken(camera, data.clone()),
            CameraEvent::PreviewFrame(PreviewFrame::Packed { data }) => {
                callback.on_preview_frame(data)
            },
            CameraEvent::PreviewFrame(PreviewFrame::Planar {
                planes,
                strides,
                width,
                height,
            }) => callback.on_preview_frame_planar(planes, strides, *width, *height),
        }));
        if result.is_err() {
            #[cfg(feature = "tracing")]
            asimov_module::tracing::warn!(
                target: "asimov_cameraview_module",
                callback = _index,
                event = event.kind(),
                "camera callback panicked"
            );
        }
    }
}
