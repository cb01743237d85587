// This is free and unencumbered software released into the public domain.

#[cfg(not(feature = "std"))]
compile_error!("asimov-cameraview-reader requires the 'std' feature");

use asimov_cameraview_module::{
    cli::{self, info_user, warn_user},
    shared::{AspectRatio, Callback, Camera, CameraConfig, CameraError, Facing, Flash},
};
use asimov_module::SysexitsError::{self, *};
use bytes::Bytes;
use clap::Parser;
use clientele::StandardOptions;
use know::traits::ToJsonLd;
use std::{
    error::Error as StdError,
    io::{self, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, RecvTimeoutError, Sender, channel},
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

const PICTURE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
struct Options {
    #[clap(flatten)]
    flags: StandardOptions,

    /// Simulate a device with this API level.
    #[arg(long, value_name = "LEVEL")]
    api_level: Option<u32>,

    /// Simulate cameras that only support the legacy hardware level.
    #[arg(long)]
    legacy: bool,

    #[arg(long, default_value = "back")]
    facing: Facing,

    #[arg(long, default_value = "auto")]
    flash: Flash,

    #[arg(short = 'r', long, value_name = "X:Y", default_value = "4:3")]
    aspect_ratio: AspectRatio,

    #[arg(long)]
    no_auto_focus: bool,

    /// Number of pictures to take.
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    count: u32,
}

pub fn main() -> Result<SysexitsError, Box<dyn StdError>> {
    asimov_module::dotenv().ok();
    let args = asimov_module::args_os()?;
    let options = Options::parse_from(args);

    if options.flags.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(EX_OK);
    }

    if options.flags.license {
        print!("{}", include_str!("../../UNLICENSE"));
        return Ok(EX_OK);
    }

    #[cfg(feature = "tracing")]
    asimov_module::init_tracing_subscriber(&options.flags).expect("failed to initialize logging");

    let exit_code = match run_reader(&options) {
        Ok(()) => EX_OK,
        Err(err) => cli::handle_error(&err, &options.flags),
    };

    Ok(exit_code)
}

enum ReaderEvent {
    Opened,
    Closed,
    Picture(Bytes),
}

/// Forwards camera events to the reader loop.
struct Forwarder {
    tx: Sender<ReaderEvent>,
}

impl Callback for Forwarder {
    fn on_camera_opened(&self, _camera: &Camera) {
        let _ = self.tx.send(ReaderEvent::Opened);
    }

    fn on_camera_closed(&self, _camera: &Camera) {
        let _ = self.tx.send(ReaderEvent::Closed);
    }

    fn on_picture_taken(&self, _camera: &Camera, data: Bytes) {
        let _ = self.tx.send(ReaderEvent::Picture(data));
    }
}

fn run_reader(opts: &Options) -> Result<(), CameraError> {
    info_user(&opts.flags, "starting camera reader");

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit2 = Arc::clone(&quit);
        ctrlc::set_handler(move || {
            quit2.store(true, Ordering::SeqCst);
        })
        .map_err(|e| CameraError::other(format!("{e}")))?;
    }

    let config = CameraConfig::new(opts.facing)
        .with_flash(opts.flash)
        .with_auto_focus(!opts.no_auto_focus)
        .with_aspect_ratio(opts.aspect_ratio)
        .with_diagnostics(opts.flags.debug || opts.flags.verbose >= 3);
    let camera = Camera::with_config(cli::select_platform(opts.api_level, opts.legacy), config);

    let (tx, rx) = channel();
    let forwarder: Arc<dyn Callback> = Arc::new(Forwarder { tx });
    camera.add_callback(Arc::clone(&forwarder));

    if let Err(err) = camera.start() {
        if !camera.is_camera_opened() {
            return Err(err);
        }
    }
    info_user(
        &opts.flags,
        &format!("camera opened with the {} backend", camera.backend()),
    );
    if camera.aspect_ratio() != opts.aspect_ratio {
        warn_user(
            &opts.flags,
            &format!(
                "aspect ratio {} is not supported; using {}",
                opts.aspect_ratio,
                camera.aspect_ratio()
            ),
        );
    }

    let source = format!("cameraview:{}/{}", camera.backend(), camera.facing());
    let result = read_pictures(opts, &camera, &rx, &quit, &source);

    camera.stop();
    camera.remove_callback(&forwarder);
    result
}

fn read_pictures(
    opts: &Options,
    camera: &Camera,
    rx: &Receiver<ReaderEvent>,
    quit: &AtomicBool,
    source: &str,
) -> Result<(), CameraError> {
    for _ in 0..opts.count {
        if quit.load(Ordering::SeqCst) {
            break;
        }
        camera.take_picture()?;

        let Some(data) = wait_for_picture(rx, quit)? else {
            break;
        };
        if !emit_picture(source, data) {
            quit.store(true, Ordering::SeqCst);
        }
    }
    Ok(())
}

/// Returns `None` when interrupted.
fn wait_for_picture(
    rx: &Receiver<ReaderEvent>,
    quit: &AtomicBool,
) -> Result<Option<Bytes>, CameraError> {
    let deadline = Instant::now() + PICTURE_TIMEOUT;
    loop {
        if quit.load(Ordering::SeqCst) {
            return Ok(None);
        }
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(ReaderEvent::Picture(data)) => return Ok(Some(data)),
            Ok(ReaderEvent::Closed) => return Err(CameraError::Closed),
            Ok(ReaderEvent::Opened) => {},
            Err(RecvTimeoutError::Timeout) if Instant::now() < deadline => {},
            Err(RecvTimeoutError::Timeout) => {
                return Err(CameraError::other("timed out waiting for the picture"));
            },
            Err(RecvTimeoutError::Disconnected) => return Err(CameraError::Closed),
        }
    }
}

/// Prints the picture as a JSON-LD line. Returns `false` once stdout is gone.
fn emit_picture(source: &str, data: Bytes) -> bool {
    let dimensions = image::load_from_memory(&data)
        .map(|img| (img.width(), img.height()))
        .ok();
    let ts_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis();

    let img = know::classes::Image {
        id: Some(format!("{source}#{ts_millis}")),
        width: dimensions.map(|(w, _)| w as _),
        height: dimensions.map(|(_, h)| h as _),
        data: data.to_vec(),
        source: Some(source.to_string()),
    };

    let json = match img.to_jsonld() {
        Ok(v) => v,
        Err(_) => return true,
    };

    let mut out = io::stdout().lock();
    match writeln!(&mut out, "{json}") {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => false,
        _ => true,
    }
}
