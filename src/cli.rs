// This is free and unencumbered software released into the public domain.

//! CLI helpers shared by the binaries (error reporting, platform selection).

use crate::shared::{CameraError, Platform, SimulatedConfig, SimulatedPlatform, default_platform};
use asimov_module::SysexitsError::{self, *};
use clientele::StandardOptions;
use std::sync::Arc;

/// Picks the platform for a command.
///
/// Any simulation option selects the in-process platform; otherwise the
/// native platform of this target is used.
pub fn select_platform(api_level: Option<u32>, legacy: bool) -> Arc<dyn Platform> {
    if api_level.is_none() && !legacy {
        return default_platform();
    }
    let mut config = SimulatedConfig::default();
    if let Some(level) = api_level {
        config.api_level = level;
    }
    if legacy {
        config = config.with_legacy_hardware();
    }
    Arc::new(SimulatedPlatform::new(config))
}

pub fn handle_error(err: &CameraError, flags: &StandardOptions) -> SysexitsError {
    #[cfg(feature = "tracing")]
    {
        use asimov_module::tracing::{debug, error};

        error!(target: "asimov_cameraview_module", %err, "camera command failed");

        if flags.debug || flags.verbose >= 2 {
            debug!(target: "asimov_cameraview_module", ?err, "detailed error");
        }
    }

    report_error(err, flags);
    map_error_to_sysexit(err)
}

pub fn info_user(flags: &StandardOptions, msg: &str) {
    if flags.debug || flags.verbose >= 1 {
        eprintln!("INFO: {msg}");
    }

    #[cfg(feature = "tracing")]
    asimov_module::tracing::info!(target: "asimov_cameraview_module", "{msg}");
}

pub fn warn_user(flags: &StandardOptions, msg: &str) {
    if flags.debug || flags.verbose >= 1 {
        eprintln!("WARN: {msg}");
    }

    #[cfg(feature = "tracing")]
    asimov_module::tracing::warn!(target: "asimov_cameraview_module", "{msg}");
}

fn report_error(err: &CameraError, flags: &StandardOptions) {
    use std::error::Error as _;
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "ERROR: {err}");

    if flags.debug || flags.verbose >= 2 {
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = writeln!(stderr, "  Caused by: {}", cause);
            source = cause.source();
        }
    }
}

fn map_error_to_sysexit(err: &CameraError) -> SysexitsError {
    match err {
        CameraError::NoCamera => EX_UNAVAILABLE,
        CameraError::NotOpened => EX_UNAVAILABLE,
        CameraError::LegacyHardware => EX_UNAVAILABLE,
        CameraError::Unsupported(_) => EX_UNAVAILABLE,
        CameraError::InvalidConfig(_) => EX_USAGE,
        CameraError::Closed => EX_IOERR,
        CameraError::DriverError { .. } => EX_SOFTWARE,
        CameraError::Other(_) => EX_SOFTWARE,
    }
}
