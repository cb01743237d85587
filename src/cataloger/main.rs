// This is free and unencumbered software released into the public domain.

#[cfg(not(feature = "std"))]
compile_error!("asimov-cameraview-cataloger requires the 'std' feature");

use asimov_cameraview_module::{
    cli::{self, info_user, warn_user},
    shared::{ApiTier, CameraCharacteristics, CameraError, SizeMap},
};
use asimov_module::SysexitsError::{self, *};
use clap::Parser;
use clientele::StandardOptions;
use serde_json::json;
use std::error::Error as StdError;

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

    #[arg(
        value_name = "FORMAT",
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text"
    )]
    output: OutputFormat,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Jsonl,
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

    let exit_code = match run_cataloger(&options) {
        Ok(()) => EX_OK,
        Err(err) => cli::handle_error(&err, &options.flags),
    };

    Ok(exit_code)
}

fn run_cataloger(options: &Options) -> Result<(), CameraError> {
    info_user(&options.flags, "enumerating cameras");

    let platform = cli::select_platform(options.api_level, options.legacy);
    let api_level = platform.api_level();
    let backend = ApiTier::from_api_level(api_level).backend();
    info_user(
        &options.flags,
        &format!("API level {api_level} selects the {backend} backend"),
    );

    let service = platform.camera_service();
    let ids = service
        .camera_ids()
        .map_err(|e| CameraError::driver("listing cameras", e))?;
    if ids.is_empty() {
        warn_user(&options.flags, "no cameras found");
        return Ok(());
    }

    for id in ids {
        let characteristics = service
            .characteristics(&id)
            .map_err(|e| CameraError::driver("reading camera characteristics", e))?;
        print_camera(options, &id, &characteristics);
    }

    Ok(())
}

fn print_camera(options: &Options, id: &str, c: &CameraCharacteristics) {
    let ratios: Vec<String> = c
        .preview_sizes
        .iter()
        .copied()
        .collect::<SizeMap>()
        .ratios()
        .iter()
        .map(ToString::to_string)
        .collect();

    match options.output {
        OutputFormat::Text => {
            println!(
                "{id}: {} [{}] ratios {}",
                c.facing,
                c.hardware_level,
                ratios.join(", ")
            );
        },
        OutputFormat::Jsonl => {
            let flash: Vec<String> = c.flash_modes.iter().map(ToString::to_string).collect();
            println!(
                "{}",
                json!({
                    "id": id,
                    "facing": c.facing.to_string(),
                    "hardware_level": c.hardware_level.to_string(),
                    "sensor_orientation": c.sensor_orientation,
                    "aspect_ratios": ratios,
                    "flash_modes": flash,
                    "auto_focus": c.auto_focus,
                })
            );
        },
    }
}
