// This is free and unencumbered software released into the public domain.

mod aspect_ratio;
pub use aspect_ratio::*;

mod camera;
pub use camera::*;

mod config;
pub use config::*;

mod device;
pub use device::*;

mod dispatcher;
pub use dispatcher::*;

mod driver;
pub use driver::*;

pub mod drivers {
    pub mod camera1;
    pub mod camera2;

    pub(crate) mod session;
}

mod error;
pub use error::*;

mod frame;
pub use frame::*;

mod modes;
pub use modes::*;

mod open;
pub use open::*;

mod orientation;
pub use orientation::*;

mod platform;
pub use platform::*;

mod preview;
pub use preview::*;

mod simulated;
pub use simulated::*;

#[cfg(all(feature = "android", target_os = "android"))]
mod android;
#[cfg(all(feature = "android", target_os = "android"))]
pub use android::*;
