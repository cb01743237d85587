// This is free and unencumbered software released into the public domain.

//! Headless camera facade over the Camera1 and Camera2 backends.

extern crate alloc;

#[cfg(feature = "cli")]
pub mod cli;

pub mod shared;
