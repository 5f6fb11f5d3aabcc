//! FFmpeg decode engine backed by the surface pool.
//!
//! FFmpeg parses and decodes; VA-API does the heavy lifting through FFmpeg's
//! VAAPI hwaccel. Every output buffer FFmpeg asks for is a [`crate::surface::SurfaceLease`]
//! handed out by the session, so reference frames and frames held by the
//! caller share one bounded pool.
//!
//! # Thread Safety
//! The engine is not thread-safe and should only be used from a single thread.

mod callbacks;
mod decoder;
mod hardware;
#[cfg(test)]
mod tests;

pub use decoder::FfmpegEngine;
pub use hardware::HardwareContext;
