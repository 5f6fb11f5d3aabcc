//! The seam between a decode session and the component that actually parses
//! and decodes the bitstream.
//!
//! The engine calls back into a [`SurfaceHost`] for format negotiation and for
//! every output buffer it needs, and hands decoded pictures back still holding
//! the [`SurfaceLease`] they were written to.

use crate::profile::Codec;
use crate::surface::SurfaceLease;
use std::sync::Arc;
use vadec_types::MediaLibError;

/// Stream properties known when the engine asks for an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub codec: Codec,
    /// FFmpeg `FF_PROFILE_*` number.
    pub profile: i32,
    pub coded_width: u32,
    pub coded_height: u32,
    /// Reference pictures the engine may hold at once.
    pub reference_frames: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Decode into pool surfaces.
    Hardware,
    /// No hardware profile fits; the engine allocates its own buffers.
    Software,
}

/// Callbacks an engine may invoke while it is inside [`DecodeEngine::decode_step`].
pub trait SurfaceHost {
    /// Called once per stream, before the first buffer is requested.
    fn negotiate_format(&mut self, params: &StreamParams) -> Result<OutputFormat, MediaLibError>;

    /// Checks a free surface out of the pool for the next coded picture.
    fn get_buffer(&mut self) -> Result<Arc<SurfaceLease>, MediaLibError>;
}

/// One output picture in presentation order.
#[derive(Debug, Clone, Default)]
pub struct DecodedPicture {
    /// `None` when the picture was decoded in software.
    pub surface: Option<Arc<SurfaceLease>>,
    /// Display size.
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the display window inside the coded surface.
    pub crop_offset: (u32, u32),
    pub pts: Option<i64>,
    pub interlaced: bool,
    pub top_field_first: bool,
}

#[derive(Debug)]
pub enum EngineOutput {
    Picture(DecodedPicture),
    NeedMoreInput,
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub codec_name: String,
    pub profile: i32,
    pub width: u32,
    pub height: u32,
}

pub trait DecodeEngine {
    fn info(&self) -> Option<StreamInfo>;

    /// Runs the engine until it produces a picture, wants more input or hits the
    /// end of the stream.
    fn decode_step(&mut self, host: &mut dyn SurfaceHost) -> Result<EngineOutput, MediaLibError>;
}
