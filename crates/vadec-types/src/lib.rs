use stabby::boxed::Box;
use stabby::dynptr;
use stabby::option::Option;
use stabby::result::Result;
use stabby::string::String;

/// Plain classification of a [`MediaLibError`], matchable on both sides of the ABI.
#[stabby::stabby]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FFmpeg,
    Unknown,
    Unsupported,
    InvalidArgument,
    OutOfMemory,
    Busy,
    Bug,
    Decode,
    InvalidState,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::FFmpeg => "ffmpeg error",
            ErrorKind::Unknown => "unknown error",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Busy => "busy",
            ErrorKind::Bug => "internal invariant violated",
            ErrorKind::Decode => "decode error",
            ErrorKind::InvalidState => "invalid state",
        }
    }
}

#[stabby::stabby]
#[repr(stabby)]
#[derive(Debug, Clone)]
pub enum MediaLibError {
    FFmpegError(String),
    UnknownError(String),
    Unsupported(String),
    InvalidArgument(String),
    OutOfMemory(String),
    Busy(String),
    /// Pool bookkeeping went wrong: acquire from an empty queue, double or foreign release.
    Bug(String),
    /// A single coded unit failed to decode. The session stays usable.
    DecodeError(String),
    InvalidState(String),
}

impl MediaLibError {
    pub fn with_kind(kind: ErrorKind, message: &str) -> Self {
        let message = String::from(message);
        match kind {
            ErrorKind::FFmpeg => MediaLibError::FFmpegError(message),
            ErrorKind::Unknown => MediaLibError::UnknownError(message),
            ErrorKind::Unsupported => MediaLibError::Unsupported(message),
            ErrorKind::InvalidArgument => MediaLibError::InvalidArgument(message),
            ErrorKind::OutOfMemory => MediaLibError::OutOfMemory(message),
            ErrorKind::Busy => MediaLibError::Busy(message),
            ErrorKind::Bug => MediaLibError::Bug(message),
            ErrorKind::Decode => MediaLibError::DecodeError(message),
            ErrorKind::InvalidState => MediaLibError::InvalidState(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.match_ref(
            |_| ErrorKind::FFmpeg,
            |_| ErrorKind::Unknown,
            |_| ErrorKind::Unsupported,
            |_| ErrorKind::InvalidArgument,
            |_| ErrorKind::OutOfMemory,
            |_| ErrorKind::Busy,
            |_| ErrorKind::Bug,
            |_| ErrorKind::Decode,
            |_| ErrorKind::InvalidState,
        )
    }

    pub fn message(&self) -> std::string::String {
        self.match_ref(
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
            |e| e.to_string(),
        )
    }

    /// Whether the error ends the decode session that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidArgument
                | ErrorKind::OutOfMemory
                | ErrorKind::Busy
                | ErrorKind::Unknown
                | ErrorKind::InvalidState
        )
    }
}

impl std::fmt::Display for MediaLibError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind().label(), self.message())
    }
}

impl std::error::Error for MediaLibError {}

/// Visible region of a possibly padded coded surface.
#[stabby::stabby]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[stabby::stabby]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub capacity: u32,
    pub free: u32,
    pub in_use: u32,
    pub generation: u64,
}

#[stabby::stabby]
#[derive(Debug, Clone)]
pub struct DecoderInfo {
    pub codec_name: String,
    pub profile: i32,
    pub width: u32,
    pub height: u32,
}

#[stabby::stabby]
#[derive(Debug, Clone)]
pub struct ProfileSupport {
    pub name: String,
    pub raw_profile: i32,
    pub decode: bool,
}

#[stabby::stabby]
pub trait VideoFrame {
    extern "C" fn get_surface_id(&self) -> u32;
    extern "C" fn get_width(&self) -> u32;
    extern "C" fn get_height(&self) -> u32;
    extern "C" fn get_crop_rect(&self) -> Option<CropRect>;
    extern "C" fn get_pts(&self) -> i64;
    extern "C" fn get_interlaced_frame(&self) -> i32;
    extern "C" fn get_top_field_first(&self) -> i32;
    extern "C" fn get_fourcc(&self) -> u32;
}

/// A decoded frame. Dropping it hands the surface back to the decoder.
pub type VideoFrameBox = dynptr!(Box<dyn VideoFrame>);

pub type VideoFrameResult = Result<VideoFrameBox, MediaLibError>;

#[stabby::stabby]
#[derive(Debug, Clone)]
pub struct MediaFrameDecoderOptions {
    /// Surfaces allocated on top of the stream's reference frames.
    pub scratch_surfaces: u32,
    /// DRM render node; empty selects the default node.
    pub device: String,
}

#[stabby::stabby]
pub trait MediaFrameDecoder {
    extern "C" fn get_frame(&mut self) -> Option<VideoFrameResult>;
    extern "C" fn get_info(&self) -> Option<DecoderInfo>;
    extern "C" fn get_pool_stats(&self) -> PoolStats;
    extern "C" fn close(&mut self);
}

#[stabby::stabby]
pub struct MediaLibInit {}
