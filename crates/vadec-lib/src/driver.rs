//! Abstract hardware driver contract and the translation of its status codes.

use crate::profile::{Entrypoint, HwProfile};
use crate::surface::SurfaceId;
use std::fmt;
use vadec_types::{ErrorKind, MediaLibError};

pub type ConfigId = u32;
pub type ContextId = u32;

/// Sentinel for a config or context that was never created.
pub const INVALID_ID: u32 = 0xffff_ffff;

/// Non-success status reported by the driver. Values follow `VA_STATUS_ERROR_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    OperationFailed,
    AllocationFailed,
    InvalidDisplay,
    InvalidConfig,
    InvalidContext,
    InvalidSurface,
    InvalidBuffer,
    InvalidImage,
    InvalidSubpicture,
    AttrNotSupported,
    MaxNumExceeded,
    UnsupportedProfile,
    UnsupportedEntrypoint,
    UnsupportedRtFormat,
    UnsupportedBufferType,
    SurfaceBusy,
    FlagNotSupported,
    InvalidParameter,
    ResolutionNotSupported,
    Unimplemented,
    SurfaceInDisplaying,
    InvalidImageFormat,
    DecodingError,
    EncodingError,
    InvalidValue,
    Other(i32),
}

const STATUS_TABLE: [(i32, DriverStatus); 25] = [
    (0x01, DriverStatus::OperationFailed),
    (0x02, DriverStatus::AllocationFailed),
    (0x03, DriverStatus::InvalidDisplay),
    (0x04, DriverStatus::InvalidConfig),
    (0x05, DriverStatus::InvalidContext),
    (0x06, DriverStatus::InvalidSurface),
    (0x07, DriverStatus::InvalidBuffer),
    (0x08, DriverStatus::InvalidImage),
    (0x09, DriverStatus::InvalidSubpicture),
    (0x0a, DriverStatus::AttrNotSupported),
    (0x0b, DriverStatus::MaxNumExceeded),
    (0x0c, DriverStatus::UnsupportedProfile),
    (0x0d, DriverStatus::UnsupportedEntrypoint),
    (0x0e, DriverStatus::UnsupportedRtFormat),
    (0x0f, DriverStatus::UnsupportedBufferType),
    (0x10, DriverStatus::SurfaceBusy),
    (0x11, DriverStatus::FlagNotSupported),
    (0x12, DriverStatus::InvalidParameter),
    (0x13, DriverStatus::ResolutionNotSupported),
    (0x14, DriverStatus::Unimplemented),
    (0x15, DriverStatus::SurfaceInDisplaying),
    (0x16, DriverStatus::InvalidImageFormat),
    (0x17, DriverStatus::DecodingError),
    (0x18, DriverStatus::EncodingError),
    (0x19, DriverStatus::InvalidValue),
];

impl DriverStatus {
    /// `None` for `VA_STATUS_SUCCESS`.
    pub fn from_raw(status: i32) -> Option<Self> {
        if status == 0 {
            return None;
        }
        let known = STATUS_TABLE
            .iter()
            .find(|(raw, _)| *raw == status)
            .map(|(_, status)| *status);
        Some(known.unwrap_or(DriverStatus::Other(status)))
    }

    pub fn as_raw(self) -> i32 {
        if let DriverStatus::Other(raw) = self {
            return raw;
        }
        STATUS_TABLE
            .iter()
            .find(|(_, status)| *status == self)
            .map(|(raw, _)| *raw)
            .unwrap_or(-1)
    }

    /// Statuses that are expected during probing and not worth logging.
    pub fn is_quiet(self) -> bool {
        self == DriverStatus::Unimplemented
    }

    pub fn kind(self) -> ErrorKind {
        use DriverStatus::*;
        match self {
            OperationFailed | Unimplemented => ErrorKind::Unsupported,
            UnsupportedProfile | UnsupportedEntrypoint | UnsupportedRtFormat
            | UnsupportedBufferType | ResolutionNotSupported => ErrorKind::Unsupported,
            InvalidDisplay | InvalidConfig | InvalidContext | InvalidSurface | InvalidBuffer
            | InvalidImage | InvalidSubpicture | InvalidParameter | InvalidValue
            | InvalidImageFormat => ErrorKind::InvalidArgument,
            AllocationFailed => ErrorKind::OutOfMemory,
            SurfaceBusy => ErrorKind::Busy,
            DecodingError => ErrorKind::Decode,
            _ => ErrorKind::Unknown,
        }
    }

    /// Builds the library error for a failed driver call named `what`.
    pub fn to_error(self, what: &str) -> MediaLibError {
        MediaLibError::with_kind(self.kind(), &format!("{}: {}", what, self))
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverStatus::Other(raw) => write!(f, "unknown driver status {:#x}", raw),
            status => write!(f, "{:?} ({:#x})", status, status.as_raw()),
        }
    }
}

pub type DriverResult<T> = Result<T, DriverStatus>;

/// Driver operations the decode session needs. One implementation per backend
/// family; the session is generic over it.
pub trait HardwareDriver {
    fn name(&self) -> String;

    fn query_profiles(&self) -> DriverResult<Vec<HwProfile>>;

    fn query_entrypoints(&self, profile: HwProfile) -> DriverResult<Vec<Entrypoint>>;

    /// `VAConfigAttribRTFormat` value for the pair, `None` if the driver does
    /// not report the attribute.
    fn query_rt_formats(
        &self,
        profile: HwProfile,
        entrypoint: Entrypoint,
    ) -> DriverResult<Option<u32>>;

    fn create_config(
        &self,
        profile: HwProfile,
        entrypoint: Entrypoint,
        rt_format: u32,
    ) -> DriverResult<ConfigId>;

    fn destroy_config(&self, config: ConfigId);

    fn create_surfaces(
        &self,
        rt_format: u32,
        width: u32,
        height: u32,
        count: usize,
    ) -> DriverResult<Vec<SurfaceId>>;

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]);

    fn create_context(
        &self,
        config: ConfigId,
        width: u32,
        height: u32,
        surfaces: &[SurfaceId],
    ) -> DriverResult<ContextId>;

    fn destroy_context(&self, context: ContextId);

    /// Blocks until all pending work on `surface` has completed.
    fn sync_surface(&self, surface: SurfaceId) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_not_a_status() {
        assert_eq!(DriverStatus::from_raw(0), None);
    }

    #[test]
    fn raw_values_round_trip() {
        for raw in 1..=0x19 {
            let status = DriverStatus::from_raw(raw).unwrap();
            assert!(!matches!(status, DriverStatus::Other(_)));
            assert_eq!(status.as_raw(), raw);
        }
        assert_eq!(
            DriverStatus::from_raw(0x1a),
            Some(DriverStatus::Other(0x1a))
        );
    }

    #[test]
    fn translation_to_error_kinds() {
        let cases = [
            (0x01, ErrorKind::Unsupported),
            (0x02, ErrorKind::OutOfMemory),
            (0x04, ErrorKind::InvalidArgument),
            (0x06, ErrorKind::InvalidArgument),
            (0x0c, ErrorKind::Unsupported),
            (0x10, ErrorKind::Busy),
            (0x12, ErrorKind::InvalidArgument),
            (0x14, ErrorKind::Unsupported),
            (0x17, ErrorKind::Decode),
            (0x19, ErrorKind::InvalidArgument),
            (0x0b, ErrorKind::Unknown),
            (0x42, ErrorKind::Unknown),
        ];
        for (raw, kind) in cases {
            assert_eq!(DriverStatus::from_raw(raw).unwrap().kind(), kind, "{:#x}", raw);
        }
    }

    #[test]
    fn only_unimplemented_is_quiet() {
        assert!(DriverStatus::Unimplemented.is_quiet());
        assert!(!DriverStatus::OperationFailed.is_quiet());
    }

    #[test]
    fn error_names_the_failed_call() {
        let error = DriverStatus::AllocationFailed.to_error("vaCreateSurfaces()");
        assert_eq!(error.kind(), ErrorKind::OutOfMemory);
        assert!(error.message().starts_with("vaCreateSurfaces(): AllocationFailed"));
        assert!(error.is_fatal());
    }
}
