use crate::surface::{FourCc, SurfaceId, SurfaceLease};
use std::sync::Arc;
use vadec_types::CropRect;

/// A decoded picture bound to the surface that holds it.
///
/// Not `Clone`: each handle goes back to its session exactly once, through
/// [`super::DecodeSession::release_frame`] or by being dropped.
#[derive(Debug)]
pub struct FrameHandle {
    pub(super) session_id: u64,
    pub(super) surface: Arc<SurfaceLease>,
    pub(super) crop_rect: Option<CropRect>,
    pub(super) pts: Option<i64>,
    pub(super) interlaced: bool,
    pub(super) top_field_first: bool,
}

impl FrameHandle {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.id()
    }

    /// Coded surface width, including any padding.
    pub fn width(&self) -> u32 {
        self.surface.surface().width
    }

    pub fn height(&self) -> u32 {
        self.surface.surface().height
    }

    pub fn crop_rect(&self) -> Option<CropRect> {
        self.crop_rect
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn is_interlaced(&self) -> bool {
        self.interlaced
    }

    pub fn top_field_first(&self) -> bool {
        self.top_field_first
    }

    pub fn fourcc(&self) -> Option<FourCc> {
        self.surface.surface().fourcc
    }

    pub fn lease(&self) -> &Arc<SurfaceLease> {
        &self.surface
    }
}

/// Visible window of a coded surface. `None` when the whole surface is shown.
pub fn compute_crop_rect(
    coded: (u32, u32),
    display: (u32, u32),
    offset: (u32, u32),
) -> Option<CropRect> {
    if offset == (0, 0) && display == coded {
        return None;
    }
    Some(CropRect {
        x: offset.0,
        y: offset.1,
        width: display.0,
        height: display.1,
    })
}
