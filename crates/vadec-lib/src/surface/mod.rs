//! Hardware surfaces and the bounded pool that recycles them.
//!
//! A [`SurfacePool`] owns every surface of a decode session. Free surfaces sit in
//! a FIFO [`SurfaceQueue`]; a surface outside the queue is checked out and
//! belongs to whoever holds its [`SurfaceLease`]. The lease is reference
//! counted so the decode engine (reference frames) and the caller (display) can
//! share it; the surface goes back to the queue when the last clone drops.

mod format;
mod lease;
mod pool;
mod queue;
#[cfg(test)]
mod tests;

pub use format::{FourCc, PixelFormat};
pub use lease::SurfaceLease;
pub use pool::{SharedPool, SurfacePool};
pub use queue::{QueueError, SurfaceQueue};

/// Opaque driver handle of a surface.
pub type SurfaceId = u32;

/// Sentinel for an unallocated slot (`VA_INVALID_ID`).
pub const INVALID_SURFACE_ID: SurfaceId = 0xffff_ffff;

/// Chroma layout of a surface, i.e. the driver's render-target format class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaFormat {
    Yuv400,
    Yuv420,
    Yuv422,
    Yuv444,
    Rgb32,
}

impl ChromaFormat {
    /// `VA_RT_FORMAT_*` bit for this chroma class.
    pub fn rt_format(self) -> u32 {
        match self {
            ChromaFormat::Yuv420 => 0x0000_0001,
            ChromaFormat::Yuv422 => 0x0000_0002,
            ChromaFormat::Yuv444 => 0x0000_0004,
            ChromaFormat::Yuv400 => 0x0000_0010,
            ChromaFormat::Rgb32 => 0x0002_0000,
        }
    }

    /// Whether a driver RT-format attribute mask covers this chroma class.
    pub fn is_supported_by(self, rt_formats: u32) -> bool {
        rt_formats & self.rt_format() != 0
    }
}

/// One hardware-resident picture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub id: SurfaceId,
    pub chroma: Option<ChromaFormat>,
    /// Only set when the surface is the output of a post-processing stage.
    pub fourcc: Option<FourCc>,
    pub width: u32,
    pub height: u32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            id: INVALID_SURFACE_ID,
            chroma: None,
            fourcc: None,
            width: 0,
            height: 0,
        }
    }
}

impl Surface {
    pub fn new(id: SurfaceId, chroma: ChromaFormat, width: u32, height: u32) -> Self {
        Self {
            id,
            chroma: Some(chroma),
            fourcc: None,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id != INVALID_SURFACE_ID
    }

    /// Tags the surface with a concrete pixel layout. The layout must belong to
    /// the surface's chroma class.
    pub fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        if self.chroma != Some(format.chroma()) {
            return false;
        }
        self.fourcc = Some(format.fourcc());
        true
    }
}
