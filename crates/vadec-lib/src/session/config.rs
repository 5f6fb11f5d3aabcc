use crate::profile::Entrypoint;
use crate::surface::ChromaFormat;

/// Surfaces allocated on top of the stream's reference frames, so the decoder
/// can keep working while the caller still holds a few pictures.
pub const DEFAULT_SCRATCH_SURFACES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub scratch_surfaces: u32,
    pub chroma: ChromaFormat,
    pub entrypoint: Entrypoint,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scratch_surfaces: DEFAULT_SCRATCH_SURFACES,
            chroma: ChromaFormat::Yuv420,
            entrypoint: Entrypoint::Vld,
        }
    }
}

impl SessionConfig {
    pub fn with_scratch_surfaces(mut self, scratch_surfaces: u32) -> Self {
        self.scratch_surfaces = scratch_surfaces;
        self
    }

    pub fn with_chroma(mut self, chroma: ChromaFormat) -> Self {
        self.chroma = chroma;
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: Entrypoint) -> Self {
        self.entrypoint = entrypoint;
        self
    }

    pub fn pool_size(&self, reference_frames: u32) -> usize {
        (reference_frames + self.scratch_surfaces) as usize
    }
}
