use super::ChromaFormat;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub u32);

impl FourCc {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(
            code[0] as u32
                | (code[1] as u32) << 8
                | (code[2] as u32) << 16
                | (code[3] as u32) << 24,
        )
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self)
    }
}

/// Pixel layouts a surface can carry once it leaves the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    Yuv420p,
    Nv12,
    Yuyv422,
    Uyvy422,
    Rgbx,
    Bgrx,
    Rgba,
    Bgra,
}

const PIXEL_FORMATS: [(PixelFormat, FourCc, ChromaFormat); 9] = [
    (PixelFormat::Gray8, FourCc::new(b"Y800"), ChromaFormat::Yuv400),
    (PixelFormat::Yuv420p, FourCc::new(b"I420"), ChromaFormat::Yuv420),
    (PixelFormat::Nv12, FourCc::new(b"NV12"), ChromaFormat::Yuv420),
    (PixelFormat::Yuyv422, FourCc::new(b"YUY2"), ChromaFormat::Yuv422),
    (PixelFormat::Uyvy422, FourCc::new(b"UYVY"), ChromaFormat::Yuv422),
    (PixelFormat::Rgbx, FourCc::new(b"RGBX"), ChromaFormat::Rgb32),
    (PixelFormat::Bgrx, FourCc::new(b"BGRX"), ChromaFormat::Rgb32),
    (PixelFormat::Rgba, FourCc::new(b"RGBA"), ChromaFormat::Rgb32),
    (PixelFormat::Bgra, FourCc::new(b"BGRA"), ChromaFormat::Rgb32),
];

impl PixelFormat {
    fn entry(self) -> (PixelFormat, FourCc, ChromaFormat) {
        // Every variant has a row.
        PIXEL_FORMATS
            .iter()
            .copied()
            .find(|(format, _, _)| *format == self)
            .unwrap_or((self, FourCc(0), ChromaFormat::Yuv420))
    }

    pub fn fourcc(self) -> FourCc {
        self.entry().1
    }

    pub fn chroma(self) -> ChromaFormat {
        self.entry().2
    }

    pub fn from_fourcc(fourcc: FourCc) -> Option<Self> {
        PIXEL_FORMATS
            .iter()
            .find(|(_, code, _)| *code == fourcc)
            .map(|(format, _, _)| *format)
    }
}
