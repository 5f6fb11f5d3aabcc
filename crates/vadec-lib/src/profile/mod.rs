//! Codec and hardware profile tables, and the per-session capability negotiator.

mod negotiator;

pub use negotiator::{CapabilityNegotiator, NegotiatedProfile};

use std::fmt;

/// Compressed formats the hardware path knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Mpeg2,
    Mpeg4,
    H264,
    Vc1,
    Hevc,
    Vp8,
    Vp9,
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Mpeg2 => "mpeg2video",
            Codec::Mpeg4 => "mpeg4",
            Codec::H264 => "h264",
            Codec::Vc1 => "vc1",
            Codec::Hevc => "hevc",
            Codec::Vp8 => "vp8",
            Codec::Vp9 => "vp9",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hardware decode profile. Discriminants are the `VAProfile` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HwProfile {
    Mpeg2Simple = 0,
    Mpeg2Main = 1,
    Mpeg4Simple = 2,
    Mpeg4AdvancedSimple = 3,
    Mpeg4Main = 4,
    H264Baseline = 5,
    H264Main = 6,
    H264High = 7,
    Vc1Simple = 8,
    Vc1Main = 9,
    Vc1Advanced = 10,
    H263Baseline = 11,
    JpegBaseline = 12,
    H264ConstrainedBaseline = 13,
    Vp8Version0_3 = 14,
    HevcMain = 17,
    HevcMain10 = 18,
    Vp9Profile0 = 19,
}

const HW_PROFILES: [HwProfile; 18] = [
    HwProfile::Mpeg2Simple,
    HwProfile::Mpeg2Main,
    HwProfile::Mpeg4Simple,
    HwProfile::Mpeg4AdvancedSimple,
    HwProfile::Mpeg4Main,
    HwProfile::H264Baseline,
    HwProfile::H264Main,
    HwProfile::H264High,
    HwProfile::Vc1Simple,
    HwProfile::Vc1Main,
    HwProfile::Vc1Advanced,
    HwProfile::H263Baseline,
    HwProfile::JpegBaseline,
    HwProfile::H264ConstrainedBaseline,
    HwProfile::Vp8Version0_3,
    HwProfile::HevcMain,
    HwProfile::HevcMain10,
    HwProfile::Vp9Profile0,
];

impl HwProfile {
    /// Profiles this crate has no name for (newer codecs, encode-only ones) map
    /// to `None` and are skipped.
    pub fn from_raw(raw: i32) -> Option<Self> {
        HW_PROFILES.iter().copied().find(|p| p.as_raw() == raw)
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            HwProfile::Mpeg2Simple => "MPEG2Simple",
            HwProfile::Mpeg2Main => "MPEG2Main",
            HwProfile::Mpeg4Simple => "MPEG4Simple",
            HwProfile::Mpeg4AdvancedSimple => "MPEG4AdvancedSimple",
            HwProfile::Mpeg4Main => "MPEG4Main",
            HwProfile::H264Baseline => "H264Baseline",
            HwProfile::H264Main => "H264Main",
            HwProfile::H264High => "H264High",
            HwProfile::Vc1Simple => "VC1Simple",
            HwProfile::Vc1Main => "VC1Main",
            HwProfile::Vc1Advanced => "VC1Advanced",
            HwProfile::H263Baseline => "H263Baseline",
            HwProfile::JpegBaseline => "JPEGBaseline",
            HwProfile::H264ConstrainedBaseline => "H264ConstrainedBaseline",
            HwProfile::Vp8Version0_3 => "VP8Version0_3",
            HwProfile::HevcMain => "HEVCMain",
            HwProfile::HevcMain10 => "HEVCMain10",
            HwProfile::Vp9Profile0 => "VP9Profile0",
        }
    }
}

impl fmt::Display for HwProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hardware entrypoint. Discriminants are the `VAEntrypoint` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Entrypoint {
    Vld = 1,
    VideoProc = 10,
}

impl Entrypoint {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Entrypoint::Vld),
            10 => Some(Entrypoint::VideoProc),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// A (codec, profile) pair as the decode engine reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecProfile {
    Mpeg2Simple,
    Mpeg2Main,
    Mpeg4Simple,
    Mpeg4Main,
    Mpeg4AdvancedSimple,
    H264Baseline,
    H264ConstrainedBaseline,
    H264Main,
    H264High,
    Vc1Simple,
    Vc1Main,
    Vc1Advanced,
    HevcMain,
    HevcMain10,
    Vp8,
    Vp9,
}

impl CodecProfile {
    /// Maps FFmpeg's numeric `FF_PROFILE_*` ids. VP8 and VP9 ignore the
    /// profile number.
    pub fn from_ffmpeg(codec: Codec, profile: i32) -> Option<Self> {
        let mapped = match (codec, profile) {
            (Codec::Mpeg2, 5) => CodecProfile::Mpeg2Simple,
            (Codec::Mpeg2, 4) => CodecProfile::Mpeg2Main,
            (Codec::Mpeg4, 0) => CodecProfile::Mpeg4Simple,
            (Codec::Mpeg4, 3) => CodecProfile::Mpeg4Main,
            (Codec::Mpeg4, 15) => CodecProfile::Mpeg4AdvancedSimple,
            (Codec::H264, 66) => CodecProfile::H264Baseline,
            (Codec::H264, 578) => CodecProfile::H264ConstrainedBaseline,
            (Codec::H264, 77) => CodecProfile::H264Main,
            (Codec::H264, 100) => CodecProfile::H264High,
            (Codec::Vc1, 0) => CodecProfile::Vc1Simple,
            (Codec::Vc1, 1) => CodecProfile::Vc1Main,
            (Codec::Vc1, 3) => CodecProfile::Vc1Advanced,
            (Codec::Hevc, 1) => CodecProfile::HevcMain,
            (Codec::Hevc, 2) => CodecProfile::HevcMain10,
            (Codec::Vp8, _) => CodecProfile::Vp8,
            (Codec::Vp9, _) => CodecProfile::Vp9,
            _ => return None,
        };
        Some(mapped)
    }

    pub fn hw_profile(self) -> HwProfile {
        match self {
            CodecProfile::Mpeg2Simple => HwProfile::Mpeg2Simple,
            CodecProfile::Mpeg2Main => HwProfile::Mpeg2Main,
            CodecProfile::Mpeg4Simple => HwProfile::Mpeg4Simple,
            CodecProfile::Mpeg4Main => HwProfile::Mpeg4Main,
            CodecProfile::Mpeg4AdvancedSimple => HwProfile::Mpeg4AdvancedSimple,
            CodecProfile::H264Baseline => HwProfile::H264Baseline,
            CodecProfile::H264ConstrainedBaseline => HwProfile::H264ConstrainedBaseline,
            CodecProfile::H264Main => HwProfile::H264Main,
            CodecProfile::H264High => HwProfile::H264High,
            CodecProfile::Vc1Simple => HwProfile::Vc1Simple,
            CodecProfile::Vc1Main => HwProfile::Vc1Main,
            CodecProfile::Vc1Advanced => HwProfile::Vc1Advanced,
            CodecProfile::HevcMain => HwProfile::HevcMain,
            CodecProfile::HevcMain10 => HwProfile::HevcMain10,
            CodecProfile::Vp8 => HwProfile::Vp8Version0_3,
            CodecProfile::Vp9 => HwProfile::Vp9Profile0,
        }
    }

    /// Hardware profiles that can decode this stream, most specific first.
    /// A superset profile decodes every stream of its subsets.
    pub fn candidates(self) -> Vec<HwProfile> {
        use HwProfile::*;
        let chain: &[HwProfile] = match self.hw_profile() {
            Mpeg2Simple => &[Mpeg2Simple, Mpeg2Main],
            Mpeg4Simple => &[Mpeg4Simple, Mpeg4AdvancedSimple, Mpeg4Main],
            Mpeg4AdvancedSimple => &[Mpeg4AdvancedSimple, Mpeg4Main],
            H264Baseline => &[H264Baseline, H264Main, H264High],
            H264ConstrainedBaseline => &[H264ConstrainedBaseline, H264Main, H264High],
            H264Main => &[H264Main, H264High],
            Vc1Simple => &[Vc1Simple, Vc1Main, Vc1Advanced],
            Vc1Main => &[Vc1Main, Vc1Advanced],
            other => return vec![other],
        };
        chain.to_vec()
    }
}
