//! `AVCodecContext` callbacks that route FFmpeg's format negotiation and
//! buffer allocation to the session's [`SurfaceHost`].

use crate::engine::{OutputFormat, StreamParams, SurfaceHost};
use crate::profile::Codec;
use crate::surface::{SurfaceId, SurfaceLease};
use ffmpeg_next::ffi::{
    av_buffer_create, av_buffer_get_opaque, avcodec_default_get_buffer2,
    avcodec_default_get_format, AVCodecContext, AVCodecID, AVFrame, AVPixelFormat,
};
use log::trace;
use std::ffi::{c_int, c_void};
use std::mem::size_of;
use std::ptr::null_mut;
use std::sync::Arc;
use vadec_types::MediaLibError;

const AV_BUFFER_FLAG_READONLY: c_int = 1;
const AV_CODEC_CAP_DR1: c_int = 1 << 1;
const AVERROR_ENOMEM: c_int = -12;

const fn fferrtag(tag: &[u8; 4]) -> c_int {
    -((tag[0] as c_int)
        | (tag[1] as c_int) << 8
        | (tag[2] as c_int) << 16
        | (tag[3] as c_int) << 24)
}

const AVERROR_BUG: c_int = fferrtag(b"BUG!");

/// Marks buffers created by [`get_buffer2`], so pictures can be told apart
/// from ones FFmpeg allocated itself.
static SURFACE_BUFFER_TAG: u8 = 0;

fn surface_buffer_tag() -> *mut c_void {
    &SURFACE_BUFFER_TAG as *const u8 as *mut c_void
}

/// Lives on the stack for the duration of one decode step; `avctx->opaque`
/// points at it only while the step runs.
pub(super) struct HostBridge<'a> {
    pub host: &'a mut dyn SurfaceHost,
    pub error: Option<MediaLibError>,
}

pub(super) fn codec_from_id(id: AVCodecID) -> Option<Codec> {
    match id {
        AVCodecID::AV_CODEC_ID_MPEG2VIDEO => Some(Codec::Mpeg2),
        AVCodecID::AV_CODEC_ID_MPEG4 => Some(Codec::Mpeg4),
        AVCodecID::AV_CODEC_ID_H264 => Some(Codec::H264),
        AVCodecID::AV_CODEC_ID_VC1 | AVCodecID::AV_CODEC_ID_WMV3 => Some(Codec::Vc1),
        AVCodecID::AV_CODEC_ID_HEVC => Some(Codec::Hevc),
        AVCodecID::AV_CODEC_ID_VP8 => Some(Codec::Vp8),
        AVCodecID::AV_CODEC_ID_VP9 => Some(Codec::Vp9),
        _ => None,
    }
}

unsafe fn bridge<'a>(avctx: *mut AVCodecContext) -> Option<&'a mut HostBridge<'a>> {
    ((*avctx).opaque as *mut HostBridge<'a>).as_mut()
}

unsafe fn offers(fmts: *const AVPixelFormat, wanted: AVPixelFormat) -> bool {
    let mut i = 0;
    loop {
        let format = *fmts.offset(i);
        if format == AVPixelFormat::AV_PIX_FMT_NONE {
            return false;
        }
        if format == wanted {
            return true;
        }
        i += 1;
    }
}

pub(super) unsafe extern "C" fn get_format(
    avctx: *mut AVCodecContext,
    fmts: *const AVPixelFormat,
) -> AVPixelFormat {
    let Some(bridge) = bridge(avctx) else {
        return avcodec_default_get_format(avctx, fmts);
    };
    if !offers(fmts, AVPixelFormat::AV_PIX_FMT_VAAPI) {
        return avcodec_default_get_format(avctx, fmts);
    }
    let Some(codec) = codec_from_id((*avctx).codec_id) else {
        return avcodec_default_get_format(avctx, fmts);
    };

    let params = StreamParams {
        codec,
        profile: (*avctx).profile,
        coded_width: (*avctx).coded_width.max(0) as u32,
        coded_height: (*avctx).coded_height.max(0) as u32,
        // Plus the picture currently being decoded.
        reference_frames: (*avctx).refs.max(0) as u32 + 1,
    };
    match bridge.host.negotiate_format(&params) {
        Ok(OutputFormat::Hardware) => AVPixelFormat::AV_PIX_FMT_VAAPI,
        Ok(OutputFormat::Software) => avcodec_default_get_format(avctx, fmts),
        Err(e) => {
            bridge.error = Some(e);
            AVPixelFormat::AV_PIX_FMT_NONE
        }
    }
}

unsafe extern "C" fn release_surface(_opaque: *mut c_void, data: *mut u8) {
    let lease = Box::from_raw(data as *mut Arc<SurfaceLease>);
    trace!("engine released surface {:#x}", lease.id());
}

pub(super) unsafe extern "C" fn get_buffer2(
    avctx: *mut AVCodecContext,
    frame: *mut AVFrame,
    flags: c_int,
) -> c_int {
    if (*avctx).pix_fmt != AVPixelFormat::AV_PIX_FMT_VAAPI
        || (*(*avctx).codec).capabilities & AV_CODEC_CAP_DR1 == 0
    {
        return avcodec_default_get_buffer2(avctx, frame, flags);
    }
    let Some(bridge) = bridge(avctx) else {
        return AVERROR_BUG;
    };

    let lease = match bridge.host.get_buffer() {
        Ok(lease) => lease,
        Err(e) => {
            bridge.error = Some(e);
            return AVERROR_BUG;
        }
    };
    let id = lease.id();
    let boxed = Box::into_raw(Box::new(lease));
    let buf = av_buffer_create(
        boxed as *mut u8,
        size_of::<Arc<SurfaceLease>>(),
        Some(release_surface),
        surface_buffer_tag(),
        AV_BUFFER_FLAG_READONLY,
    );
    if buf.is_null() {
        drop(Box::from_raw(boxed));
        return AVERROR_ENOMEM;
    }

    (*frame).buf[0] = buf;
    (*frame).data = [null_mut(); 8];
    (*frame).data[0] = id as usize as *mut u8;
    (*frame).data[3] = id as usize as *mut u8;
    (*frame).linesize = [0; 8];
    (*frame).linesize[0] = (*avctx).coded_width;
    0
}

/// Surface lease held by a picture [`get_buffer2`] allocated.
pub(super) unsafe fn frame_lease(frame: *const AVFrame) -> Option<Arc<SurfaceLease>> {
    let buf = (*frame).buf[0];
    if buf.is_null() || av_buffer_get_opaque(buf) != surface_buffer_tag() {
        return None;
    }
    let lease = (*buf).data as *const Arc<SurfaceLease>;
    Some(Arc::clone(&*lease))
}

/// Offset of the display window inside the surface, from the crop fields or,
/// failing that, from how far FFmpeg moved `data[0]` away from the surface id.
pub(super) unsafe fn crop_offset(frame: *const AVFrame, surface: SurfaceId) -> (u32, u32) {
    let (left, top) = ((*frame).crop_left, (*frame).crop_top);
    if left > 0 || top > 0 {
        return (left as u32, top as u32);
    }
    let linesize = (*frame).linesize[0];
    let offset = ((*frame).data[0] as usize).wrapping_sub(surface as usize);
    if linesize <= 0 || offset == 0 || offset > u32::MAX as usize {
        return (0, 0);
    }
    let linesize = linesize as usize;
    ((offset % linesize) as u32, (offset / linesize) as u32)
}
