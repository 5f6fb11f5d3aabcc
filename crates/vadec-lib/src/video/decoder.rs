use super::callbacks::{self, HostBridge};
use super::hardware::HardwareContext;
use crate::engine::{DecodeEngine, DecodedPicture, EngineOutput, StreamInfo, SurfaceHost};
use crate::va::VaDisplayHandle;
use ffmpeg_next::codec::Context;
use ffmpeg_next::util::error::EAGAIN;
use ffmpeg_next::{codec, Packet};
use log::debug;
use std::ffi::c_void;
use std::path::Path;
use std::ptr::null_mut;
use vadec_types::MediaLibError;

const AV_FRAME_FLAG_INTERLACED: i32 = 1 << 3;
const AV_FRAME_FLAG_TOP_FIELD_FIRST: i32 = 1 << 4;

fn ffmpeg_error(e: ffmpeg_next::Error) -> MediaLibError {
    match e {
        ffmpeg_next::Error::InvalidData => MediaLibError::DecodeError(e.to_string().into()),
        e => MediaLibError::FFmpegError(e.to_string().into()),
    }
}

/// FFmpeg demuxer and decoder whose output pictures land in pool surfaces.
///
/// Frame threading is disabled: buffer requests must happen on the thread that
/// runs the decode step, because that is the only time the session is
/// reachable through `avctx->opaque`.
pub struct FfmpegEngine {
    decoder: codec::decoder::Video,
    input_context: ffmpeg_next::format::context::Input,
    video_stream_index: usize,
    // Declared after `decoder`, which holds its own reference to the device.
    _hardware_context: HardwareContext,
    codec_name: String,
    eof_sent: bool,
}

impl FfmpegEngine {
    pub fn open(input_path: &Path, display: VaDisplayHandle) -> Result<Self, MediaLibError> {
        let input_context = ffmpeg_next::format::input(input_path).map_err(ffmpeg_error)?;

        let input = input_context
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| MediaLibError::FFmpegError("no video stream found".into()))?;
        let video_stream_index = input.index();

        let mut decoder_context =
            Context::from_parameters(input.parameters()).map_err(ffmpeg_error)?;
        let hardware_context = HardwareContext::new(display)?;

        unsafe {
            let ctx = decoder_context.as_mut_ptr();
            (*ctx).hw_device_ctx = hardware_context.new_ref()?;
            (*ctx).get_format = Some(callbacks::get_format);
            (*ctx).get_buffer2 = Some(callbacks::get_buffer2);
            (*ctx).thread_count = 1;
        }

        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(ffmpeg_error)?;
        let codec_name = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        debug!(
            "opened {} ({}x{}) from {}",
            codec_name,
            decoder.width(),
            decoder.height(),
            input_path.display()
        );

        Ok(Self {
            decoder,
            input_context,
            video_stream_index,
            _hardware_context: hardware_context,
            codec_name,
            eof_sent: false,
        })
    }

    fn next_video_packet(&mut self) -> Option<Packet> {
        loop {
            match self.input_context.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.video_stream_index {
                        return Some(packet);
                    }
                }
                None => return None,
            }
        }
    }

    fn step(&mut self) -> Result<EngineOutput, MediaLibError> {
        let mut decoded = ffmpeg_next::frame::Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return Ok(EngineOutput::Picture(self.picture(&decoded))),
                Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => {
                    if self.eof_sent {
                        return Ok(EngineOutput::EndOfStream);
                    }
                    match self.next_video_packet() {
                        Some(packet) => {
                            self.decoder.send_packet(&packet).map_err(ffmpeg_error)?;
                            return Ok(EngineOutput::NeedMoreInput);
                        }
                        None => {
                            self.decoder.send_eof().map_err(ffmpeg_error)?;
                            self.eof_sent = true;
                        }
                    }
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(EngineOutput::EndOfStream),
                Err(e) => return Err(ffmpeg_error(e)),
            }
        }
    }

    fn picture(&self, decoded: &ffmpeg_next::frame::Video) -> DecodedPicture {
        let frame = unsafe { decoded.as_ptr() };
        let surface = unsafe { callbacks::frame_lease(frame) };
        let crop_offset = match &surface {
            Some(lease) => unsafe { callbacks::crop_offset(frame, lease.id()) },
            None => (0, 0),
        };
        let flags = unsafe { (*frame).flags };
        DecodedPicture {
            surface,
            width: decoded.width(),
            height: decoded.height(),
            crop_offset,
            pts: decoded.pts(),
            interlaced: flags & AV_FRAME_FLAG_INTERLACED != 0,
            top_field_first: flags & AV_FRAME_FLAG_TOP_FIELD_FIRST != 0,
        }
    }
}

impl DecodeEngine for FfmpegEngine {
    fn info(&self) -> Option<StreamInfo> {
        let profile = unsafe { (*self.decoder.as_ptr()).profile };
        Some(StreamInfo {
            codec_name: self.codec_name.clone(),
            profile,
            width: self.decoder.width(),
            height: self.decoder.height(),
        })
    }

    fn decode_step(&mut self, host: &mut dyn SurfaceHost) -> Result<EngineOutput, MediaLibError> {
        let mut bridge = HostBridge { host, error: None };
        unsafe {
            (*self.decoder.as_mut_ptr()).opaque = &mut bridge as *mut HostBridge as *mut c_void;
        }
        let result = self.step();
        unsafe {
            (*self.decoder.as_mut_ptr()).opaque = null_mut();
        }

        // A callback failure surfaces from FFmpeg as a generic error code.
        if let Some(e) = bridge.error.take() {
            if let Err(reported) = &result {
                debug!("decoder reported {} after callback failure", reported);
            }
            return Err(e);
        }
        result
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        unsafe {
            if let Some(ctx) = self.decoder.as_mut_ptr().as_mut() {
                ctx.opaque = null_mut();
            }
        }
    }
}
