pub mod driver;
pub mod engine;
pub mod profile;
pub mod session;
pub mod surface;
#[cfg(test)]
mod testing;
pub mod va;
#[cfg(feature = "ffmpeg")]
pub mod video;

use driver::HardwareDriver;
use engine::DecodeEngine;
use session::{DecodeSession, FrameHandle, FrameStatus};
use vadec_types::{
    CropRect, DecoderInfo, MediaFrameDecoder, MediaFrameDecoderOptions, MediaLibError,
    MediaLibInit, PoolStats, ProfileSupport, VideoFrame, VideoFrameResult,
};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next as ffmpeg;

#[stabby::stabby]
#[stabby::export]
pub fn init_media_lib() -> stabby::result::Result<MediaLibInit, MediaLibError> {
    #[cfg(feature = "ffmpeg")]
    if let Err(e) = ffmpeg::init() {
        return Err(MediaLibError::FFmpegError(e.to_string().into())).into();
    }
    Ok(MediaLibInit {}).into()
}

struct VideoFrameWrapper {
    inner: FrameHandle,
}

impl VideoFrame for VideoFrameWrapper {
    extern "C" fn get_surface_id(&self) -> u32 {
        self.inner.surface_id()
    }

    extern "C" fn get_width(&self) -> u32 {
        self.inner.width()
    }

    extern "C" fn get_height(&self) -> u32 {
        self.inner.height()
    }

    extern "C" fn get_crop_rect(&self) -> stabby::option::Option<CropRect> {
        self.inner.crop_rect().into()
    }

    extern "C" fn get_pts(&self) -> i64 {
        self.inner.pts().unwrap_or(0)
    }

    extern "C" fn get_interlaced_frame(&self) -> i32 {
        self.inner.is_interlaced() as i32
    }

    extern "C" fn get_top_field_first(&self) -> i32 {
        self.inner.top_field_first() as i32
    }

    extern "C" fn get_fourcc(&self) -> u32 {
        self.inner.fourcc().map(|fourcc| fourcc.0).unwrap_or(0)
    }
}

struct MediaFrameDecoderWrapper<D: HardwareDriver, E: DecodeEngine> {
    session: DecodeSession<D, E>,
}

impl<D: HardwareDriver, E: DecodeEngine> MediaFrameDecoderWrapper<D, E> {
    /// Pulls until the session yields a frame, an error or the end of the stream.
    fn next_frame(&mut self) -> Option<Result<FrameHandle, MediaLibError>> {
        loop {
            match self.session.get_next_frame() {
                Ok(FrameStatus::Frame(frame)) => return Some(Ok(frame)),
                Ok(FrameStatus::Retry) => continue,
                Ok(FrameStatus::EndOfStream) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<D: HardwareDriver, E: DecodeEngine> MediaFrameDecoder for MediaFrameDecoderWrapper<D, E> {
    extern "C" fn get_frame(&mut self) -> stabby::option::Option<VideoFrameResult> {
        match self.next_frame() {
            Some(Ok(frame)) => {
                let wrapper = VideoFrameWrapper { inner: frame };
                Some(Ok(stabby::boxed::Box::new(wrapper).into()).into()).into()
            }
            Some(Err(e)) => Some(Err(e).into()).into(),
            None => None.into(),
        }
    }

    extern "C" fn get_info(&self) -> stabby::option::Option<DecoderInfo> {
        self.session
            .info()
            .map(|info| DecoderInfo {
                codec_name: info.codec_name.as_str().into(),
                profile: info.profile,
                width: info.width,
                height: info.height,
            })
            .into()
    }

    extern "C" fn get_pool_stats(&self) -> PoolStats {
        self.session.stats()
    }

    extern "C" fn close(&mut self) {
        self.session.close();
    }
}

#[cfg(feature = "ffmpeg")]
fn open_frame_decoder(
    path: &std::path::Path,
    options: &MediaFrameDecoderOptions,
) -> Result<stabby::dynptr!(stabby::boxed::Box<dyn MediaFrameDecoder>), MediaLibError> {
    let driver = va::VaDriver::open(options.device.as_str())?;
    let engine = video::FfmpegEngine::open(path, driver.display().handle())?;
    let config = session::SessionConfig::default().with_scratch_surfaces(options.scratch_surfaces);
    let session = DecodeSession::new(driver, engine, config);
    Ok(stabby::boxed::Box::new(MediaFrameDecoderWrapper { session }).into())
}

#[cfg(not(feature = "ffmpeg"))]
fn open_frame_decoder(
    path: &std::path::Path,
    _options: &MediaFrameDecoderOptions,
) -> Result<stabby::dynptr!(stabby::boxed::Box<dyn MediaFrameDecoder>), MediaLibError> {
    Err(MediaLibError::Unsupported(
        format!(
            "cannot decode {}: built without the ffmpeg feature",
            path.display()
        )
        .into(),
    ))
}

#[stabby::stabby]
#[stabby::export]
pub fn new_frame_decoder(
    path_str: stabby::string::String,
    options: MediaFrameDecoderOptions,
) -> stabby::result::Result<stabby::dynptr!(stabby::boxed::Box<dyn MediaFrameDecoder>), MediaLibError>
{
    let path_str = path_str.to_string();
    let path = std::path::Path::new(&path_str);
    open_frame_decoder(path, &options).into()
}

#[stabby::stabby]
#[stabby::export]
pub fn probe_profiles(
    device: stabby::string::String,
) -> stabby::result::Result<stabby::vec::Vec<ProfileSupport>, MediaLibError> {
    match va::probe_profiles(device.as_str()) {
        Ok(profiles) => {
            let mut out = stabby::vec::Vec::new();
            for profile in profiles {
                out.push(profile);
            }
            Ok(out).into()
        }
        Err(e) => Err(e).into(),
    }
}

#[stabby::stabby]
#[stabby::export]
pub fn init_logging() {
    #[cfg(feature = "ffmpeg")]
    ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Info);
    let _ = pretty_env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::HwProfile;
    use crate::testing::{h264_params, MockDriver, ScriptedEngine, Step};
    use vadec_types::{ErrorKind, VideoFrameDyn};

    fn wrapper(script: Vec<Step>) -> MediaFrameDecoderWrapper<MockDriver, ScriptedEngine> {
        let driver = MockDriver::with_profiles(&[HwProfile::H264High]);
        let session = DecodeSession::new(
            driver,
            ScriptedEngine::new(script, 0),
            session::SessionConfig::default(),
        );
        MediaFrameDecoderWrapper { session }
    }

    #[test]
    fn get_frame_skips_retries_and_ends_with_none() {
        let mut decoder = wrapper(vec![
            Step::Negotiate(h264_params(100, 2)),
            Step::NeedInput,
            Step::NeedInput,
            Step::Picture {
                width: 1280,
                height: 720,
                crop_offset: (0, 0),
            },
            Step::Eos,
        ]);

        let frame = decoder.get_frame();
        assert!(frame.is_some());
        let frame = frame.unwrap().unwrap();
        assert_eq!(frame.get_width(), 1920);
        assert_eq!(frame.get_height(), 1088);
        let crop = frame.get_crop_rect().unwrap();
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (0, 0, 1280, 720));
        assert_eq!(frame.get_pts(), 1);
        assert_eq!(decoder.get_pool_stats().in_use, 1);

        drop(frame);
        assert_eq!(decoder.get_pool_stats().in_use, 0);
        assert!(decoder.get_frame().is_none());

        let info = decoder.get_info().unwrap();
        assert_eq!(info.codec_name.as_str(), "h264");
        assert_eq!(info.profile, 100);
    }

    #[test]
    fn errors_cross_the_boundary() {
        let mut decoder = wrapper(vec![Step::Fail(MediaLibError::DecodeError(
            "bad slice".into(),
        ))]);
        let err = decoder.get_frame().unwrap().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn close_releases_the_pool() {
        let mut decoder = wrapper(vec![Step::Negotiate(h264_params(100, 2))]);
        assert!(decoder.get_frame().is_none());
        assert_eq!(decoder.get_pool_stats().capacity, 6);
        decoder.close();
        assert_eq!(decoder.get_pool_stats().capacity, 0);
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn decoding_needs_the_ffmpeg_feature() {
        let options = MediaFrameDecoderOptions {
            scratch_surfaces: 4,
            device: "".into(),
        };
        let result = new_frame_decoder("movie.mp4".into(), options);
        assert_eq!(result.err().unwrap().kind(), ErrorKind::Unsupported);
    }
}
