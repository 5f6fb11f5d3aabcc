use std::path::Path;

use stabby::libloading::StabbyLibrary;
use vadec_types::{
    MediaFrameDecoder, MediaFrameDecoderOptions, MediaLibError, MediaLibInit, ProfileSupport,
};

pub use vadec_types;

mod test;

pub type FrameDecoderBox = stabby::dynptr!(stabby::boxed::Box<dyn MediaFrameDecoder>);

type NewFrameDecoderFn = extern "C" fn(
    stabby::string::String,
    MediaFrameDecoderOptions,
) -> stabby::result::Result<FrameDecoderBox, MediaLibError>;

type ProbeProfilesFn = extern "C" fn(
    stabby::string::String,
) -> stabby::result::Result<stabby::vec::Vec<ProfileSupport>, MediaLibError>;

#[derive(Debug)]
pub enum MediaClientError {
    MediaLibError(MediaLibError),
    UnknownError(String),
}

impl From<MediaLibError> for MediaClientError {
    fn from(error: MediaLibError) -> Self {
        MediaClientError::MediaLibError(error)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for MediaClientError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        MediaClientError::UnknownError(error.to_string())
    }
}

impl std::fmt::Display for MediaClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaClientError::MediaLibError(e) => write!(f, "{}", e),
            MediaClientError::UnknownError(s) => write!(f, "Unknown error: {}", s),
        }
    }
}

impl std::error::Error for MediaClientError {}

/// Entry points of a loaded `vadec-lib`. The library stays loaded for as long
/// as the client lives; decoders must be dropped before it.
pub struct MediaClient {
    new_frame_decoder: NewFrameDecoderFn,
    probe_profiles: ProbeProfilesFn,
    init_logging: extern "C" fn(),
    _library: libloading::Library,
}

impl MediaClient {
    pub fn new_frame_decoder(
        &self,
        path: &str,
        options: MediaFrameDecoderOptions,
    ) -> Result<FrameDecoderBox, MediaClientError> {
        (self.new_frame_decoder)(path.into(), options)
            .match_owned(Ok, |e| Err(MediaClientError::MediaLibError(e)))
    }

    /// Lists the decode profiles the driver behind `device` exposes. An empty
    /// `device` selects the default render node.
    pub fn probe_profiles(&self, device: &str) -> Result<Vec<ProfileSupport>, MediaClientError> {
        (self.probe_profiles)(device.into()).match_owned(
            |profiles| Ok(profiles.iter().cloned().collect()),
            |e| Err(MediaClientError::MediaLibError(e)),
        )
    }

    /// Installs the library's logger, configured through `RUST_LOG`.
    pub fn init_logging(&self) {
        (self.init_logging)();
    }
}

pub fn load(lib: &Path) -> Result<MediaClient, MediaClientError> {
    let library = unsafe { libloading::Library::new(lib) }
        .map_err(|e| MediaClientError::UnknownError(e.to_string()))?;

    let init_media_lib = unsafe {
        library
            .get_stabbied::<extern "C" fn() -> stabby::result::Result<MediaLibInit, MediaLibError>>(
                b"init_media_lib",
            )
    }?;
    init_media_lib().match_owned(|_| Ok(()), |e| Err(MediaClientError::MediaLibError(e)))?;

    let new_frame_decoder =
        *unsafe { library.get_stabbied::<NewFrameDecoderFn>(b"new_frame_decoder") }?;
    let probe_profiles = *unsafe { library.get_stabbied::<ProbeProfilesFn>(b"probe_profiles") }?;
    let init_logging = *unsafe { library.get_stabbied::<extern "C" fn()>(b"init_logging") }?;

    Ok(MediaClient {
        new_frame_decoder,
        probe_profiles,
        init_logging,
        _library: library,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vadec_types::{ErrorKind, MediaFrameDecoderDyn, MediaFrameDecoderDynMut, VideoFrameDyn};

    #[test]
    fn missing_library_is_reported() {
        let err = load(Path::new("/nonexistent/libvadec_lib.so"))
            .err()
            .expect("load should fail");
        assert!(matches!(err, MediaClientError::UnknownError(_)));
    }

    #[test]
    fn library_errors_display_their_kind() {
        let err = MediaClientError::from(MediaLibError::Busy("surface".into()));
        assert_eq!(err.to_string(), "busy: surface");
    }

    #[test]
    #[ignore = "needs the vadec-lib cdylib in target/debug"]
    fn it_can_load_lib() {
        let lib = test::get_vadec_lib();
        let client = load(&lib).unwrap();
        client.init_logging();

        let err = client
            .probe_profiles("/nonexistent/renderD999")
            .err()
            .expect("probing a missing node should fail");
        println!("probe failed as expected: {}", err);
    }

    #[test]
    #[ignore = "needs the vadec-lib cdylib built with ffmpeg, libva and a render node"]
    fn it_can_decode() {
        let lib = test::get_vadec_lib();
        let client = load(&lib).unwrap();
        let test_movie = test::get_test_data_file("test.mp4");

        let options = MediaFrameDecoderOptions {
            scratch_surfaces: 4,
            device: "".into(),
        };
        let mut decoder = client
            .new_frame_decoder(test_movie.to_str().unwrap(), options)
            .unwrap();

        let first_frame = decoder.get_frame();
        assert!(first_frame.is_some(), "No frames found in the test video");
        let first_frame = first_frame.unwrap().unwrap();
        assert!(first_frame.get_width() > 0 && first_frame.get_height() > 0);
        assert!(decoder.get_pool_stats().in_use >= 1);
        drop(first_frame);

        let mut frames = 1;
        loop {
            let frame = decoder.get_frame();
            if frame.is_none() {
                break;
            }
            frame.unwrap().match_owned(
                |_| frames += 1,
                |e| assert_eq!(e.kind(), ErrorKind::Decode, "{}", e),
            );
        }
        println!("decoded {} frames", frames);
        decoder.close();
    }
}
