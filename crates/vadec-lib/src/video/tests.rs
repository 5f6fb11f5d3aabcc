use super::callbacks::codec_from_id;
use super::FfmpegEngine;
use crate::profile::Codec;
use crate::session::{DecodeSession, FrameStatus, SessionConfig};
use crate::va::VaDriver;
use ffmpeg_next::ffi::AVCodecID;
use std::path::PathBuf;

#[test]
fn codec_ids_map_to_hardware_codecs() {
    assert_eq!(codec_from_id(AVCodecID::AV_CODEC_ID_H264), Some(Codec::H264));
    assert_eq!(codec_from_id(AVCodecID::AV_CODEC_ID_WMV3), Some(Codec::Vc1));
    assert_eq!(codec_from_id(AVCodecID::AV_CODEC_ID_HEVC), Some(Codec::Hevc));
    assert_eq!(codec_from_id(AVCodecID::AV_CODEC_ID_AV1), None);
}

#[test]
#[ignore = "needs libva, a DRM render node and data/test.mp4"]
fn test_decode_video() {
    ffmpeg_next::init().expect("ffmpeg init");
    ffmpeg_next::log::set_level(ffmpeg_next::log::Level::Debug);
    let test_video_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/test.mp4");

    let driver = VaDriver::open("").expect("Failed to open VA display");
    let engine = FfmpegEngine::open(&test_video_path, driver.display().handle())
        .expect("Failed to create decoder");
    let mut session = DecodeSession::new(driver, engine, SessionConfig::default());

    let mut frame_count = 0;
    let mut held = Vec::new();
    loop {
        match session.get_next_frame() {
            Ok(FrameStatus::Frame(frame)) => {
                frame_count += 1;
                assert_ne!(frame.surface_id(), crate::surface::INVALID_SURFACE_ID);
                // Keep a couple of frames around like a renderer would.
                held.push(frame);
                if held.len() > 2 {
                    session.release_frame(held.remove(0)).expect("own frame");
                }
            }
            Ok(FrameStatus::Retry) => continue,
            Ok(FrameStatus::EndOfStream) => break,
            Err(e) => panic!("Failed to decode frame: {}", e),
        }
    }

    assert!(frame_count > 0, "No frames were decoded");
    let stats = session.stats();
    assert!(stats.in_use as usize >= held.len());
    println!("Successfully decoded {} frames", frame_count);
}
