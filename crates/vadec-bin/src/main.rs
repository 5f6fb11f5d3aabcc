use clap::{Parser, Subcommand};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::ExitCode;
use vadec_client::vadec_types::{
    ErrorKind, MediaFrameDecoderDyn, MediaFrameDecoderDynMut, MediaFrameDecoderOptions, PoolStats,
    VideoFrameDyn,
};
use vadec_client::{load, MediaClient, MediaClientError};

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Decode a file and print the surface behind every frame.
    Decode {
        input: String,
        /// DRM render node; defaults to /dev/dri/renderD128.
        #[arg(long, default_value = "")]
        device: String,
        /// Surfaces allocated on top of the stream's reference frames.
        #[arg(long, default_value_t = 4)]
        scratch: u32,
        /// Stop after this many frames.
        #[arg(long)]
        limit: Option<usize>,
        /// Keep this many frames alive before handing them back, like a renderer would.
        #[arg(long, default_value_t = 0)]
        hold: usize,
    },
    /// List the decode profiles the driver exposes.
    Probe {
        #[arg(long, default_value = "")]
        device: String,
    },
}

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn print_stats(label: &str, stats: &PoolStats) {
    println!(
        "{}: {} surfaces, {} free, {} in use (generation {})",
        label, stats.capacity, stats.free, stats.in_use, stats.generation
    );
}

fn decode(
    client: &MediaClient,
    input: &str,
    options: MediaFrameDecoderOptions,
    limit: Option<usize>,
    hold: usize,
) -> Result<(), MediaClientError> {
    let mut decoder = client.new_frame_decoder(input, options)?;
    let mut held = VecDeque::with_capacity(hold);
    let mut count = 0;
    let mut failures = 0;

    loop {
        if limit.is_some_and(|limit| count >= limit) {
            break;
        }
        let Some(frame) = decoder.get_frame().match_owned(Some, || None) else {
            break;
        };
        let frame = match frame.match_owned(Ok, Err) {
            Ok(frame) => frame,
            Err(e) if e.kind() == ErrorKind::Decode => {
                println!("frame skipped: {}", e);
                failures += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if count == 0 {
            decoder.get_info().match_owned(
                |info| {
                    println!(
                        "{} profile {} ({}x{})",
                        info.codec_name, info.profile, info.width, info.height
                    )
                },
                || println!("stream info unavailable"),
            );
        }

        let crop = frame.get_crop_rect().match_owned(
            |rect| format!("{}x{}+{}+{}", rect.width, rect.height, rect.x, rect.y),
            || "none".to_string(),
        );
        println!(
            "frame {}: surface {:#x} {}x{} crop {} pts {}{}",
            count,
            frame.get_surface_id(),
            frame.get_width(),
            frame.get_height(),
            crop,
            frame.get_pts(),
            if frame.get_interlaced_frame() != 0 {
                if frame.get_top_field_first() != 0 {
                    " interlaced tff"
                } else {
                    " interlaced bff"
                }
            } else {
                ""
            }
        );
        count += 1;

        if hold > 0 {
            if held.len() == hold {
                held.pop_front();
            }
            held.push_back(frame);
        }
    }

    print_stats("pool", &decoder.get_pool_stats());
    held.clear();
    print_stats("pool after release", &decoder.get_pool_stats());
    decoder.close();
    println!("{} frames decoded, {} skipped", count, failures);
    Ok(())
}

fn probe(client: &MediaClient, device: &str) -> Result<(), MediaClientError> {
    let profiles = client.probe_profiles(device)?;
    for profile in profiles {
        println!(
            "{:<24} {:>3}  {}",
            profile.name,
            profile.raw_profile,
            if profile.decode { "decode" } else { "-" }
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    use std::env;

    let lib_name = if cfg!(target_os = "macos") {
        "libvadec_lib.dylib"
    } else {
        "libvadec_lib.so"
    };

    let default_lib_path = PathBuf::from("./target/debug").join(lib_name);
    let lib_path = env::var("VADEC_LIB_PATH")
        .map(PathBuf::from)
        .unwrap_or(default_lib_path);

    let cli = Cli::parse();
    let client = match load(&lib_path) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("could not load {}: {}", lib_path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    client.init_logging();

    let result = match cli.command {
        Command::Decode {
            input,
            device,
            scratch,
            limit,
            hold,
        } => {
            let options = MediaFrameDecoderOptions {
                scratch_surfaces: scratch,
                device: device.as_str().into(),
            };
            decode(&client, &input, options, limit, hold)
        }
        Command::Probe { device } => probe(&client, &device),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
