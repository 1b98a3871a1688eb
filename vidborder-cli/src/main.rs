use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use vidborder_core::config::{DEFAULT_BORDER_PERCENTAGE, DEFAULT_CODEC};
use vidborder_core::progress::DEFAULT_PROGRESS_INTERVAL;
use vidborder_core::tools::DEFAULT_CACHE_DIR;
use vidborder_core::{BorderError, BorderProcessor, ToolConfig};

#[derive(Parser, Debug)]
#[command(name = "vidborder")]
#[command(about = "Add black borders to a video, keeping its aspect ratio and audio")]
#[command(version)]
struct Args {
    /// Input video file path
    input_video: PathBuf,

    /// Output video file path (parent directories are created)
    output_video: PathBuf,

    /// Border percentage on each edge, in [0, 50)
    #[arg(short, long, default_value_t = DEFAULT_BORDER_PERCENTAGE, allow_negative_numbers = true)]
    border: f64,

    /// Skip re-attaching the original audio track
    #[arg(long)]
    no_audio: bool,

    /// Video codec for output (mp4v, h264, h265, vp9, av1 or an FFmpeg encoder name)
    #[arg(long, default_value = DEFAULT_CODEC)]
    codec: String,

    /// Path to the ffmpeg binary (default: search PATH, then the cache directory)
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary (default: next to ffmpeg, PATH, cache directory)
    #[arg(long, value_name = "PATH")]
    ffprobe: Option<PathBuf>,

    /// Directory holding locally installed FFmpeg binaries
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    ffmpeg_cache_dir: PathBuf,

    /// Log a status line every N frames
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    progress_interval: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    log::info!("Input: {:?}", args.input_video);
    log::info!("Output: {:?}", args.output_video);

    let processor = BorderProcessor::new(&args.input_video, &args.output_video)
        .border(args.border)
        .keep_audio(!args.no_audio)
        .codec(&args.codec)
        .progress_interval(args.progress_interval)
        .tools(ToolConfig {
            ffmpeg: args.ffmpeg,
            ffprobe: args.ffprobe,
            cache_dir: args.ffmpeg_cache_dir,
        });

    let report = match processor.process() {
        Ok(report) => report,
        Err(e @ BorderError::EncoderNotFound(_)) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Installation instructions:");
            eprintln!("  Ubuntu/Debian: sudo apt install ffmpeg");
            eprintln!("  macOS:         brew install ffmpeg");
            eprintln!("  Windows:       Download from https://ffmpeg.org/download.html");
            eprintln!("                 and place ffmpeg.exe/ffprobe.exe in {DEFAULT_CACHE_DIR}/");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to add borders to {:?}", args.input_video)
            });
        }
    };

    println!(
        "\nProcessed {} frames ({}x{} content inside {}x{})",
        report.frames,
        report.geometry.target_width,
        report.geometry.target_height,
        report.geometry.source_width,
        report.geometry.source_height
    );
    if report.audio_merged {
        println!("Original audio re-attached");
    }
    println!("Output saved to: {:?}", args.output_video);

    Ok(())
}
