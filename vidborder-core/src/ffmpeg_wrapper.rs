use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread::{self, JoinHandle};

use crate::error::{BorderError, Result};

static VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ffmpeg version (\S+)").expect("valid version regex"));

/// FFmpeg command builder with fluent interface
#[derive(Debug, Clone)]
pub struct FFmpegCommand {
    program: PathBuf,
    overwrite: bool,
    log_level: Option<String>,
    inputs: Vec<Vec<String>>,
    maps: Vec<String>,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    drop_audio: bool,
    output_args: Vec<String>,
    output: Option<String>,
}

impl FFmpegCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            overwrite: false,
            log_level: None,
            inputs: Vec::new(),
            maps: Vec::new(),
            video_codec: None,
            audio_codec: None,
            drop_audio: false,
            output_args: Vec::new(),
            output: None,
        }
    }

    /// Enable overwrite without asking
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Set the `-v` log level
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = Some(level.to_string());
        self
    }

    /// Add a file input
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs
            .push(vec!["-i".to_string(), path_arg(path.as_ref())]);
        self
    }

    /// Add a raw rgb24 input read from stdin
    pub fn raw_video_input(mut self, width: u32, height: u32, fps: &FrameRate) -> Self {
        self.inputs.push(vec![
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-s".to_string(),
            format!("{width}x{height}"),
            "-r".to_string(),
            fps.to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
        ]);
        self
    }

    /// Select a stream for the output (`-map`)
    pub fn map(mut self, spec: &str) -> Self {
        self.maps.push(spec.to_string());
        self
    }

    /// Set video codec
    pub fn video_codec(mut self, codec: &str) -> Self {
        self.video_codec = Some(codec.to_string());
        self
    }

    /// Set audio codec
    pub fn audio_codec(mut self, codec: &str) -> Self {
        self.audio_codec = Some(codec.to_string());
        self
    }

    /// Drop all audio from the output
    pub fn no_audio(mut self) -> Self {
        self.drop_audio = true;
        self
    }

    /// Add custom output arguments
    pub fn custom_args(mut self, args: &[&str]) -> Self {
        self.output_args
            .extend(args.iter().map(|arg| arg.to_string()));
        self
    }

    /// Write to a file
    pub fn output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path_arg(path.as_ref()));
        self
    }

    /// Emit raw rgb24 frames on stdout
    pub fn raw_video_output(mut self) -> Self {
        self.output_args.extend(
            ["-f", "rawvideo", "-pix_fmt", "rgb24"]
                .iter()
                .map(|arg| arg.to_string()),
        );
        self.output = Some("pipe:1".to_string());
        self
    }

    /// Build the FFmpeg command
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);

        // Global options
        if self.overwrite {
            cmd.arg("-y");
        }
        if let Some(ref level) = self.log_level {
            cmd.args(["-v", level.as_str()]);
        }

        for input in &self.inputs {
            cmd.args(input);
        }

        if self.drop_audio {
            cmd.arg("-an");
        }

        if let Some(ref codec) = self.video_codec {
            cmd.args(["-c:v", codec.as_str()]);
        }

        if let Some(ref codec) = self.audio_codec {
            cmd.args(["-c:a", codec.as_str()]);
        }

        for spec in &self.maps {
            cmd.args(["-map", spec.as_str()]);
        }

        for arg in &self.output_args {
            cmd.arg(arg);
        }

        if let Some(ref output) = self.output {
            cmd.arg(output);
        }

        cmd
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Map a user-facing codec name to the FFmpeg encoder.
pub fn encoder_name(codec: &str) -> &str {
    match codec {
        "mp4v" => "mpeg4",
        "h264" => "libx264",
        "h265" | "hevc" => "libx265",
        "vp9" => "libvpx-vp9",
        "av1" => "libaom-av1",
        other => other,
    }
}

/// Drain a child's stderr on a background thread so it never blocks the pipe.
pub(crate) fn drain_stderr<R>(stderr: R) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stderr);
        let mut all_output = String::new();
        for line in reader.lines().map_while(std::result::Result::ok) {
            log::debug!("ffmpeg: {}", line);
            all_output.push_str(&line);
            all_output.push('\n');
        }
        all_output
    })
}

/// Join a stderr drain thread, tolerating a panicked reader.
pub(crate) fn collect_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
        .trim_end()
        .to_string()
}

/// Check if FFmpeg is available and return version info
pub fn check_ffmpeg(ffmpeg: impl AsRef<Path>) -> Result<String> {
    let ffmpeg = ffmpeg.as_ref();
    let output = Command::new(ffmpeg)
        .arg("-version")
        .output()
        .map_err(|_| BorderError::EncoderNotFound(ffmpeg.display().to_string()))?;

    let version = String::from_utf8_lossy(&output.stdout);
    Ok(parse_version(&version))
}

fn parse_version(text: &str) -> String {
    VERSION_REGEX
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Exact stream frame rate, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Used when the container does not report a usable rate.
    pub const FALLBACK: FrameRate = FrameRate { num: 30, den: 1 };

    /// Parse ffprobe's `num/den` notation; zero rates are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let (num, den): (u32, u32) = match text.split_once('/') {
            Some((num, den)) => (num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => (text.trim().parse().ok()?, 1),
        };
        (num > 0 && den > 0).then_some(FrameRate { num, den })
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<FrameRate>,
    pub frame_count: Option<u64>,
    pub duration: Option<f64>,
    pub rotation: i32,
    pub has_audio: bool,
}

impl VideoInfo {
    /// Dimensions of decoded frames; FFmpeg applies the rotation metadata
    /// while decoding, so quarter turns swap the axes.
    pub fn display_dimensions(&self) -> (u32, u32) {
        if self.rotation.rem_euclid(180) == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Get video metadata using ffprobe
pub fn get_video_info(ffprobe: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<VideoInfo> {
    let path = path.as_ref();
    let output = Command::new(ffprobe.as_ref())
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| BorderError::InputUnreadable {
            path: path.to_path_buf(),
            reason: format!("failed to run ffprobe: {e}"),
        })?;

    if !output.status.success() {
        return Err(BorderError::InputUnreadable {
            path: path.to_path_buf(),
            reason: "ffprobe could not parse the file. Check that it is a valid video."
                .to_string(),
        });
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout), path)
}

/// Turn ffprobe's JSON report into a [`VideoInfo`] for the first video stream.
pub fn parse_probe_output(json: &str, path: &Path) -> Result<VideoInfo> {
    let unreadable = |reason: String| BorderError::InputUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| unreadable(format!("invalid ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| unreadable("no video stream found".to_string()))?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let fps = video
        .r_frame_rate
        .as_deref()
        .and_then(FrameRate::parse)
        .or_else(|| video.avg_frame_rate.as_deref().and_then(FrameRate::parse));

    let duration = video
        .duration
        .as_deref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0);

    let frame_count = video
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| match (duration, fps) {
            (Some(d), Some(r)) => Some((d * r.as_f64()).round() as u64),
            _ => None,
        });

    let rotation = video
        .side_data_list
        .iter()
        .find_map(|s| s.rotation)
        .or_else(|| video.tags.rotate.as_deref().and_then(|r| r.parse().ok()))
        .unwrap_or(0);

    Ok(VideoInfo {
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps,
        frame_count,
        duration,
        rotation,
        has_audio,
    })
}

/// Build the command that muxes the bordered video with the original audio,
/// re-encoding audio to AAC and copying the video stream untouched.
pub fn build_merge_command(
    ffmpeg: impl AsRef<Path>,
    video_no_audio: impl AsRef<Path>,
    original: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Command {
    FFmpegCommand::new(ffmpeg)
        .overwrite()
        .input(video_no_audio)
        .input(original)
        .video_codec("copy")
        .audio_codec("aac")
        .map("0:v:0")
        .map("1:a:0")
        .custom_args(&["-strict", "experimental"])
        .output(output)
        .build()
}

/// Run the audio merge, surfacing FFmpeg's diagnostics on failure.
pub fn merge_audio(
    ffmpeg: impl AsRef<Path>,
    video_no_audio: impl AsRef<Path>,
    original: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<()> {
    let mut cmd = build_merge_command(ffmpeg, video_no_audio, original, output);
    cmd.stdin(Stdio::null());

    log::info!("Merging audio with video...");
    log::debug!("Executing FFmpeg command: {:?}", cmd);

    let result = cmd.output().map_err(|e| BorderError::AudioMerge {
        status: "not started".to_string(),
        stderr: e.to_string(),
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).trim_end().to_string();
        log::error!("FFmpeg failed with output:\n{}", stderr);
        return Err(BorderError::AudioMerge {
            status: result
                .status
                .code()
                .map(|c| format!("exit code {c}"))
                .unwrap_or_else(|| "terminated by signal".to_string()),
            stderr,
        });
    }

    Ok(())
}
