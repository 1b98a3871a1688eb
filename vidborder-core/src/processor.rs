use std::path::{Path, PathBuf};

use tempfile::{Builder as TempFileBuilder, NamedTempFile};

use crate::compositor::composite_frame;
use crate::config::RunConfig;
use crate::error::{BorderError, Result};
use crate::ffmpeg_wrapper::{FrameRate, VideoInfo, check_ffmpeg, get_video_info, merge_audio};
use crate::frame_io::{FFmpegReader, FFmpegWriter, FrameSink, FrameSource};
use crate::geometry::{Geometry, compute_geometry};
use crate::progress::FrameProgress;
use crate::tools::{ToolConfig, ToolPaths, resolve_tools};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub geometry: Geometry,
    pub frames: u64,
    pub audio_merged: bool,
}

/// Composite every frame from `source` into `sink`, in order.
///
/// Returns the number of frames written, which always equals the number read.
/// The sink is not finished here; the caller owns that step.
pub fn process_frames<S, K>(
    source: &mut S,
    sink: &mut K,
    geometry: &Geometry,
    progress: &mut FrameProgress,
) -> Result<u64>
where
    S: FrameSource,
    K: FrameSink,
{
    let mut frames = 0;
    while let Some(frame) = source.next_frame()? {
        let output = composite_frame(&frame, geometry)?;
        sink.write_frame(&output)?;
        frames += 1;
        progress.frame_done();
    }
    Ok(frames)
}

pub struct BorderProcessor {
    config: RunConfig,
}

impl BorderProcessor {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            config: RunConfig::new(input.as_ref(), output.as_ref()),
        }
    }

    pub fn from_config(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn border(mut self, percentage: f64) -> Self {
        self.config.border_percentage = percentage;
        self
    }

    pub fn keep_audio(mut self, enabled: bool) -> Self {
        self.config.keep_audio = enabled;
        self
    }

    pub fn codec(mut self, codec: &str) -> Self {
        self.config.codec = codec.to_string();
        self
    }

    pub fn tools(mut self, tools: ToolConfig) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn progress_interval(mut self, frames: u64) -> Self {
        self.config.progress_interval = frames;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the whole pipeline: validate, probe, composite, and optionally
    /// merge the original audio back in.
    pub fn process(&self) -> Result<ProcessReport> {
        let config = &self.config;
        config.validate()?;

        let tools = resolve_tools(&config.tools)?;
        let ffmpeg_version = check_ffmpeg(&tools.ffmpeg)?;
        log::info!("Using FFmpeg version: {}", ffmpeg_version);

        log::info!("Analyzing input video...");
        let info = get_video_info(&tools.ffprobe, &config.input_path)?;
        let (width, height) = info.display_dimensions();
        let geometry = compute_geometry(width, height, config.border_percentage)?;

        let fps = info.fps.unwrap_or_else(|| {
            log::warn!(
                "Could not detect FPS, using default {} FPS",
                FrameRate::FALLBACK.as_f64()
            );
            FrameRate::FALLBACK
        });

        log_summary(&geometry, &fps, &info);
        prepare_output_dir(&config.output_path)?;

        // Intermediates are removed on drop, whichever way this function exits.
        // The output path itself is only written by the final persist.
        let video_only = create_temp_video(&config.output_path)?;
        let frames = self.render(&tools, &info, &geometry, &fps, video_only.path())?;
        log::info!(
            "Video processing complete! Temporary output saved to: {:?}",
            video_only.path()
        );
        log::info!("Total frames processed: {}", frames);

        if config.keep_audio && !info.has_audio {
            log::warn!("Input has no audio stream; keeping the video-only output");
        }

        let audio_merged = config.keep_audio && info.has_audio;
        let finished = if audio_merged {
            let muxed = create_temp_video(&config.output_path)?;
            merge_audio(
                &tools.ffmpeg,
                video_only.path(),
                &config.input_path,
                muxed.path(),
            )?;
            muxed
        } else {
            video_only
        };

        persist_output(finished, &config.output_path)?;
        if audio_merged {
            log::info!("Final video with audio saved to: {:?}", config.output_path);
        } else {
            log::info!("Video saved to: {:?}", config.output_path);
        }

        Ok(ProcessReport {
            geometry,
            frames,
            audio_merged,
        })
    }

    fn render(
        &self,
        tools: &ToolPaths,
        info: &VideoInfo,
        geometry: &Geometry,
        fps: &FrameRate,
        destination: &Path,
    ) -> Result<u64> {
        let (width, height) = (geometry.source_width, geometry.source_height);
        let mut reader = FFmpegReader::spawn(&tools.ffmpeg, &self.config.input_path, width, height)?;
        let mut writer =
            FFmpegWriter::spawn(&tools.ffmpeg, destination, width, height, fps, &self.config.codec)?;

        let mut progress = FrameProgress::new(info.frame_count, self.config.progress_interval);
        let frames = process_frames(&mut reader, &mut writer, geometry, &mut progress)?;
        writer.finish()?;
        progress.finish();

        Ok(frames)
    }
}

fn log_summary(geometry: &Geometry, fps: &FrameRate, info: &VideoInfo) {
    let (border_x, border_y) = geometry.border_pixels();
    let (ratio_x, ratio_y) = geometry.border_ratio();

    log::info!("Border percentage: {}%", geometry.border_percentage);
    log::info!("Original: {}x{}", geometry.source_width, geometry.source_height);
    if info.rotation != 0 {
        log::info!("Rotation: {}°", info.rotation);
    }
    log::info!(
        "Resized video: {}x{}",
        geometry.target_width,
        geometry.target_height
    );
    log::info!("Position: ({}, {})", geometry.x_offset, geometry.y_offset);
    log::info!("Top/Bottom borders: ~{}px each ({:.1}%)", border_y, ratio_y);
    log::info!("Left/Right borders: ~{}px each ({:.1}%)", border_x, ratio_x);
    log::info!("FPS: {:.2} ({})", fps.as_f64(), fps);
}

fn prepare_output_dir(output: &Path) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| BorderError::OutputWrite {
            path: output.to_path_buf(),
            reason: format!("failed to create output directory: {e}"),
        })?;
    }
    Ok(())
}

/// Move a finished intermediate onto the output path.
fn persist_output(file: NamedTempFile, output: &Path) -> Result<()> {
    file.persist(output)
        .map(|_| ())
        .map_err(|e| BorderError::OutputWrite {
            path: output.to_path_buf(),
            reason: e.error.to_string(),
        })
}

/// Scoped intermediate next to the final output, created with the same
/// permissions a freshly written file would get.
fn create_temp_video(output: &Path) -> Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    let prefix = format!("{stem}.");
    let suffix = format!(".temp.{extension}");

    let mut builder = TempFileBuilder::new();
    builder.prefix(&prefix).suffix(&suffix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Passed as the open(2) mode, so the umask still applies.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    builder
        .tempfile_in(&dir)
        .map_err(|e| BorderError::OutputWrite {
            path: output.to_path_buf(),
            reason: format!("failed to create temporary file: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use image::Rgb;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    struct VecSource(VecDeque<Frame>);

    impl FrameSource for VecSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.0.pop_front())
        }
    }

    #[derive(Default)]
    struct VecSink {
        frames: Vec<Frame>,
        fail_after: Option<usize>,
    }

    impl FrameSink for VecSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            if self.fail_after == Some(self.frames.len()) {
                return Err(BorderError::FrameProcessing("sink full".to_string()));
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn finish(self) -> Result<()> {
            Ok(())
        }
    }

    fn numbered_frames(count: u8, width: u32, height: u32) -> VecDeque<Frame> {
        (0..count)
            .map(|i| Frame::from_pixel(width, height, Rgb([i, i, i])))
            .collect()
    }

    #[test]
    fn preserves_frame_count_and_order() {
        let geometry = compute_geometry(32, 18, 10.0).unwrap();
        let mut source = VecSource(numbered_frames(75, 32, 18));
        let mut sink = VecSink::default();
        let mut progress = FrameProgress::hidden(Some(75), 30);

        let frames = process_frames(&mut source, &mut sink, &geometry, &mut progress).unwrap();

        assert_eq!(frames, 75);
        assert_eq!(sink.frames.len(), 75);
        assert_eq!(progress.frames(), 75);
        let center = (16, 9);
        for (i, frame) in sink.frames.iter().enumerate() {
            assert_eq!(frame.dimensions(), (32, 18));
            assert_eq!(frame.get_pixel(center.0, center.1).0, [i as u8; 3]);
            assert_eq!(frame.get_pixel(0, 0).0, [0; 3]);
        }
    }

    #[test]
    fn empty_stream_writes_nothing() {
        let geometry = compute_geometry(8, 8, 5.0).unwrap();
        let mut source = VecSource(VecDeque::new());
        let mut sink = VecSink::default();
        let mut progress = FrameProgress::hidden(None, 30);

        let frames = process_frames(&mut source, &mut sink, &geometry, &mut progress).unwrap();
        assert_eq!(frames, 0);
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn sink_failure_aborts_the_loop() {
        let geometry = compute_geometry(8, 8, 5.0).unwrap();
        let mut source = VecSource(numbered_frames(10, 8, 8));
        let mut sink = VecSink {
            fail_after: Some(4),
            ..VecSink::default()
        };
        let mut progress = FrameProgress::hidden(None, 30);

        let err = process_frames(&mut source, &mut sink, &geometry, &mut progress).unwrap_err();
        assert!(matches!(err, BorderError::FrameProcessing(_)));
        assert_eq!(sink.frames.len(), 4);
        // The failing frame was read but never written.
        assert_eq!(source.0.len(), 5);
    }

    #[test]
    fn mismatched_frame_is_a_processing_error() {
        let geometry = compute_geometry(8, 8, 5.0).unwrap();
        let mut source = VecSource(numbered_frames(1, 4, 4));
        let mut sink = VecSink::default();
        let mut progress = FrameProgress::hidden(None, 30);

        let err = process_frames(&mut source, &mut sink, &geometry, &mut progress).unwrap_err();
        assert!(matches!(err, BorderError::FrameProcessing(_)));
    }

    #[test]
    fn temp_video_lives_next_to_output_and_is_removed_on_drop() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("final.mkv");

        let temp = create_temp_video(&output).unwrap();
        let path = temp.path().to_path_buf();
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("final."));
        assert!(name.ends_with(".temp.mkv"));
        assert!(path.exists());

        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("nested/deeper/out.mp4");
        prepare_output_dir(&output).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        assert!(!output.exists());
    }

    #[test]
    fn persisted_output_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        std::fs::write(&output, b"stale").unwrap();

        let temp = create_temp_video(&output).unwrap();
        std::fs::write(temp.path(), b"fresh").unwrap();
        persist_output(temp, &output).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"fresh");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.mp4")]);
    }

    #[cfg(unix)]
    #[test]
    fn temp_video_has_regular_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let reference = dir.path().join("reference.bin");
        std::fs::write(&reference, b"").unwrap();
        let expected = std::fs::metadata(&reference).unwrap().permissions().mode() & 0o777;

        let temp = create_temp_video(&dir.path().join("out.mp4")).unwrap();
        let mode = std::fs::metadata(temp.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, expected);
    }

    #[test]
    fn invalid_border_fails_before_touching_anything() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("sub/out.mp4");
        let err = BorderProcessor::new("/definitely/missing.mp4", &output)
            .border(60.0)
            .process()
            .unwrap_err();
        assert!(matches!(err, BorderError::Configuration(_)));
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let err = BorderProcessor::new(dir.path().join("nope.mp4"), &output)
            .process()
            .unwrap_err();
        assert!(matches!(err, BorderError::InputNotFound(_)));
        assert!(!output.exists());
    }

    #[test]
    fn builder_sets_configuration() {
        let processor = BorderProcessor::new("in.mp4", "out.mp4")
            .border(12.5)
            .keep_audio(false)
            .codec("h264")
            .progress_interval(10);
        let config = processor.config();
        assert_eq!(config.border_percentage, 12.5);
        assert!(!config.keep_audio);
        assert_eq!(config.codec, "h264");
        assert_eq!(config.progress_interval, 10);
    }
}
