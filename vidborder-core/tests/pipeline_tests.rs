// vidborder-core/tests/pipeline_tests.rs

use std::collections::VecDeque;
use std::path::Path;
use std::process::{Command, Stdio};

use image::Rgb;
use tempfile::tempdir;
use vidborder_core::{
    BorderError, BorderProcessor, Frame, FrameProgress, FrameSink, FrameSource, Result,
    ToolConfig, compute_geometry, get_video_info, process_frames, resolve_tools,
};

struct Frames(VecDeque<Frame>);

impl FrameSource for Frames {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.0.pop_front())
    }
}

#[derive(Default)]
struct Collected(Vec<Frame>);

impl FrameSink for Collected {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.0.push(frame.clone());
        Ok(())
    }

    fn finish(self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn full_hd_landscape_scenario() {
    let g = compute_geometry(1920, 1080, 5.0).unwrap();
    assert_eq!(
        (g.target_width, g.target_height, g.x_offset, g.y_offset),
        (1728, 972, 96, 54)
    );
}

#[test]
fn full_hd_portrait_scenario() {
    let g = compute_geometry(1080, 1920, 10.0).unwrap();
    assert_eq!(
        (g.target_width, g.target_height, g.x_offset, g.y_offset),
        (864, 1536, 108, 192)
    );
}

#[test]
fn white_frames_through_the_loop() {
    let geometry = compute_geometry(96, 54, 5.0).unwrap();
    let white = Frame::from_pixel(96, 54, Rgb([255, 255, 255]));
    let mut source = Frames(std::iter::repeat_n(white, 45).collect());
    let mut sink = Collected::default();
    let mut progress = FrameProgress::hidden(Some(45), 30);

    let written = process_frames(&mut source, &mut sink, &geometry, &mut progress).unwrap();
    assert_eq!(written, 45);
    assert_eq!(sink.0.len(), 45);

    for frame in &sink.0 {
        for (x, y, px) in frame.enumerate_pixels() {
            let expected = if geometry.contains(x, y) { 255 } else { 0 };
            assert_eq!(px.0, [expected; 3], "pixel ({x}, {y})");
        }
    }
    sink.finish().unwrap();
}

fn ffmpeg_available() -> bool {
    resolve_tools(&ToolConfig::default()).is_ok()
}

fn make_test_video(path: &Path) -> bool {
    Command::new("ffmpeg")
        .args([
            "-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=size=160x90:rate=30", "-f",
            "lavfi", "-i", "sine=frequency=440:sample_rate=44100", "-t", "1", "-c:v",
            "mpeg4", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[test]
fn end_to_end_with_ffmpeg_when_available() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempdir().unwrap();
    let input = dir.path().join("input.mp4");
    if !make_test_video(&input) {
        eprintln!("skipping: could not synthesise a test clip");
        return;
    }
    let output = dir.path().join("nested/output.mp4");

    let report = BorderProcessor::new(&input, &output)
        .border(10.0)
        .process()
        .unwrap();

    assert_eq!(report.frames, 30);
    assert!(report.audio_merged);
    assert_eq!(
        (report.geometry.target_width, report.geometry.target_height),
        (128, 72)
    );

    let tools = resolve_tools(&ToolConfig::default()).unwrap();
    let info = get_video_info(&tools.ffprobe, &output).unwrap();
    assert_eq!((info.width, info.height), (160, 90));
    assert!(info.has_audio);

    // Only the final file remains; the video-only intermediate is gone.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("output.mp4")]);
}

#[test]
fn corrupt_input_is_unreadable_when_ffmpeg_available() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempdir().unwrap();
    let input = dir.path().join("garbage.mp4");
    std::fs::write(&input, b"this is not a video file").unwrap();
    let output = dir.path().join("out.mp4");

    let err = BorderProcessor::new(&input, &output).process().unwrap_err();
    assert!(matches!(err, BorderError::InputUnreadable { .. }));
    assert!(!output.exists());
}
