//! Streaming frames in and out of FFmpeg child processes.
//!
//! Both ends own their child process. Dropping a reader or writer that was
//! not driven to completion kills and reaps the child, so every exit path
//! from the frame loop releases the handles.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::thread::JoinHandle;

use crate::error::{BorderError, Result};
use crate::ffmpeg_wrapper::{FFmpegCommand, FrameRate, collect_stderr, drain_stderr, encoder_name};
use crate::frame::{Frame, frame_from_raw, frame_len};

/// Anything that yields decoded frames in presentation order.
pub trait FrameSource {
    /// Next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Anything that accepts frames in order and can be finalised.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

/// Decodes the first video stream of a file into rgb24 frames.
pub struct FFmpegReader {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    input: PathBuf,
    width: u32,
    height: u32,
    done: bool,
}

impl FFmpegReader {
    pub fn spawn(ffmpeg: &Path, input: &Path, width: u32, height: u32) -> Result<Self> {
        let mut cmd = FFmpegCommand::new(ffmpeg)
            .log_level("error")
            .input(input)
            .map("0:v:0")
            .raw_video_output()
            .build();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("Executing FFmpeg decoder: {:?}", cmd);

        let unreadable = |reason: String| BorderError::InputUnreadable {
            path: input.to_path_buf(),
            reason,
        };

        let mut child = cmd
            .spawn()
            .map_err(|e| unreadable(format!("failed to start decoder: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| unreadable("failed to capture decoder stdout".to_string()))?;
        let stderr = child.stderr.take().map(drain_stderr);

        Ok(Self {
            child,
            stdout,
            stderr,
            input: input.to_path_buf(),
            width,
            height,
            done: false,
        })
    }

    fn unreadable(&self, reason: String) -> BorderError {
        BorderError::InputUnreadable {
            path: self.input.clone(),
            reason,
        }
    }

    fn finish_decoder(&mut self) -> Result<()> {
        self.done = true;
        let status = self.child.wait()?;
        let stderr = collect_stderr(self.stderr.take());
        if !status.success() {
            return Err(self.unreadable(format!("decoder exited with {status}: {stderr}")));
        }
        Ok(())
    }

    /// Stops a decoder whose pipe failed and reports what it printed.
    fn abort_decoder(&mut self, reason: String) -> BorderError {
        self.done = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
        let stderr = collect_stderr(self.stderr.take());
        if stderr.is_empty() {
            self.unreadable(reason)
        } else {
            self.unreadable(format!("{reason}: {stderr}"))
        }
    }
}

impl FrameSource for FFmpegReader {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.done {
            return Ok(None);
        }

        let len = frame_len(self.width, self.height);
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.abort_decoder(format!("reading frame failed: {e}"))),
            }
        }

        if filled == 0 {
            self.finish_decoder()?;
            return Ok(None);
        }
        if filled < len {
            self.finish_decoder()?;
            return Err(self.unreadable(format!(
                "stream ended mid-frame ({filled} of {len} bytes)"
            )));
        }

        frame_from_raw(self.width, self.height, buf).map(Some)
    }
}

impl Drop for FFmpegReader {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Encodes rgb24 frames into a video-only file.
pub struct FFmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    output: PathBuf,
    width: u32,
    height: u32,
    finished: bool,
}

impl FFmpegWriter {
    pub fn spawn(
        ffmpeg: &Path,
        output: &Path,
        width: u32,
        height: u32,
        fps: &FrameRate,
        codec: &str,
    ) -> Result<Self> {
        let mut cmd = FFmpegCommand::new(ffmpeg)
            .overwrite()
            .log_level("error")
            .raw_video_input(width, height, fps)
            .no_audio()
            .video_codec(encoder_name(codec))
            .custom_args(&["-pix_fmt", "yuv420p"])
            .output(output)
            .build();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        log::debug!("Executing FFmpeg encoder: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| BorderError::OutputWrite {
            path: output.to_path_buf(),
            reason: format!("failed to start encoder: {e}"),
        })?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(drain_stderr);

        Ok(Self {
            child,
            stdin,
            stderr,
            output: output.to_path_buf(),
            width,
            height,
            finished: false,
        })
    }
}

impl FrameSink for FFmpegWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(BorderError::FrameProcessing(format!(
                "encoder expects {}x{} frames, got {}x{}",
                self.width,
                self.height,
                frame.width(),
                frame.height()
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| BorderError::FrameProcessing("encoder input closed".to_string()))?;
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            // A broken pipe means the encoder already quit; its exit status
            // and stderr say why.
            self.finished = true;
            drop(self.stdin.take());
            let status = self.child.wait()?;
            let stderr = collect_stderr(self.stderr.take());
            log::error!("FFmpeg failed with output:\n{}", stderr);
            return Err(BorderError::FrameProcessing(format!(
                "encoder stopped accepting frames for {} ({e}, exited with {status}): {stderr}",
                self.output.display()
            )));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.finished = true;
        // Closing stdin signals end of stream to the encoder.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let stderr = collect_stderr(self.stderr.take());
        if !status.success() {
            log::error!("FFmpeg failed with output:\n{}", stderr);
            return Err(BorderError::FrameProcessing(format!(
                "encoder exited with {status} while writing {}: {stderr}",
                self.output.display()
            )));
        }
        Ok(())
    }
}

impl Drop for FFmpegWriter {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
