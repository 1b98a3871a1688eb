use indicatif::{ProgressBar, ProgressStyle};

/// How often a status line is logged, in frames.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 30;

/// Frame-counting progress: a status line every `interval` frames plus a
/// progress bar when stderr is a terminal.
pub struct FrameProgress {
    bar: ProgressBar,
    total: Option<u64>,
    interval: u64,
    frames: u64,
}

impl FrameProgress {
    pub fn new(total: Option<u64>, interval: u64) -> Self {
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames {msg}",
                    )
                    .map(|style| style.progress_chars("#>-"))
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        Self::with_bar(bar, total, interval)
    }

    /// Status lines only, no bar.
    pub fn hidden(total: Option<u64>, interval: u64) -> Self {
        Self::with_bar(ProgressBar::hidden(), total, interval)
    }

    fn with_bar(bar: ProgressBar, total: Option<u64>, interval: u64) -> Self {
        Self {
            bar,
            total,
            interval: interval.max(1),
            frames: 0,
        }
    }

    /// Record one written frame.
    pub fn frame_done(&mut self) {
        self.frames += 1;
        self.bar.inc(1);
        if self.frames % self.interval == 0 {
            let line = status_line(self.frames, self.total);
            self.bar.suspend(|| log::info!("{}", line));
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// `Processed N frames... (P%)`, with P at 0 when the total is unknown.
pub fn status_line(frames: u64, total: Option<u64>) -> String {
    let progress = match total {
        Some(total) if total > 0 => frames as f64 / total as f64 * 100.0,
        _ => 0.0,
    };
    format!("Processed {frames} frames... ({progress:.1}%)")
}
