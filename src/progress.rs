use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) | {msg}";

/// Progress tracker for a batch of frames
pub struct FrameProgressTracker {
    progress_bar: ProgressBar,
    start_time: Instant,
    total_frames: u64,
    processed_frames: u64,
}

impl FrameProgressTracker {
    /// Creates a new progress tracker for a known number of frames
    pub fn new(total_frames: u64, operation_name: &str) -> Self {
        let progress_bar = ProgressBar::new(total_frames);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        progress_bar.set_message(format!("Processing {}", operation_name));

        Self {
            progress_bar,
            start_time: Instant::now(),
            total_frames,
            processed_frames: 0,
        }
    }

    /// Creates a tracker that draws nothing, for tests and non-interactive runs
    pub fn hidden(total_frames: u64) -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
            start_time: Instant::now(),
            total_frames,
            processed_frames: 0,
        }
    }

    /// Updates the progress by one frame
    pub fn update_frame(&mut self) {
        self.processed_frames += 1;
        self.progress_bar.inc(1);

        let msg = self.get_progress_message();
        self.progress_bar.set_message(msg);
    }

    /// Prints a line above the bar without tearing it
    pub fn println<I: AsRef<str>>(&self, line: I) {
        if self.progress_bar.is_hidden() {
            eprintln!("{}", line.as_ref());
        } else {
            self.progress_bar.println(line);
        }
    }

    fn get_progress_message(&self) -> String {
        if self.processed_frames == 0 {
            return "Starting...".to_string();
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.processed_frames as f64 / elapsed
        } else {
            0.0
        };
        let remaining = self.total_frames.saturating_sub(self.processed_frames);
        let eta = if fps > 0.0 {
            format_duration(remaining as f64 / fps)
        } else {
            "Calculating...".to_string()
        };

        format!("Speed: {:.1} frames/s | ETA: {}", fps, eta)
    }

    /// Finishes the progress bar
    pub fn finish(&self) {
        let total_time = self.start_time.elapsed();
        let message = format!(
            "Completed! Frames: {} | Processing: {}",
            self.processed_frames,
            format_duration(total_time.as_secs_f64())
        );
        self.progress_bar.finish_with_message(message);
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }
}

/// Formats a duration in seconds to h:mm:ss format
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
