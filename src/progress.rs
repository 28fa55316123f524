//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a comparison runs in the background
#[derive(Debug)]
pub struct ProgressReporter {
    pub spinner: Option<ProgressBar>,
    start_time: std::time::Instant,
}

impl ProgressReporter {
    /// Create progress reporter for a comparison
    pub fn new_for_comparison(strategy: &str) -> Self {
        Self {
            spinner: Some(create_spinner(&format!("Comparing with {}...", strategy))),
            start_time: std::time::Instant::now(),
        }
    }

    /// Create minimal progress reporter (no spinner)
    pub fn new_minimal() -> Self {
        Self {
            spinner: None,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Update the spinner message without finishing
    pub fn update(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(message.to_string());
        }
    }

    /// Finish and clear the spinner
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} [{elapsed}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
