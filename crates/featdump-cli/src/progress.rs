use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

/// Running count of records written by an extraction
pub struct ExtractProgress {
    spinner: ProgressBar,
    layer: String,
}

impl ExtractProgress {
    pub fn new(layer: &str) -> Self {
        Self {
            spinner: create_spinner(&format!("Extracting {}...", layer)),
            layer: layer.to_string(),
        }
    }

    pub fn update(&self, written: u64) {
        if written % 100 == 0 {
            self.spinner
                .set_message(format!("Extracting {}: {} records written", self.layer, written));
        }
    }

    pub fn finish(&self, written: u64, resumed: bool) {
        let verb = if resumed { "Resumed and wrote" } else { "Wrote" };
        finish_success(&self.spinner, &format!("{} {} records", verb, written));
    }

    pub fn fail(&self) {
        finish_error(&self.spinner, &format!("Extraction of {} stopped", self.layer));
    }
}
