use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal bar fed by provider `Progress(current, total)` events.
pub struct DownloadBar {
    pb: ProgressBar,
}

impl DownloadBar {
    pub fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
        );
        Ok(Self { pb })
    }

    pub fn update(&self, current: u64, total: u64) {
        if total > 0 && self.pb.length() != Some(total) {
            self.pb.set_length(total);
        }
        self.pb.set_position(current);
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}
