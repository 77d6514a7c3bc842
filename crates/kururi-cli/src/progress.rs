use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use kururi_checkpoint::DownloadObserver;

use crate::ui;

pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Byte counter for a transfer of known size.
    #[must_use]
    pub fn bytes(total: u64, message: &str) -> Self {
        if !ui::prefs().progress {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{wide_bar:.cyan/blue} {bytes}/{total_bytes} {percent}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(message.to_string());
        Self { bar: Some(bar) }
    }

    /// Spinner with a running byte count, for transfers without `Content-Length`.
    #[must_use]
    pub fn byte_spinner(message: &str) -> Self {
        if !ui::prefs().progress {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        Self { bar: Some(bar) }
    }

    pub fn set_position(&self, position: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(position);
        }
    }

    pub fn finish_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn finish_err(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }
}

const PERCENT_STEP: u64 = 10;

/// Renders checkpoint download progress on stderr.
///
/// Terminals get a live bar. Otherwise a plain line is printed each time
/// another 10% of a sized download has arrived.
pub struct DownloadReporter {
    name: String,
    progress: Option<Progress>,
    last_percent: Option<u64>,
}

impl DownloadReporter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            progress: None,
            last_percent: None,
        }
    }
}

/// Percentage to announce after `downloaded` of `total` bytes, if a new
/// step boundary has been crossed since `last`.
#[allow(clippy::cast_possible_truncation)]
fn percent_notice(last: Option<u64>, downloaded: u64, total: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    let percent = (u128::from(downloaded.min(total)) * 100 / u128::from(total)) as u64;
    let step = percent / PERCENT_STEP;
    match last {
        Some(last) if last / PERCENT_STEP >= step => None,
        _ => Some(percent),
    }
}

impl DownloadObserver for DownloadReporter {
    fn connecting(&mut self, url: &str) {
        if ui::prefs().notices {
            eprintln!("checkpoint not found. downloading from {url}");
        }
    }

    fn started(&mut self, _url: &str, total: Option<u64>) {
        self.progress = Some(match total {
            Some(total) => Progress::bytes(total, &self.name),
            None => Progress::byte_spinner(&self.name),
        });
    }

    fn advanced(&mut self, downloaded: u64, total: Option<u64>) {
        if let Some(progress) = &self.progress {
            progress.set_position(downloaded);
        }

        let prefs = ui::prefs();
        if !prefs.notices || prefs.progress {
            return;
        }
        let Some(total) = total else {
            return;
        };
        if let Some(percent) = percent_notice(self.last_percent, downloaded, total) {
            self.last_percent = Some(percent);
            eprintln!(
                "downloading {}: {percent}% ({downloaded}/{total} bytes)",
                self.name
            );
        }
    }

    fn finished(&mut self, downloaded: u64) {
        if let Some(progress) = self.progress.take() {
            progress.finish_clear();
        }
        let prefs = ui::prefs();
        if prefs.notices && !prefs.progress {
            eprintln!("downloaded {} ({downloaded} bytes)", self.name);
        }
    }

    fn failed(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.finish_err("download failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn percent_notices_follow_step_boundaries() {
        let total = 1_000;
        let mut last = None;
        let mut announced = Vec::new();
        for downloaded in (0..=total).step_by(37).chain([total]) {
            if let Some(percent) = percent_notice(last, downloaded, total) {
                last = Some(percent);
                announced.push(percent);
            }
        }

        assert_eq!(announced.first(), Some(&0));
        assert_eq!(announced.last(), Some(&100));
        assert_eq!(announced.len(), 11);
        assert!(announced.windows(2).all(|w| w[1] / PERCENT_STEP > w[0] / PERCENT_STEP));
    }

    #[test]
    fn unknown_or_empty_totals_are_silent() {
        assert_eq!(percent_notice(None, 0, 0), None);
        assert_eq!(percent_notice(Some(100), 5_000, 5_000), None);
    }
}
