use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::confirm::Confirmation;
use crate::frame::Frame;
use crate::overlay::{Overlay, Preview, Tone};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    /// Timed startup stage; reports completion when dropped.
    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live status line for the scanner loop.
    pub fn status_preview(&self) -> StatusPreview {
        StatusPreview {
            pretty: self.use_pretty(),
            spinner: None,
            last: None,
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

/// Preview that renders the overlay as a terminal status line.
///
/// Pretty mode keeps a spinner whose color follows the overlay tone. Plain
/// mode logs only when the label or tone changes.
pub struct StatusPreview {
    pretty: bool,
    spinner: Option<ProgressBar>,
    last: Option<(String, Tone)>,
}

impl StatusPreview {
    fn spinner(&mut self) -> &ProgressBar {
        self.spinner.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        })
    }
}

impl Preview for StatusPreview {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        let key = (overlay.label.clone(), overlay.tone);
        let changed = self.last.as_ref() != Some(&key);
        let streak = overlay
            .streak
            .map(|(count, needed)| format!("  streak {}/{}", count, needed))
            .unwrap_or_default();

        if self.pretty {
            let tone = overlay.tone;
            let spinner = self.spinner();
            if changed {
                let template = match tone {
                    Tone::Qualifying => "{spinner:.green} {msg:.green}",
                    Tone::Other => "{spinner:.yellow} {msg:.yellow}",
                };
                let style = ProgressStyle::with_template(template)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                spinner.set_style(style);
            }
            spinner.set_message(format!("#{} {}{}", frame.seq, overlay.text, streak));
        } else if changed {
            log::info!("frame #{}: {}{}", frame.seq, overlay.text, streak);
        }

        self.last = Some(key);
        Ok(())
    }

    fn paused(&mut self, confirmation: &Confirmation) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.last = None;
        log::info!(
            "confirmed {} ({:.0}%), waiting for operator",
            confirmation.label,
            confirmation.confidence * 100.0
        );
    }

    fn close(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_never_uses_spinners() {
        assert!(!Ui::from_args(Some("plain"), true).use_pretty());
        assert!(!Ui::from_args(Some("pretty"), false).use_pretty());
        assert!(Ui::from_args(None, true).use_pretty());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
