//! Per-frame status overlay.

use anyhow::Result;

use crate::confirm::{Confirmation, DetectionPolicy, StreakState};
use crate::detect::Prediction;
use crate::frame::Frame;

/// Overlay color class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Valid class at or above threshold (green).
    Qualifying,
    /// Anything else (amber).
    Other,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub text: String,
    pub tone: Tone,
    pub label: String,
    /// Current streak and the length needed to confirm.
    pub streak: Option<(u32, u32)>,
}

impl Overlay {
    pub fn new(prediction: &Prediction, policy: &DetectionPolicy, streak: &StreakState) -> Self {
        let tone = if policy.qualifies(&prediction.label, prediction.confidence) {
            Tone::Qualifying
        } else {
            Tone::Other
        };
        let streak = match streak.last_label.as_deref() {
            Some(label) if label == prediction.label && streak.count > 0 => {
                Some((streak.count, policy.confirm_frames()))
            }
            _ => None,
        };
        Self {
            text: format!("{} ({:.2})", prediction.label, prediction.confidence),
            tone,
            label: prediction.label.clone(),
            streak,
        }
    }
}

/// Live view of what the scanner sees.
pub trait Preview {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()>;

    /// Called once when a confirmation pauses the scanner.
    fn paused(&mut self, _confirmation: &Confirmation) {}

    /// Tear down whatever the preview owns. Called exactly once.
    fn close(&mut self) {}
}

impl<P: Preview + ?Sized> Preview for Box<P> {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        (**self).render(frame, overlay)
    }

    fn paused(&mut self, confirmation: &Confirmation) {
        (**self).paused(confirmation)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Preview that shows nothing.
#[derive(Default)]
pub struct NullPreview;

impl Preview for NullPreview {
    fn render(&mut self, _frame: &Frame, _overlay: &Overlay) -> Result<()> {
        Ok(())
    }
}
