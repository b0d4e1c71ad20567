//! Detection confirmation.
//!
//! Turns the per-frame classification stream into discrete, debounced
//! confirmation events. A label must be reported by `confirm_frames`
//! consecutive frames, each at or above the confidence threshold, before
//! it is confirmed. After a confirmation the machine pauses and drops every
//! sample until `resume()` is called; only one detection episode can be
//! open at a time.
//!
//! The machine has no clock and no I/O. The application loop owns it and
//! is the only caller, so the single-flight property follows from control
//! flow alone.

use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

use crate::fault::Fault;

/// One classified frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub label: String,
    pub confidence: f32,
}

impl Sample {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A debounced detection, ready for an inventory action.
#[derive(Clone, Debug, PartialEq)]
pub struct Confirmation {
    pub label: String,
    /// Confidence of the frame that completed the streak.
    pub confidence: f32,
}

/// Consecutive-label tracker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreakState {
    pub last_label: Option<String>,
    pub count: u32,
}

impl StreakState {
    fn reset(&mut self) {
        self.last_label = None;
        self.count = 0;
    }
}

/// Thresholds and label sets the machine decides with.
#[derive(Clone, Debug)]
pub struct DetectionPolicy {
    threshold: f32,
    confirm_frames: u32,
    no_object_class: String,
    valid_classes: BTreeSet<String>,
}

impl DetectionPolicy {
    pub fn new<I, S>(
        threshold: f32,
        confirm_frames: u32,
        no_object_class: impl Into<String>,
        valid_classes: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let no_object_class = no_object_class.into();
        let valid_classes: BTreeSet<String> = valid_classes.into_iter().map(Into::into).collect();

        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(policy_error(format!(
                "threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if confirm_frames == 0 {
            return Err(policy_error("confirm_frames must be >= 1".to_string()));
        }
        if no_object_class.trim().is_empty() {
            return Err(policy_error("no_object_class must not be empty".to_string()));
        }
        if valid_classes.is_empty() {
            return Err(policy_error("at least one valid class is required".to_string()));
        }
        if valid_classes.contains(&no_object_class) {
            return Err(policy_error(format!(
                "no_object_class '{}' cannot also be a valid class",
                no_object_class
            )));
        }

        Ok(Self {
            threshold,
            confirm_frames,
            no_object_class,
            valid_classes,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn confirm_frames(&self) -> u32 {
        self.confirm_frames
    }

    pub fn no_object_class(&self) -> &str {
        &self.no_object_class
    }

    pub fn valid_classes(&self) -> &BTreeSet<String> {
        &self.valid_classes
    }

    /// True when a sample may extend a streak: a valid class at or above
    /// the threshold.
    pub fn qualifies(&self, label: &str, confidence: f32) -> bool {
        self.valid_classes.contains(label) && confidence >= self.threshold
    }
}

fn policy_error(msg: String) -> anyhow::Error {
    anyhow!(msg).context(Fault::Configuration)
}

/// Outcome of feeding one sample.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// The machine is paused; the sample was dropped.
    Ignored,
    /// Streak cleared (no-object sentinel, invalid label or low confidence).
    Reset,
    /// Streak extended or restarted, not yet confirmed.
    Counting { label: String, count: u32 },
    /// Streak reached `confirm_frames`; the machine is now paused.
    Confirmed(Confirmation),
}

#[derive(Clone, Debug, PartialEq)]
enum Mode {
    Reading,
    Paused(Confirmation),
}

#[derive(Clone, Debug)]
pub struct ConfirmationMachine {
    policy: DetectionPolicy,
    streak: StreakState,
    mode: Mode,
}

impl ConfirmationMachine {
    pub fn new(policy: DetectionPolicy) -> Self {
        Self {
            policy,
            streak: StreakState::default(),
            mode: Mode::Reading,
        }
    }

    pub fn policy(&self) -> &DetectionPolicy {
        &self.policy
    }

    pub fn streak(&self) -> &StreakState {
        &self.streak
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.mode, Mode::Paused(_))
    }

    /// The confirmation that paused the machine, if any.
    pub fn pending(&self) -> Option<&Confirmation> {
        match &self.mode {
            Mode::Paused(confirmation) => Some(confirmation),
            Mode::Reading => None,
        }
    }

    pub fn observe(&mut self, sample: &Sample) -> Step {
        if self.is_paused() {
            return Step::Ignored;
        }

        if sample.label == self.policy.no_object_class
            || !self.policy.qualifies(&sample.label, sample.confidence)
        {
            self.streak.reset();
            return Step::Reset;
        }

        if self.streak.last_label.as_deref() == Some(sample.label.as_str()) {
            self.streak.count = self.streak.count.saturating_add(1);
        } else {
            self.streak.last_label = Some(sample.label.clone());
            self.streak.count = 1;
        }

        if self.streak.count >= self.policy.confirm_frames {
            let confirmation = Confirmation {
                label: sample.label.clone(),
                confidence: sample.confidence,
            };
            self.mode = Mode::Paused(confirmation.clone());
            return Step::Confirmed(confirmation);
        }

        Step::Counting {
            label: sample.label.clone(),
            count: self.streak.count,
        }
    }

    /// Leaves the paused state and forgets all streak history.
    ///
    /// Returns the confirmation that was pending, or `None` when the machine
    /// was already reading.
    pub fn resume(&mut self) -> Option<Confirmation> {
        self.streak.reset();
        match std::mem::replace(&mut self.mode, Mode::Reading) {
            Mode::Paused(confirmation) => Some(confirmation),
            Mode::Reading => None,
        }
    }
}

impl PartialEq for ConfirmationMachine {
    fn eq(&self, other: &Self) -> bool {
        self.streak == other.streak && self.mode == other.mode
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
