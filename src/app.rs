//! The scanner loop.
//!
//! One thread drives everything: read a frame, classify it, feed the
//! confirmation machine, render the overlay. A confirmation hands control to
//! the inventory handler and the loop polls until the handler resumes it.
//! Quit is honoured in both phases, and the camera and preview are released
//! exactly once on every exit path.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::config::ScannerConfig;
use crate::confirm::{Confirmation, ConfirmationMachine, DetectionPolicy, Sample, Step};
use crate::detail::{resume_channel, InventoryHandler, ResumeState};
use crate::detect::Classifier;
use crate::fault::Fault;
use crate::ingest::Camera;
use crate::overlay::{Overlay, Preview};
use crate::quit::QuitSignal;

#[derive(Clone, Debug)]
pub struct ScannerOptions {
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// Tick of the paused loop.
    pub poll_interval: Duration,
    /// Frame cadence; `0` reads as fast as the classifier allows.
    pub target_fps: u32,
}

impl ScannerOptions {
    pub fn from_config(config: &ScannerConfig, max_frames: Option<u64>) -> Self {
        Self {
            max_frames,
            poll_interval: config.poll_interval,
            target_fps: config.camera.target_fps,
        }
    }

    fn frame_period(&self) -> Option<Duration> {
        (self.target_fps > 0).then(|| Duration::from_secs(1) / self.target_fps)
    }
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            poll_interval: Duration::from_millis(10),
            target_fps: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    FrameLimit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub confirmations: u64,
    pub stop: StopReason,
}

enum PauseOutcome {
    Resumed,
    Quit,
}

pub struct Scanner<C, K, H, P> {
    camera: C,
    classifier: K,
    handler: H,
    preview: P,
    machine: ConfirmationMachine,
    quit: QuitSignal,
    options: ScannerOptions,
}

impl<C, K, H, P> Scanner<C, K, H, P>
where
    C: Camera,
    K: Classifier,
    H: InventoryHandler,
    P: Preview,
{
    pub fn new(
        camera: C,
        classifier: K,
        handler: H,
        preview: P,
        policy: DetectionPolicy,
        quit: QuitSignal,
        options: ScannerOptions,
    ) -> Self {
        Self {
            camera,
            classifier,
            handler,
            preview,
            machine: ConfirmationMachine::new(policy),
            quit,
            options,
        }
    }

    pub fn machine(&self) -> &ConfirmationMachine {
        &self.machine
    }

    /// Runs until quit, the frame limit, or a fatal error.
    ///
    /// Acquisition failures carry [`Fault::Acquisition`], classifier failures
    /// [`Fault::Inference`]. The camera is released before this returns.
    pub fn run(&mut self) -> Result<RunSummary> {
        let Self {
            camera,
            classifier,
            handler,
            preview,
            machine,
            quit,
            options,
        } = self;

        log::info!("Scanner: opening {}", camera.describe());
        let mut guard = ReleaseGuard {
            camera,
            preview,
            released: false,
        };
        guard
            .camera
            .open()
            .with_context(|| format!("failed to open {}", guard.camera.describe()))
            .context(Fault::Acquisition)?;
        classifier
            .warm_up()
            .with_context(|| format!("{} warm-up failed", classifier.name()))
            .context(Fault::Inference)?;

        let result = scan(&mut guard, classifier, handler, machine, quit, options);
        guard.release();
        match &result {
            Ok(summary) => log::info!(
                "Scanner: stopped ({:?}) after {} frames, {} confirmations",
                summary.stop,
                summary.frames,
                summary.confirmations
            ),
            Err(err) => log::error!("Scanner: aborted: {:#}", err),
        }
        result
    }
}

fn scan<C, K, H, P>(
    guard: &mut ReleaseGuard<'_, C, P>,
    classifier: &mut K,
    handler: &mut H,
    machine: &mut ConfirmationMachine,
    quit: &mut QuitSignal,
    options: &ScannerOptions,
) -> Result<RunSummary>
where
    C: Camera,
    K: Classifier,
    H: InventoryHandler,
    P: Preview,
{
    let period = options.frame_period();
    let mut frames = 0u64;
    let mut confirmations = 0u64;

    let stop = loop {
        if quit.poll() {
            break StopReason::Quit;
        }
        if options.max_frames.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }

        let tick = Instant::now();
        let frame = guard.camera.read().context(Fault::Acquisition)?;
        frames += 1;
        let prediction = classifier
            .predict(&frame)
            .with_context(|| format!("{} failed on frame #{}", classifier.name(), frame.seq))
            .context(Fault::Inference)?;

        let step = machine.observe(&Sample::new(
            prediction.label.clone(),
            prediction.confidence,
        ));
        let overlay = Overlay::new(&prediction, machine.policy(), machine.streak());
        guard.preview.render(&frame, &overlay).context(Fault::Display)?;

        if let Step::Confirmed(confirmation) = step {
            confirmations += 1;
            log::info!(
                "Scanner: confirmed {} ({:.2}) on frame #{}",
                confirmation.label,
                confirmation.confidence,
                frame.seq
            );
            guard.preview.paused(&confirmation);
            match wait_for_operator(&confirmation, handler, quit, options.poll_interval)? {
                PauseOutcome::Resumed => {
                    machine.resume();
                    log::info!("Scanner: resumed");
                }
                PauseOutcome::Quit => break StopReason::Quit,
            }
            continue;
        }

        if let Some(period) = period {
            let elapsed = tick.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
    };

    Ok(RunSummary {
        frames,
        confirmations,
        stop,
    })
}

fn wait_for_operator<H: InventoryHandler>(
    confirmation: &Confirmation,
    handler: &mut H,
    quit: &mut QuitSignal,
    poll_interval: Duration,
) -> Result<PauseOutcome> {
    let (handle, waiter) = resume_channel();
    if let Err(err) = handler.show(confirmation, handle) {
        // The handle went down with the failed call; the waiter sees it dropped.
        log::error!("Scanner: inventory handler failed: {:#}", err);
    }

    loop {
        if quit.poll() {
            return Ok(PauseOutcome::Quit);
        }
        handler.pump().context(Fault::Inventory)?;
        if quit.poll() {
            return Ok(PauseOutcome::Quit);
        }
        match waiter.poll() {
            ResumeState::Resumed => return Ok(PauseOutcome::Resumed),
            ResumeState::Dropped => {
                log::warn!(
                    "Scanner: handler released {} without resuming; resuming",
                    confirmation.label
                );
                return Ok(PauseOutcome::Resumed);
            }
            ResumeState::Pending => std::thread::sleep(poll_interval),
        }
    }
}

/// Releases the camera and closes the preview once, on any exit path.
struct ReleaseGuard<'a, C: Camera, P: Preview> {
    camera: &'a mut C,
    preview: &'a mut P,
    released: bool,
}

impl<C: Camera, P: Preview> ReleaseGuard<'_, C, P> {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.camera.release() {
            log::warn!("Scanner: camera release failed: {:#}", err);
        }
        self.preview.close();
    }
}

impl<C: Camera, P: Preview> Drop for ReleaseGuard<'_, C, P> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_period_follows_fps() {
        let mut options = ScannerOptions::default();
        assert_eq!(options.frame_period(), None);
        options.target_fps = 20;
        assert_eq!(options.frame_period(), Some(Duration::from_millis(50)));
    }
}
