//! Inventory action handlers.
//!
//! A handler is shown once per confirmation and receives a [`ResumeHandle`].
//! The scanner stays paused until that handle is used (or dropped).

mod auto;
mod terminal;

use anyhow::Result;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::confirm::Confirmation;

pub use auto::AutoAdjust;
pub use terminal::{spawn_stdin_reader, PanelCommand, TerminalDetailView};

pub trait InventoryHandler {
    /// Present the confirmed component. `resume` must be used once the
    /// operator is done.
    fn show(&mut self, confirmation: &Confirmation, resume: ResumeHandle) -> Result<()>;

    /// Process pending operator input. Called every poll tick while paused.
    fn pump(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<H: InventoryHandler + ?Sized> InventoryHandler for Box<H> {
    fn show(&mut self, confirmation: &Confirmation, resume: ResumeHandle) -> Result<()> {
        (**self).show(confirmation, resume)
    }

    fn pump(&mut self) -> Result<()> {
        (**self).pump()
    }
}

/// One-shot resume callback. Consuming it makes a second resume impossible.
#[derive(Debug)]
pub struct ResumeHandle {
    tx: Sender<()>,
}

impl ResumeHandle {
    pub fn resume(self) {
        let _ = self.tx.send(());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResumeState {
    Pending,
    Resumed,
    /// The handle was dropped without resuming.
    Dropped,
}

/// Scanner side of a [`ResumeHandle`].
#[derive(Debug)]
pub struct ResumeWaiter {
    rx: Receiver<()>,
}

impl ResumeWaiter {
    pub fn poll(&self) -> ResumeState {
        match self.rx.try_recv() {
            Ok(()) => ResumeState::Resumed,
            Err(TryRecvError::Empty) => ResumeState::Pending,
            Err(TryRecvError::Disconnected) => ResumeState::Dropped,
        }
    }
}

pub fn resume_channel() -> (ResumeHandle, ResumeWaiter) {
    let (tx, rx) = mpsc::channel();
    (ResumeHandle { tx }, ResumeWaiter { rx })
}
