//! Global quit signal.
//!
//! Any number of producers (Ctrl-C, the detail panel, tests) send on a
//! channel; the scanner loop polls it without blocking. Once observed the
//! signal stays raised.

use anyhow::{Context, Result};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

pub struct QuitSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
    raised: bool,
}

/// Cloneable sender side of a [`QuitSignal`].
#[derive(Clone, Debug)]
pub struct QuitHandle {
    tx: Sender<()>,
}

impl QuitHandle {
    pub fn request(&self) {
        // The loop may already be gone; nothing left to stop then.
        let _ = self.tx.send(());
    }
}

impl QuitSignal {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            raised: false,
        }
    }

    pub fn handle(&self) -> QuitHandle {
        QuitHandle {
            tx: self.tx.clone(),
        }
    }

    /// Routes Ctrl-C into this signal. Only one handler may exist per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let handle = self.handle();
        ctrlc::set_handler(move || handle.request()).context("error setting Ctrl-C handler")
    }

    /// True once any producer has requested quit.
    pub fn poll(&mut self) -> bool {
        if !self.raised {
            match self.rx.try_recv() {
                Ok(()) => self.raised = true,
                Err(TryRecvError::Empty) => {}
                // Unreachable while `self.tx` is alive.
                Err(TryRecvError::Disconnected) => self.raised = true,
            }
        }
        self.raised
    }
}

impl Default for QuitSignal {
    fn default() -> Self {
        Self::new()
    }
}
