use anyhow::{anyhow, bail, Context, Result};
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use super::{InventoryHandler, ResumeHandle};
use crate::confirm::Confirmation;
use crate::fault::Fault;
use crate::inventory::{ComponentCatalog, InventoryStore};
use crate::quit::QuitHandle;

const HELP: &str = "[+] add one  [-] remove one  [add N]  [info]  [enter] back  [q] quit";

/// One line of operator input on the detail panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelCommand {
    Adjust(i64),
    Info,
    Resume,
    Quit,
}

impl PanelCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim().to_ascii_lowercase();
        let mut parts = line.split_whitespace();
        let command = match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) | (Some("r"), None, _) | (Some("back"), None, _) => Self::Resume,
            (Some("+") | Some("+1"), None, _) => Self::Adjust(1),
            (Some("-") | Some("-1"), None, _) => Self::Adjust(-1),
            (Some("info"), None, _) => Self::Info,
            (Some("q") | Some("quit"), None, _) => Self::Quit,
            (Some("add"), Some(n), None) => {
                let n: u32 = n
                    .parse()
                    .map_err(|_| anyhow!("add expects a positive integer, got '{}'", n))?;
                if n == 0 {
                    bail!("add expects a positive integer, got 0");
                }
                Self::Adjust(i64::from(n))
            }
            _ => bail!("unknown command '{}'", line),
        };
        Ok(command)
    }
}

/// Reads stdin lines on a helper thread. The channel closes at EOF.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

struct OpenPanel {
    label: String,
    component: String,
    confidence: f32,
    resume: ResumeHandle,
}

/// Interactive detail panel on a terminal.
pub struct TerminalDetailView {
    store: Box<dyn InventoryStore>,
    catalog: ComponentCatalog,
    lines: Receiver<String>,
    out: Box<dyn Write>,
    quit: QuitHandle,
    panel: Option<OpenPanel>,
}

impl TerminalDetailView {
    pub fn new(
        store: Box<dyn InventoryStore>,
        catalog: ComponentCatalog,
        lines: Receiver<String>,
        out: Box<dyn Write>,
        quit: QuitHandle,
    ) -> Self {
        Self {
            store,
            catalog,
            lines,
            out,
            quit,
            panel: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.panel.is_some()
    }

    fn print_panel(&mut self) -> Result<()> {
        let Some(panel) = &self.panel else {
            return Ok(());
        };
        let qty = self
            .store
            .read_qty(&panel.component)
            .with_context(|| format!("failed to read stock of {}", panel.component))
            .context(Fault::Inventory)?;
        writeln!(
            self.out,
            "== {} ({:.0}%) ==",
            panel.label,
            panel.confidence * 100.0
        )?;
        writeln!(self.out, "stock [{}]: {}", panel.component, qty)?;
        if let Some(info) = self.catalog.info(&panel.label) {
            if let Some(image) = &info.image {
                writeln!(self.out, "image: {}", image.display())?;
            }
            if let Some(datasheet) = &info.datasheet {
                writeln!(self.out, "datasheet: {}", datasheet)?;
            }
        }
        writeln!(self.out, "{}", HELP)?;
        self.out.flush()?;
        Ok(())
    }

    fn apply(&mut self, command: PanelCommand) -> Result<()> {
        match command {
            PanelCommand::Adjust(delta) => {
                let Some(panel) = &self.panel else {
                    return Ok(());
                };
                match self.store.adjust_qty(&panel.component, delta) {
                    Ok(qty) => {
                        log::info!("TerminalDetailView: {} {:+} -> {}", panel.component, delta, qty);
                        writeln!(self.out, "stock [{}]: {}", panel.component, qty)?;
                    }
                    Err(err) => writeln!(self.out, "inventory error: {:#}", err)?,
                }
            }
            PanelCommand::Info => {
                if let Err(err) = self.print_panel() {
                    writeln!(self.out, "inventory error: {:#}", err)?;
                }
            }
            PanelCommand::Resume => {
                if let Some(panel) = self.panel.take() {
                    writeln!(self.out, "back to scanning")?;
                    panel.resume.resume();
                }
            }
            PanelCommand::Quit => {
                writeln!(self.out, "quitting")?;
                self.quit.request();
                self.panel = None;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

impl InventoryHandler for TerminalDetailView {
    fn show(&mut self, confirmation: &Confirmation, resume: ResumeHandle) -> Result<()> {
        // Input typed while scanning is not meant for this panel.
        while self.lines.try_recv().is_ok() {}

        self.panel = Some(OpenPanel {
            label: confirmation.label.clone(),
            component: self.catalog.store_name(&confirmation.label).to_string(),
            confidence: confirmation.confidence,
            resume,
        });
        if let Err(err) = self.print_panel() {
            // Closing the panel drops the handle; the scanner resumes.
            self.panel = None;
            return Err(err);
        }
        Ok(())
    }

    fn pump(&mut self) -> Result<()> {
        while self.panel.is_some() {
            let line = match self.lines.try_recv() {
                Ok(line) => line,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("TerminalDetailView: operator input closed, quitting");
                    self.quit.request();
                    self.panel = None;
                    break;
                }
            };
            match PanelCommand::parse(&line) {
                Ok(command) => self.apply(command)?,
                Err(err) => {
                    writeln!(self.out, "{}", err)?;
                    writeln!(self.out, "{}", HELP)?;
                    self.out.flush()?;
                }
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
