use anyhow::{Context, Result};

use super::{InventoryHandler, ResumeHandle};
use crate::confirm::Confirmation;
use crate::fault::Fault;
use crate::inventory::{ComponentCatalog, InventoryStore};

/// Headless handler: books `delta` units per confirmation and resumes at once.
pub struct AutoAdjust {
    store: Box<dyn InventoryStore>,
    catalog: ComponentCatalog,
    delta: i64,
}

impl AutoAdjust {
    pub fn new(store: Box<dyn InventoryStore>, catalog: ComponentCatalog, delta: i64) -> Self {
        Self {
            store,
            catalog,
            delta,
        }
    }

    pub fn store_mut(&mut self) -> &mut dyn InventoryStore {
        self.store.as_mut()
    }
}

impl InventoryHandler for AutoAdjust {
    fn show(&mut self, confirmation: &Confirmation, resume: ResumeHandle) -> Result<()> {
        let component = self.catalog.store_name(&confirmation.label);
        let qty = self
            .store
            .adjust_qty(component, self.delta)
            .with_context(|| format!("failed to adjust {}", component))
            .context(Fault::Inventory)?;
        log::info!(
            "AutoAdjust: {} {:+} -> {} ({:.0}%)",
            component,
            self.delta,
            qty,
            confirmation.confidence * 100.0
        );
        resume.resume();
        Ok(())
    }
}
