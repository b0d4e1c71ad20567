//! Inventory persistence.
//!
//! One capability, several backends: a JSON document, a SQLite table and an
//! in-memory map. All backends share the same rules:
//! - reading an unknown component registers it with quantity 0
//! - writing a negative quantity stores 0
//! - a missing store is created and seeded with the configured components

mod catalog;
mod json;
mod sqlite;

use anyhow::Result;
use std::collections::BTreeMap;

pub use catalog::{ComponentCatalog, ComponentInfo};
pub use json::JsonInventoryStore;
pub use sqlite::SqliteInventoryStore;

/// Components present in a freshly created store.
pub const DEFAULT_SEED_COMPONENTS: &[&str] =
    &["Modulos Rele de Doble canal", "Diodo Zener", "7805", "7404"];

pub trait InventoryStore {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Create the store if needed and check its shape.
    fn ensure_schema(&mut self) -> Result<()>;

    /// Current quantity. Unknown components are registered with 0.
    fn read_qty(&mut self, component: &str) -> Result<u32>;

    /// Store `qty`, clamped at 0. Returns the stored quantity.
    fn write_qty(&mut self, component: &str, qty: i64) -> Result<u32>;

    /// All components with their quantities, ordered by name.
    fn list(&mut self) -> Result<Vec<(String, u32)>>;

    /// Add `delta` (may be negative) and return the stored quantity.
    fn adjust_qty(&mut self, component: &str, delta: i64) -> Result<u32> {
        let current = self.read_qty(component)?;
        self.write_qty(component, i64::from(current).saturating_add(delta))
    }
}

pub(crate) fn clamp_qty(qty: i64) -> u32 {
    qty.clamp(0, i64::from(u32::MAX)) as u32
}

/// Store selected by configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryBackend {
    Json,
    Sqlite,
    Memory,
}

#[derive(Clone, Debug)]
pub struct InventorySettings {
    pub backend: InventoryBackend,
    pub path: String,
    pub seed: Vec<String>,
}

/// Opens (creating and seeding if needed) the configured store.
pub fn open_store(settings: &InventorySettings) -> Result<Box<dyn InventoryStore>> {
    let mut store: Box<dyn InventoryStore> = match settings.backend {
        InventoryBackend::Json => Box::new(JsonInventoryStore::new(&settings.path, &settings.seed)),
        InventoryBackend::Sqlite => {
            Box::new(SqliteInventoryStore::open(&settings.path, &settings.seed)?)
        }
        InventoryBackend::Memory => Box::new(InMemoryInventoryStore::seeded(&settings.seed)),
    };
    store.ensure_schema()?;
    log::info!("inventory store: {} ({})", store.name(), settings.path);
    Ok(store)
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryInventoryStore {
    quantities: BTreeMap<String, u32>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<S: AsRef<str>>(components: &[S]) -> Self {
        Self {
            quantities: components
                .iter()
                .map(|c| (c.as_ref().to_string(), 0))
                .collect(),
        }
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ensure_schema(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_qty(&mut self, component: &str) -> Result<u32> {
        Ok(*self.quantities.entry(component.to_string()).or_insert(0))
    }

    fn write_qty(&mut self, component: &str, qty: i64) -> Result<u32> {
        let qty = clamp_qty(qty);
        self.quantities.insert(component.to_string(), qty);
        Ok(qty)
    }

    fn list(&mut self) -> Result<Vec<(String, u32)>> {
        Ok(self
            .quantities
            .iter()
            .map(|(name, qty)| (name.clone(), *qty))
            .collect())
    }
}
