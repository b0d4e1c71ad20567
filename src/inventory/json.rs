use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{clamp_qty, InventoryStore};

/// Inventory kept as one JSON object `{ "component": quantity, ... }`.
///
/// The file is re-read on every operation so edits made while the scanner
/// runs are picked up.
pub struct JsonInventoryStore {
    path: PathBuf,
    seed: Vec<String>,
}

impl JsonInventoryStore {
    pub fn new<P: AsRef<Path>>(path: P, seed: &[String]) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            seed: seed.to_vec(),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, u32>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read inventory {}", self.path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("invalid inventory JSON in {}", self.path.display()))?;
        let object = value.as_object().ok_or_else(|| {
            anyhow!(
                "inventory {} must contain a JSON object",
                self.path.display()
            )
        })?;
        object
            .iter()
            .map(|(name, qty)| -> Result<(String, u32)> {
                let qty = qty.as_i64().ok_or_else(|| {
                    anyhow!(
                        "quantity for '{}' in {} is not an integer",
                        name,
                        self.path.display()
                    )
                })?;
                Ok((name.clone(), clamp_qty(qty)))
            })
            .collect()
    }

    fn save(&self, quantities: &BTreeMap<String, u32>) -> Result<()> {
        let json = serde_json::to_string_pretty(quantities)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write inventory {}", self.path.display()))
    }
}

impl InventoryStore for JsonInventoryStore {
    fn name(&self) -> &'static str {
        "json"
    }

    fn ensure_schema(&mut self) -> Result<()> {
        if self.path.exists() {
            self.load().map(|_| ())
        } else {
            let seeded: BTreeMap<String, u32> =
                self.seed.iter().map(|name| (name.clone(), 0)).collect();
            self.save(&seeded)
        }
    }

    fn read_qty(&mut self, component: &str) -> Result<u32> {
        let mut quantities = self.load()?;
        if let Some(qty) = quantities.get(component) {
            return Ok(*qty);
        }
        quantities.insert(component.to_string(), 0);
        self.save(&quantities)?;
        Ok(0)
    }

    fn write_qty(&mut self, component: &str, qty: i64) -> Result<u32> {
        let qty = clamp_qty(qty);
        let mut quantities = self.load()?;
        quantities.insert(component.to_string(), qty);
        self.save(&quantities)?;
        Ok(qty)
    }

    fn list(&mut self) -> Result<Vec<(String, u32)>> {
        Ok(self.load()?.into_iter().collect())
    }
}
