use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-label presentation and storage details.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ComponentInfo {
    /// Row name in the inventory store. Defaults to the label itself.
    pub store_name: Option<String>,
    /// Reference photo shown next to the detection.
    pub image: Option<PathBuf>,
    /// Datasheet URL.
    pub datasheet: Option<String>,
}

/// Maps model labels to inventory rows and reference material.
#[derive(Clone, Debug, Default)]
pub struct ComponentCatalog {
    entries: BTreeMap<String, ComponentInfo>,
}

impl ComponentCatalog {
    pub fn new(entries: BTreeMap<String, ComponentInfo>) -> Self {
        Self { entries }
    }

    /// Catalog for the bench kit the default labels describe.
    pub fn bench_kit() -> Self {
        let entry = |store_name: &str, datasheet: &str| ComponentInfo {
            store_name: Some(store_name.to_string()),
            image: None,
            datasheet: Some(datasheet.to_string()),
        };
        let mut entries = BTreeMap::new();
        entries.insert(
            "Modulo Rele 2".to_string(),
            entry(
                "Modulos Rele de Doble canal",
                "https://mm.digikey.com/Volume0/opasdata/d220001/medias/docus/5773/TS0010D%20DATASHEET.pdf",
            ),
        );
        entries.insert(
            "7404".to_string(),
            entry("7404", "https://www.ti.com/lit/ds/symlink/sn7404.pdf"),
        );
        entries.insert(
            "Diodo Zener".to_string(),
            entry(
                "Diodo Zener",
                "https://www.onsemi.com/download/data-sheet/pdf/1n4736at-d.pdf",
            ),
        );
        entries.insert(
            "7805".to_string(),
            entry(
                "7805",
                "https://datasheet.octopart.com/L7805CV-STMicroelectronics-datasheet-7264666.pdf",
            ),
        );
        Self { entries }
    }

    pub fn info(&self, label: &str) -> Option<&ComponentInfo> {
        self.entries.get(label)
    }

    /// Inventory row name for a label.
    pub fn store_name<'a>(&'a self, label: &'a str) -> &'a str {
        self.entries
            .get(label)
            .and_then(|info| info.store_name.as_deref())
            .unwrap_or(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_name_defaults_to_label() {
        let catalog = ComponentCatalog::bench_kit();
        assert_eq!(
            catalog.store_name("Modulo Rele 2"),
            "Modulos Rele de Doble canal"
        );
        assert_eq!(catalog.store_name("LM317"), "LM317");
        assert!(catalog.info("7805").and_then(|i| i.datasheet.as_ref()).is_some());
    }
}
