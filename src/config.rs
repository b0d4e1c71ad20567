use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::confirm::DetectionPolicy;
use crate::detect::load_labels;
use crate::fault::Fault;
use crate::ingest::CameraConfig;
use crate::inventory::{
    ComponentCatalog, ComponentInfo, InventoryBackend, InventorySettings, DEFAULT_SEED_COMPONENTS,
};

const DEFAULT_MODEL_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "model/model.onnx";
const DEFAULT_INPUT_SIZE: u32 = 224;
const DEFAULT_STUB_SCRIPT: &[&str] = &[
    "No hay nada",
    "No hay nada",
    "7805@0.93",
    "7805@0.95",
    "7805@0.96",
    "7805@0.94",
    "7805@0.97",
];
const DEFAULT_CAMERA_DEVICE: &str = "stub://bench";
const DEFAULT_CAMERA_FPS: u32 = 15;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_THRESHOLD: f32 = 0.85;
const DEFAULT_CONFIRM_FRAMES: u32 = 5;
const DEFAULT_NO_OBJECT_CLASS: &str = "No hay nada";
const DEFAULT_VALID_CLASS_COUNT: usize = 4;
const DEFAULT_INVENTORY_BACKEND: &str = "json";
const DEFAULT_INVENTORY_PATH: &str = "inventory.json";
const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
const MAX_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ScannerConfigFile {
    model: Option<ModelConfigFile>,
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    inventory: Option<InventoryConfigFile>,
    ui: Option<UiConfigFile>,
    components: Option<BTreeMap<String, ComponentInfo>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    backend: Option<String>,
    path: Option<PathBuf>,
    labels: Option<PathBuf>,
    input_size: Option<u32>,
    script: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    threshold: Option<f32>,
    confirm_frames: Option<u32>,
    no_object_class: Option<String>,
    valid_class_count: Option<usize>,
    valid_classes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct InventoryConfigFile {
    backend: Option<String>,
    path: Option<String>,
    seed: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct UiConfigFile {
    poll_interval_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelBackend {
    Stub,
    Tract,
}

impl ModelBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "stub" => Ok(Self::Stub),
            "tract" => Ok(Self::Tract),
            other => Err(anyhow!(
                "unknown model backend '{}' (expected 'stub' or 'tract')",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelSettings {
    pub backend: ModelBackend,
    /// Model file; its directory is also searched for `labels.txt`.
    pub path: PathBuf,
    /// Explicit label file.
    pub labels: Option<PathBuf>,
    /// Square model input size in pixels.
    pub input_size: u32,
    /// Predictions replayed by the stub backend.
    pub script: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DetectionSettings {
    pub threshold: f32,
    pub confirm_frames: u32,
    pub no_object_class: String,
    /// Number of leading model labels eligible for inventory actions.
    pub valid_class_count: usize,
    /// Explicit valid labels; replaces `valid_class_count` when set.
    pub valid_classes: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct ScannerConfig {
    pub model: ModelSettings,
    pub camera: CameraConfig,
    pub detection: DetectionSettings,
    pub inventory: InventorySettings,
    pub catalog: ComponentCatalog,
    /// Tick of the paused loop (handler pump + quit poll).
    pub poll_interval: Duration,
}

impl ScannerConfig {
    /// Built-in defaults, without reading files or the environment.
    pub fn defaults() -> Result<Self> {
        Self::from_file(ScannerConfigFile::default())
    }

    /// Loads configuration from `path`, else from `$SCANNER_CONFIG`, else
    /// defaults; applies env overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SCANNER_CONFIG").ok().map(PathBuf::from));
        Self::load_inner(config_path.as_deref()).context(Fault::Configuration)
    }

    fn load_inner(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ScannerConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScannerConfigFile) -> Result<Self> {
        let model_file = file.model.unwrap_or_default();
        let model = ModelSettings {
            backend: ModelBackend::parse(
                model_file
                    .backend
                    .as_deref()
                    .unwrap_or(DEFAULT_MODEL_BACKEND),
            )?,
            path: model_file
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            labels: model_file.labels,
            input_size: model_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            script: model_file.script.unwrap_or_else(|| {
                DEFAULT_STUB_SCRIPT.iter().map(|s| s.to_string()).collect()
            }),
        };

        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };

        let detection_file = file.detection.unwrap_or_default();
        let detection = DetectionSettings {
            threshold: detection_file.threshold.unwrap_or(DEFAULT_THRESHOLD),
            confirm_frames: detection_file
                .confirm_frames
                .unwrap_or(DEFAULT_CONFIRM_FRAMES),
            no_object_class: detection_file
                .no_object_class
                .unwrap_or_else(|| DEFAULT_NO_OBJECT_CLASS.to_string()),
            valid_class_count: detection_file
                .valid_class_count
                .unwrap_or(DEFAULT_VALID_CLASS_COUNT),
            valid_classes: detection_file.valid_classes,
        };

        let inventory_file = file.inventory.unwrap_or_default();
        let inventory = InventorySettings {
            backend: parse_inventory_backend(
                inventory_file
                    .backend
                    .as_deref()
                    .unwrap_or(DEFAULT_INVENTORY_BACKEND),
            )?,
            path: inventory_file
                .path
                .unwrap_or_else(|| DEFAULT_INVENTORY_PATH.to_string()),
            seed: inventory_file.seed.unwrap_or_else(|| {
                DEFAULT_SEED_COMPONENTS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        };

        let catalog = match file.components {
            Some(entries) => ComponentCatalog::new(entries),
            None => ComponentCatalog::bench_kit(),
        };

        let poll_interval = Duration::from_millis(
            file.ui
                .and_then(|ui| ui.poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        );

        Ok(Self {
            model,
            camera,
            detection,
            inventory,
            catalog,
            poll_interval,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("SCANNER_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device.trim().to_string();
            }
        }
        if let Ok(backend) = std::env::var("SCANNER_MODEL_BACKEND") {
            if !backend.trim().is_empty() {
                self.model.backend = ModelBackend::parse(&backend)?;
            }
        }
        if let Ok(threshold) = std::env::var("SCANNER_THRESHOLD") {
            self.detection.threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("SCANNER_THRESHOLD must be a number in [0, 1]"))?;
        }
        if let Ok(frames) = std::env::var("SCANNER_CONFIRM_FRAMES") {
            self.detection.confirm_frames = frames
                .trim()
                .parse()
                .map_err(|_| anyhow!("SCANNER_CONFIRM_FRAMES must be a positive integer"))?;
        }
        if let Ok(path) = std::env::var("SCANNER_INVENTORY_PATH") {
            if !path.trim().is_empty() {
                self.inventory.path = path.trim().to_string();
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let detection = &self.detection;
        if !detection.threshold.is_finite() || !(0.0..=1.0).contains(&detection.threshold) {
            return Err(anyhow!(
                "detection.threshold must be within [0, 1], got {}",
                detection.threshold
            ));
        }
        if detection.confirm_frames == 0 {
            return Err(anyhow!("detection.confirm_frames must be >= 1"));
        }
        if detection.no_object_class.trim().is_empty() {
            return Err(anyhow!("detection.no_object_class must not be empty"));
        }
        if detection.valid_classes.is_none() && detection.valid_class_count == 0 {
            return Err(anyhow!("detection.valid_class_count must be >= 1"));
        }
        if self.model.input_size == 0 {
            return Err(anyhow!("model.input_size must be > 0"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be > 0"));
        }
        if self.inventory.path.trim().is_empty() {
            return Err(anyhow!("inventory.path must not be empty"));
        }
        if self.poll_interval.is_zero()
            || self.poll_interval > Duration::from_millis(MAX_POLL_INTERVAL_MS)
        {
            return Err(anyhow!(
                "ui.poll_interval_ms must be within 1..={}",
                MAX_POLL_INTERVAL_MS
            ));
        }
        Ok(())
    }

    /// Loads the model's labels (see `detect::load_labels`).
    pub fn load_labels(&self) -> Result<Vec<String>> {
        let model_dir = self
            .model
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        load_labels(&model_dir, self.model.labels.as_deref()).context(Fault::Configuration)
    }

    /// Derives the confirmation policy against the model's labels.
    ///
    /// Valid classes are the explicit list when configured, otherwise the
    /// first `valid_class_count` labels. The no-object class is never valid,
    /// even when it is one of those leading labels.
    pub fn detection_policy(&self, labels: &[String]) -> Result<DetectionPolicy> {
        let detection = &self.detection;
        let not_a_label = |label: &str| {
            anyhow!("'{}' is not one of the model labels", label).context(Fault::Configuration)
        };
        if !labels.iter().any(|l| *l == detection.no_object_class) {
            return Err(not_a_label(&detection.no_object_class));
        }
        let valid: Vec<String> = match &detection.valid_classes {
            Some(explicit) => {
                if let Some(unknown) = explicit.iter().find(|c| !labels.contains(*c)) {
                    return Err(not_a_label(unknown));
                }
                explicit.clone()
            }
            None => labels
                .iter()
                .take(detection.valid_class_count)
                .filter(|l| **l != detection.no_object_class)
                .cloned()
                .collect(),
        };
        DetectionPolicy::new(
            detection.threshold,
            detection.confirm_frames,
            detection.no_object_class.clone(),
            valid,
        )
    }
}

fn parse_inventory_backend(value: &str) -> Result<InventoryBackend> {
    match value.trim() {
        "json" => Ok(InventoryBackend::Json),
        "sqlite" => Ok(InventoryBackend::Sqlite),
        "memory" => Ok(InventoryBackend::Memory),
        other => Err(anyhow!(
            "unknown inventory backend '{}' (expected 'json', 'sqlite' or 'memory')",
            other
        )),
    }
}

fn read_config_file(path: &Path) -> Result<ScannerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        crate::detect::DEFAULT_LABELS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ScannerConfig::defaults().unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.model.backend, ModelBackend::Stub);
        assert_eq!(cfg.detection.confirm_frames, DEFAULT_CONFIRM_FRAMES);
        assert_eq!(cfg.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn valid_classes_are_leading_labels() {
        let cfg = ScannerConfig::defaults().unwrap();
        let policy = cfg.detection_policy(&labels()).unwrap();
        let valid: Vec<&str> = policy.valid_classes().iter().map(String::as_str).collect();
        assert_eq!(valid, vec!["7404", "7805", "Diodo Zener", "Modulo Rele 2"]);
        assert_eq!(policy.no_object_class(), "No hay nada");
    }

    #[test]
    fn sentinel_within_leading_labels_shrinks_valid_set() {
        let labels: Vec<String> = ["No hay nada", "A", "B", "C", "D", "E"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cfg = ScannerConfig::defaults().unwrap();
        let policy = cfg.detection_policy(&labels).unwrap();
        let valid: Vec<&str> = policy.valid_classes().iter().map(String::as_str).collect();
        assert_eq!(valid, vec!["A", "B", "C"]);
        assert!(!policy.qualifies("D", 0.99));
    }

    #[test]
    fn explicit_valid_classes_must_be_labels() {
        let mut cfg = ScannerConfig::defaults().unwrap();
        cfg.detection.valid_classes = Some(vec!["7805".to_string()]);
        let policy = cfg.detection_policy(&labels()).unwrap();
        assert_eq!(policy.valid_classes().len(), 1);

        cfg.detection.valid_classes = Some(vec!["LM317".to_string()]);
        let err = cfg.detection_policy(&labels()).unwrap_err();
        assert_eq!(Fault::of(&err), Some(Fault::Configuration));
    }

    #[test]
    fn no_object_class_must_be_a_label() {
        let mut cfg = ScannerConfig::defaults().unwrap();
        cfg.detection.no_object_class = "Nothing".to_string();
        let err = cfg.detection_policy(&labels()).unwrap_err();
        assert_eq!(Fault::of(&err), Some(Fault::Configuration));
    }

    #[test]
    fn rejects_unknown_backends() {
        assert!(ModelBackend::parse("tensorflow").is_err());
        assert!(parse_inventory_backend("excel").is_err());
        assert_eq!(
            parse_inventory_backend("sqlite").unwrap(),
            InventoryBackend::Sqlite
        );
    }
}
