pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

use anyhow::Result;

use crate::config::{ModelBackend, ModelSettings};
use crate::detect::backend::Classifier;

pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractModel;

/// Builds the classifier selected by `settings.backend`.
pub fn build_classifier(
    settings: &ModelSettings,
    labels: Vec<String>,
) -> Result<Box<dyn Classifier>> {
    match settings.backend {
        ModelBackend::Stub => Ok(Box::new(StubBackend::new(labels, &settings.script)?)),
        ModelBackend::Tract => build_tract(settings, labels),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &ModelSettings, labels: Vec<String>) -> Result<Box<dyn Classifier>> {
    use crate::detect::engine::{InferenceEngine, Preprocessor};

    let model = TractModel::new(&settings.path, settings.input_size)?;
    let engine = InferenceEngine::new(Preprocessor::new(settings.input_size)?, model, labels)?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &ModelSettings, _labels: Vec<String>) -> Result<Box<dyn Classifier>> {
    anyhow::bail!("the tract model backend requires the backend-tract feature")
}
