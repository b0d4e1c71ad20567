use anyhow::{anyhow, Result};

use crate::detect::backend::{Classifier, Prediction};
use crate::frame::Frame;

const DEFAULT_SCRIPT_CONFIDENCE: f32 = 0.95;

/// Stub backend for demos and tests.
///
/// Ignores pixels and replays a script of predictions, one entry per frame,
/// wrapping around at the end. Entries are `label` or `label@confidence`.
pub struct StubBackend {
    labels: Vec<String>,
    script: Vec<(usize, f32)>,
    cursor: usize,
}

impl StubBackend {
    pub fn new(labels: Vec<String>, script: &[String]) -> Result<Self> {
        if script.is_empty() {
            return Err(anyhow!("stub classifier script is empty"));
        }
        let parsed = script
            .iter()
            .map(|entry| parse_entry(&labels, entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            labels,
            script: parsed,
            cursor: 0,
        })
    }

    fn distribution(&self, index: usize, confidence: f32) -> Vec<f32> {
        let others = self.labels.len().saturating_sub(1);
        let rest = if others == 0 {
            0.0
        } else {
            (1.0 - confidence) / others as f32
        };
        (0..self.labels.len())
            .map(|i| if i == index { confidence } else { rest })
            .collect()
    }
}

impl Classifier for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn predict(&mut self, _frame: &Frame) -> Result<Prediction> {
        let (index, confidence) = self.script[self.cursor % self.script.len()];
        self.cursor = self.cursor.wrapping_add(1);
        Ok(Prediction {
            label: self.labels[index].clone(),
            confidence,
            distribution: self.distribution(index, confidence),
        })
    }
}

fn parse_entry(labels: &[String], entry: &str) -> Result<(usize, f32)> {
    let (label, confidence) = match entry.rsplit_once('@') {
        Some((label, conf)) => {
            let conf: f32 = conf
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid confidence in script entry '{}'", entry))?;
            (label.trim(), conf)
        }
        None => (entry.trim(), DEFAULT_SCRIPT_CONFIDENCE),
    };
    if !(0.0..=1.0).contains(&confidence) {
        return Err(anyhow!(
            "confidence in script entry '{}' must be within [0, 1]",
            entry
        ));
    }
    let index = labels
        .iter()
        .position(|l| l == label)
        .ok_or_else(|| anyhow!("script label '{}' is not a model label", label))?;
    Ok((index, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["7805", "7404", "No hay nada"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn script(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn replays_script_and_wraps() -> Result<()> {
        let frame = Frame::from_rgb(vec![0; 3], 1, 1, 1)?;
        let mut backend = StubBackend::new(labels(), &script(&["7805@0.8", "No hay nada"]))?;

        let first = backend.predict(&frame)?;
        assert_eq!(first.label, "7805");
        assert_eq!(first.confidence, 0.8);
        assert!((first.distribution[1] - 0.1).abs() < 1e-6);

        let second = backend.predict(&frame)?;
        assert_eq!(second.label, "No hay nada");
        assert_eq!(second.confidence, DEFAULT_SCRIPT_CONFIDENCE);

        assert_eq!(backend.predict(&frame)?.label, "7805");
        Ok(())
    }

    #[test]
    fn rejects_bad_scripts() {
        assert!(StubBackend::new(labels(), &[]).is_err());
        assert!(StubBackend::new(labels(), &script(&["LM317"])).is_err());
        assert!(StubBackend::new(labels(), &script(&["7805@1.5"])).is_err());
        assert!(StubBackend::new(labels(), &script(&["7805@high"])).is_err());
    }
}
