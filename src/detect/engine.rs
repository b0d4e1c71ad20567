//! Frame-to-label inference.
//!
//! `InferenceEngine` wraps a `ScoreModel`: it resizes the RGB frame to the
//! model's square input, scales pixels to `[0, 1]`, runs the model, turns
//! the scores into probabilities with a softmax and maps the arg-max index
//! to its label.

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;

use crate::detect::backend::{Classifier, Prediction, ScoreModel};
use crate::frame::Frame;

/// NHWC batch of one: `size × size × 3` floats in `[0, 1]`.
#[derive(Clone, Debug)]
pub struct InputTensor {
    pub size: u32,
    pub data: Vec<f32>,
}

/// Resize + normalize step in front of the model.
#[derive(Clone, Copy, Debug)]
pub struct Preprocessor {
    input_size: u32,
}

impl Preprocessor {
    pub fn new(input_size: u32) -> Result<Self> {
        if input_size == 0 {
            return Err(anyhow!("model input size must be > 0"));
        }
        Ok(Self { input_size })
    }

    pub fn prepare(&self, frame: &Frame) -> Result<InputTensor> {
        let rgb = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| {
                anyhow!(
                    "frame buffer does not match {}x{}",
                    frame.width,
                    frame.height
                )
            })?;
        let resized = if rgb.dimensions() == (self.input_size, self.input_size) {
            rgb
        } else {
            image::imageops::resize(&rgb, self.input_size, self.input_size, FilterType::Triangle)
        };
        let data = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();
        Ok(InputTensor {
            size: self.input_size,
            data,
        })
    }
}

pub struct InferenceEngine<M: ScoreModel> {
    preprocessor: Preprocessor,
    model: M,
    labels: Vec<String>,
}

impl<M: ScoreModel> InferenceEngine<M> {
    pub fn new(preprocessor: Preprocessor, model: M, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("inference engine needs at least one label"));
        }
        Ok(Self {
            preprocessor,
            model,
            labels,
        })
    }

    fn classify(&mut self, frame: &Frame) -> Result<Prediction> {
        let input = self.preprocessor.prepare(frame)?;
        let scores = self.model.scores(&input)?;
        if scores.len() != self.labels.len() {
            return Err(anyhow!(
                "model produced {} scores for {} labels",
                scores.len(),
                self.labels.len()
            ));
        }
        let distribution = softmax(&scores)?;
        let (index, confidence) = argmax(&distribution)?;
        Ok(Prediction {
            label: self.labels[index].clone(),
            confidence,
            distribution,
        })
    }
}

impl<M: ScoreModel> Classifier for InferenceEngine<M> {
    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn predict(&mut self, frame: &Frame) -> Result<Prediction> {
        self.classify(frame).with_context(|| {
            format!("{} model failed on frame {}", self.model.name(), frame.seq)
        })
    }
}

/// Numerically stable softmax. Rejects empty or non-finite scores.
pub fn softmax(scores: &[f32]) -> Result<Vec<f32>> {
    if scores.is_empty() {
        return Err(anyhow!("model produced no scores"));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(anyhow!("model produced non-finite scores"));
    }
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// First index of the highest probability.
fn argmax(values: &[f32]) -> Result<(usize, f32)> {
    values
        .iter()
        .cloned()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .ok_or_else(|| anyhow!("empty distribution"))
}
