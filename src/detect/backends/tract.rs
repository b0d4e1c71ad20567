#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::ScoreModel;
use crate::detect::engine::InputTensor;

/// Tract-based ONNX classifier model.
///
/// Expects an image classifier exported with an NHWC float input of shape
/// `1 × size × size × 3` and a single `1 × labels` score output, which is
/// what Teachable Machine image projects produce after ONNX conversion.
pub struct TractModel {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
}

impl TractModel {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractModel: loaded {} ({}x{} input)",
            model_path.display(),
            input_size,
            input_size
        );
        Ok(Self { model, input_size })
    }

    fn build_input(&self, input: &InputTensor) -> Result<Tensor> {
        if input.size != self.input_size {
            return Err(anyhow!(
                "input tensor size {} does not match model input {}",
                input.size,
                self.input_size
            ));
        }
        let size = self.input_size as usize;
        let array = tract_ndarray::Array4::from_shape_vec((1, size, size, 3), input.data.clone())
            .context("input tensor has the wrong number of values")?;
        Ok(array.into_tensor())
    }
}

impl ScoreModel for TractModel {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn scores(&mut self, input: &InputTensor) -> Result<Vec<f32>> {
        let input = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        Ok(scores.iter().cloned().collect())
    }
}
