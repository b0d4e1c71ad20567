use anyhow::Result;

use crate::detect::engine::InputTensor;
use crate::frame::Frame;

/// Classifier output for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Arg-max label.
    pub label: String,
    /// Probability of `label`, in `[0, 1]`.
    pub confidence: f32,
    /// Probability per known label, in label order.
    pub distribution: Vec<f32>,
}

/// Single-label image classifier.
///
/// A failed prediction is fatal to the scanner loop; implementations must
/// not substitute a guess for a frame they could not classify.
pub trait Classifier {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn predict(&mut self, frame: &Frame) -> Result<Prediction>;

    /// Optional warm-up hook, run once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Raw model producing one score (logit) per label.
pub trait ScoreModel {
    fn name(&self) -> &'static str;

    fn scores(&mut self, input: &InputTensor) -> Result<Vec<f32>>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn predict(&mut self, frame: &Frame) -> Result<Prediction> {
        (**self).predict(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
