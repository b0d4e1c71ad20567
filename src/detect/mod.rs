mod backend;
pub mod backends;
pub mod engine;
pub mod labels;

pub use backend::{Classifier, Prediction, ScoreModel};
pub use backends::{build_classifier, StubBackend};
pub use engine::{InferenceEngine, InputTensor, Preprocessor};
pub use labels::{load_labels, DEFAULT_LABELS};
