//! Parts Scanner
//!
//! Identifies electronic components held in front of a camera and books
//! them into an inventory.
//!
//! # Architecture
//!
//! A classifier labels every frame. The confirmation machine debounces those
//! labels: a component is confirmed only after `confirm_frames` consecutive
//! frames agree on the same valid label at or above `threshold`. A
//! confirmation pauses the scanner and opens an inventory handler, which
//! resumes scanning when the operator is done.
//!
//! # Module Structure
//!
//! - `confirm`: Debounce state machine (Sample, DetectionPolicy, ConfirmationMachine)
//! - `ingest`: Camera sources (synthetic, still images, V4L2)
//! - `detect`: Classifier backends, preprocessing and label loading
//! - `inventory`: Inventory stores (JSON, SQLite, memory) and component catalog
//! - `detail`: Inventory handlers shown on confirmation
//! - `app`: The scanner loop

pub mod app;
pub mod config;
pub mod confirm;
pub mod detail;
pub mod detect;
pub mod fault;
pub mod frame;
pub mod ingest;
pub mod inventory;
pub mod overlay;
pub mod quit;
pub mod ui;

pub use app::{RunSummary, Scanner, ScannerOptions, StopReason};
pub use config::ScannerConfig;
pub use confirm::{Confirmation, ConfirmationMachine, DetectionPolicy, Sample, Step, StreakState};
pub use detail::{InventoryHandler, ResumeHandle};
pub use detect::{Classifier, Prediction};
pub use fault::Fault;
pub use frame::Frame;
pub use ingest::{Camera, CameraConfig};
pub use inventory::InventoryStore;
pub use overlay::{Overlay, Preview};
pub use quit::{QuitHandle, QuitSignal};
