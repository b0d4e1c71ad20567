//! Camera sources.
//!
//! This module provides the sources the scanner reads frames from:
//! - Synthetic gradient frames (`stub://<name>`, testing and demos)
//! - Still images from a file or a directory (bench replays)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Every source produces RGB24 `Frame`s. Sources own their device handle
//! between `open()` and `release()`; the application loop guarantees that
//! `release()` runs exactly once, whatever ends the run.

pub mod still;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;
use std::path::Path;

use crate::frame::Frame;

pub use still::StillImageSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// Frame acquisition contract.
pub trait Camera {
    /// Acquire the device.
    fn open(&mut self) -> Result<()>;

    /// Capture the next frame. Errors are fatal to the scanner loop.
    fn read(&mut self) -> Result<Frame>;

    /// Give the device back. Must be safe to call after a failed `open`.
    fn release(&mut self) -> Result<()>;

    /// Human-readable source description for logs.
    fn describe(&self) -> String;
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Camera settings shared by all sources.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// `stub://<name>`, an image file or directory, or a V4L2 device path.
    pub device: String,
    /// Target frame rate. `0` disables pacing.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://bench".to_string(),
            target_fps: 15,
            width: 640,
            height: 480,
        }
    }
}

/// Builds the source named by `config.device`.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn Camera>> {
    if config.device.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(config.clone())));
    }
    if config.device.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(config.clone())));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            anyhow::bail!("camera {} requires the ingest-v4l2 feature", config.device);
        }
    }
    if config.device.contains("://") {
        anyhow::bail!("unsupported camera URL scheme: {}", config.device);
    }
    Ok(Box::new(StillImageSource::new(Path::new(&config.device))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_source_by_device() {
        let stub = open_source(&CameraConfig::default()).unwrap();
        assert!(stub.describe().starts_with("stub://"));

        let still = open_source(&CameraConfig {
            device: "captures/bench".to_string(),
            ..CameraConfig::default()
        })
        .unwrap();
        assert!(still.describe().contains("captures/bench"));

        assert!(open_source(&CameraConfig {
            device: "rtsp://camera".to_string(),
            ..CameraConfig::default()
        })
        .is_err());
    }
}
