//! Synthetic frame source (`stub://`).
//!
//! Generates a moving gradient so downstream code always sees distinct
//! frames. Used by tests, demos and the stub classifier.

use anyhow::{anyhow, Result};

use super::{Camera, CameraConfig};
use crate::frame::{rgb_len, Frame};

pub struct SyntheticSource {
    config: CameraConfig,
    frame_count: u64,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            opened: false,
        }
    }

    fn generate_pixels(&self) -> Result<Vec<u8>> {
        let mut pixels = vec![0u8; rgb_len(self.config.width, self.config.height)?];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        Ok(pixels)
    }
}

impl Camera for SyntheticSource {
    /// Synthetic sources are always available.
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        log::info!(
            "SyntheticSource: opened {} ({}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        if !self.opened {
            return Err(anyhow!("camera {} is not open", self.config.device));
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels()?;
        Frame::from_rgb(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )
    }

    fn release(&mut self) -> Result<()> {
        if self.opened {
            log::info!(
                "SyntheticSource: released {} after {} frames",
                self.config.device,
                self.frame_count
            );
        }
        self.opened = false;
        Ok(())
    }

    fn describe(&self) -> String {
        self.config.device.clone()
    }
}
