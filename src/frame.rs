//! Captured camera frames.
//!
//! Every camera source hands the loop a `Frame`: packed RGB24 pixels plus
//! dimensions and a capture sequence number. Sources normalize whatever the
//! device produces into RGB24 before constructing a frame.

use anyhow::{anyhow, Result};

pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Per-source capture counter, starting at 1.
    pub seq: u64,
}

impl Frame {
    /// Wraps RGB24 pixels. Fails when the buffer length does not match the
    /// dimensions.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, seq: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            seq,
        })
    }

    /// Copies a driver buffer that may be padded past the image. `bytes_used`
    /// is the payload size the driver reported; 0 means the whole buffer.
    pub fn from_padded_rgb(
        buf: &[u8],
        bytes_used: usize,
        width: u32,
        height: u32,
        seq: u64,
    ) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        let used = match bytes_used {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        if used < expected {
            return Err(anyhow!(
                "short RGB frame: expected {} bytes, driver filled {}",
                expected,
                used
            ));
        }
        Self::from_rgb(buf[..expected].to_vec(), width, height, seq)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("seq", &self.seq)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::from_rgb(vec![0; 10], 2, 2, 1).is_err());
        let frame = Frame::from_rgb(vec![0; 12], 2, 2, 1).unwrap();
        assert_eq!(frame.pixels().len(), 12);
        assert_eq!(frame.seq, 1);
    }

    #[test]
    fn padded_driver_buffer_is_trimmed_to_the_image() {
        let mut buf: Vec<u8> = (0..12).collect();
        buf.extend_from_slice(&[0xEE; 4096]);

        let frame = Frame::from_padded_rgb(&buf, 12, 2, 2, 7).unwrap();
        assert_eq!(frame.pixels(), &buf[..12]);
        assert_eq!(frame.seq, 7);

        // Drivers that leave bytesused at 0 still yield the leading image.
        let frame = Frame::from_padded_rgb(&buf, 0, 2, 2, 8).unwrap();
        assert_eq!(frame.pixels().len(), 12);
    }

    #[test]
    fn short_driver_payload_is_rejected() {
        let buf = vec![0u8; 4096];
        assert!(Frame::from_padded_rgb(&buf, 10, 2, 2, 1).is_err());
        assert!(Frame::from_padded_rgb(&buf[..10], 0, 2, 2, 1).is_err());
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        assert!(rgb_len(u32::MAX, u32::MAX).is_err());
    }
}
