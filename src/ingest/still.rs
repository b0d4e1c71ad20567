//! Still-image frame source.
//!
//! Replays captured bench photos as camera frames:
//! - a single image file is served on every read (a fixed shot of one part)
//! - a directory is played once in lexical file-name order; reading past the
//!   last image is an acquisition error, which ends the scanner run
//!
//! Images are decoded with the `image` crate and converted to RGB24.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::Camera;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct StillImageSource {
    path: PathBuf,
    playlist: Vec<PathBuf>,
    repeat: bool,
    cursor: usize,
    frame_count: u64,
    opened: bool,
}

impl StillImageSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            playlist: Vec::new(),
            repeat: false,
            cursor: 0,
            frame_count: 0,
            opened: false,
        }
    }

    fn decode(&self, path: &Path) -> Result<Frame> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        Frame::from_rgb(image.into_raw(), width, height, self.frame_count)
    }
}

impl Camera for StillImageSource {
    fn open(&mut self) -> Result<()> {
        if self.path.is_dir() {
            let mut playlist = Vec::new();
            let entries = std::fs::read_dir(&self.path)
                .with_context(|| format!("failed to list {}", self.path.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_file() && has_image_extension(&path) {
                    playlist.push(path);
                }
            }
            playlist.sort();
            if playlist.is_empty() {
                return Err(anyhow!("no images found in {}", self.path.display()));
            }
            self.playlist = playlist;
            self.repeat = false;
        } else if self.path.is_file() {
            self.playlist = vec![self.path.clone()];
            self.repeat = true;
        } else {
            return Err(anyhow!("camera path {} does not exist", self.path.display()));
        }
        self.cursor = 0;
        self.opened = true;
        log::info!(
            "StillImageSource: opened {} ({} image(s))",
            self.path.display(),
            self.playlist.len()
        );
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        if !self.opened {
            return Err(anyhow!("camera {} is not open", self.path.display()));
        }
        let index = if self.repeat { 0 } else { self.cursor };
        let path = self
            .playlist
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("no more frames in {}", self.path.display()))?;
        self.cursor += 1;
        self.frame_count += 1;
        self.decode(&path)
    }

    fn release(&mut self) -> Result<()> {
        self.playlist.clear();
        self.opened = false;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, shade: u8) {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([shade, shade, shade]));
        img.save(path).expect("write png");
    }

    #[test]
    fn directory_plays_once_in_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(&dir.path().join("b.png"), 20);
        write_png(&dir.path().join("a.png"), 10);
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let mut source = StillImageSource::new(dir.path());
        source.open()?;
        let first = source.read()?;
        assert_eq!((first.width, first.height), (4, 3));
        assert_eq!(first.pixels()[0], 10);
        assert_eq!(source.read()?.pixels()[0], 20);

        let err = source.read().unwrap_err();
        assert!(err.to_string().contains("no more frames"));
        Ok(())
    }

    #[test]
    fn single_file_repeats() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("part.png");
        write_png(&path, 7);

        let mut source = StillImageSource::new(&path);
        source.open()?;
        for seq in 1..=3 {
            assert_eq!(source.read()?.seq, seq);
        }
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = StillImageSource::new(dir.path());
        assert!(source.open().is_err());
    }
}
