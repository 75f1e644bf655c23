use std::path::{Path, PathBuf};

/// File/entry name for a 1-based slide index: `slide_001.png`.
pub fn slide_file_name(index: usize) -> String {
    format!("slide_{:03}.png", index)
}

/// One rendered slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage {
    index: usize,
    png: Vec<u8>,
}

impl SlideImage {
    /// 1-based position in the deck
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn byte_len(&self) -> usize {
        self.png.len()
    }

    pub fn file_name(&self) -> String {
        slide_file_name(self.index)
    }
}

/// Returned when a backend hands over a zero-length image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("slide {0} produced an empty image")]
pub struct EmptySlideImage(pub usize);

/// Slides in deck order. Indices are assigned on push, so they are always
/// `1..=len` with no gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideSet {
    images: Vec<SlideImage>,
}

impl SlideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            images: Vec::with_capacity(capacity),
        }
    }

    /// Append the next slide, returning the index it was given.
    pub fn push(&mut self, png: Vec<u8>) -> Result<usize, EmptySlideImage> {
        let index = self.images.len() + 1;
        if png.is_empty() {
            return Err(EmptySlideImage(index));
        }
        self.images.push(SlideImage { index, png });
        Ok(index)
    }

    /// Index the next pushed slide will receive
    pub fn next_index(&self) -> usize {
        self.images.len() + 1
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlideImage> {
        self.images.iter()
    }

    pub fn total_bytes(&self) -> usize {
        self.images.iter().map(SlideImage::byte_len).sum()
    }

    /// Write every slide as `slide_NNN.png` into `dir`, which must exist.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.images.len());
        for image in &self.images {
            let path = dir.join(image.file_name());
            std::fs::write(&path, image.png())?;
            written.push(path);
        }
        log::debug!("Wrote {} slide images to {}", written.len(), dir.display());
        Ok(written)
    }
}

impl IntoIterator for SlideSet {
    type Item = SlideImage;
    type IntoIter = std::vec::IntoIter<SlideImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}
