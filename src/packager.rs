use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime};

use crate::error::Result;
use crate::slide_set::SlideSet;

/// Media type of every archive this crate produces
pub const ZIP_MEDIA_TYPE: &str = "application/zip";

/// A finished slide archive, ready to hand to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBundle {
    bytes: Vec<u8>,
    file_name: String,
    entry_count: usize,
}

impl ArchiveBundle {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Suggested download name
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn media_type(&self) -> &'static str {
        ZIP_MEDIA_TYPE
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(())
    }
}

/// Zip `slides` in index order as `slide_NNN.png` entries.
///
/// Entry timestamps are pinned to the ZIP epoch so the same slides always produce
/// the same bytes. An empty set yields a valid archive with no entries.
pub fn package(slides: SlideSet, file_name: &str) -> Result<ArchiveBundle> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(slides.total_bytes())));
    let mut entry_count = 0;

    for image in slides {
        zip.start_file(image.file_name(), options)?;
        zip.write_all(image.png())?;
        entry_count += 1;
    }

    let bytes = zip.finish()?.into_inner();

    log::info!(
        "Packaged {} slides into {} ({} bytes)",
        entry_count,
        file_name,
        bytes.len()
    );

    Ok(ArchiveBundle {
        bytes,
        file_name: file_name.to_string(),
        entry_count,
    })
}
