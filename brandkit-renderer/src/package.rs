//! Asset bundling and archive output.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use brandkit_core::manifest::icon_file_name;
use brandkit_core::RasterResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{RenderError, RenderResult};

/// Replace path separators so a name stays a single flat file name.
///
/// `..` is harmless once `/` and `\` are gone, so it is left alone.
#[must_use]
pub fn flat_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// One named file in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// File name inside the archive; never contains a path separator.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Ordered collection of named blobs destined for one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetBundle {
    entries: Vec<BundleEntry>,
}

impl AssetBundle {
    /// Empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file at the archive root.
    pub fn add(&mut self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.push(BundleEntry {
            name: flat_file_name(name),
            bytes: bytes.into(),
        });
    }

    /// Append `icon-{size}.png` for every raster that succeeded.
    pub fn add_rasters(&mut self, rasters: &[RasterResult]) {
        for raster in rasters {
            if let Some(bytes) = &raster.bytes {
                self.add(&icon_file_name(raster.size), bytes.clone());
            }
        }
    }

    /// Files in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// File names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serializes a bundle into a single archive.
pub trait Packager: Send + Sync {
    /// Build the archive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Package`] if the archive cannot be written.
    fn pack(&self, bundle: &AssetBundle) -> RenderResult<Vec<u8>>;

    /// File extension of the archive, without the dot.
    fn extension(&self) -> &str;
}

/// Deflate-compressed zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl Packager for ZipPackager {
    fn pack(&self, bundle: &AssetBundle) -> RenderResult<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for entry in bundle.entries() {
                zip.start_file(entry.name.as_str(), options)
                    .map_err(|e| RenderError::Package(format!("{}: {e}", entry.name)))?;
                zip.write_all(&entry.bytes)
                    .map_err(|e| RenderError::Package(format!("{}: {e}", entry.name)))?;
            }
            zip.finish()
                .map_err(|e| RenderError::Package(e.to_string()))?;
        }
        Ok(buffer)
    }

    fn extension(&self) -> &str {
        "zip"
    }
}

/// `{name}-assets.{ext}`.
#[must_use]
pub fn archive_file_name(project_name: &str, extension: &str) -> String {
    flat_file_name(&format!("{project_name}-assets.{extension}"))
}

/// Destination for a finished archive.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Store the archive and return where it went.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if the archive cannot be written.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> RenderResult<PathBuf>;
}

/// Writes archives into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink that writes into `dir`, creating it on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArchiveSink for DirectorySink {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> RenderResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(flat_file_name(file_name));
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Archive saved");
        Ok(path)
    }
}
