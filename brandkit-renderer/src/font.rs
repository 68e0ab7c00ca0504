//! Font assets for social image text.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{RenderError, RenderResult};

/// A typeface file loaded into a font database.
#[derive(Debug, Clone)]
pub struct FontAsset {
    path: PathBuf,
    data: Arc<[u8]>,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl FontAsset {
    /// Read a font file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Font`] if the file is missing, unreadable or
    /// holds no usable font face.
    pub async fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(source) => return Err(RenderError::Font { path, source }),
        };
        let font = Self::from_bytes(path, data)?;
        tracing::debug!(
            path = %font.path.display(),
            bytes = font.data.len(),
            faces = font.fontdb.len(),
            "Loaded font"
        );
        Ok(font)
    }

    /// Wrap font bytes already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Font`] if the bytes hold no font face.
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> RenderResult<Self> {
        let path = path.into();
        let data: Arc<[u8]> = Arc::from(data);
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_font_data(data.to_vec());
        if fontdb.is_empty() {
            return Err(RenderError::Font {
                path,
                source: io::Error::new(io::ErrorKind::InvalidData, "no font faces found"),
            });
        }
        Ok(Self {
            path,
            data,
            fontdb: Arc::new(fontdb),
        })
    }

    /// Where the font came from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw font bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of faces in the file.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// usvg options whose font database holds this font.
    #[must_use]
    pub fn usvg_options(&self) -> usvg::Options<'static> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        options
    }
}
