use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::WriteError;
use crate::format::ImageFormat;

/// Destination for encoded images. Called concurrently from every worker thread, so
/// implementations synchronize their own state.
pub trait Sink: Send + Sync {
    /// Accepts the encoded bytes of unit `index`. A failure drops that one image.
    fn write(&self, index: u64, format: ImageFormat, bytes: &[u8]) -> Result<(), WriteError>;
}

/// Writes each image to `<dir>/<prefix>-<index>.<ext>`.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
    prefix: String,
}

impl DirSink {
    /// Creates `dir` (and its parents) if missing.
    pub fn create(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, WriteError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| WriteError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(DirSink {
            dir,
            prefix: prefix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: u64, format: ImageFormat) -> PathBuf {
        self.dir
            .join(format!("{}-{:06}.{}", self.prefix, index, format.extension()))
    }
}

impl Sink for DirSink {
    fn write(&self, index: u64, format: ImageFormat, bytes: &[u8]) -> Result<(), WriteError> {
        let path = self.path_for(index, format);
        std::fs::write(&path, bytes).map_err(|source| WriteError::Io { path, source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub index: u64,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Keeps every image in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    images: Mutex<Vec<StoredImage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the stored images, sorted by unit index.
    pub fn take(&self) -> Vec<StoredImage> {
        let mut images = std::mem::take(&mut *self.lock());
        images.sort_by_key(|image| image.index);
        images
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredImage>> {
        // A panic while pushing cannot leave the vector half-written.
        self.images.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for MemorySink {
    fn write(&self, index: u64, format: ImageFormat, bytes: &[u8]) -> Result<(), WriteError> {
        self.lock().push(StoredImage {
            index,
            format,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}
