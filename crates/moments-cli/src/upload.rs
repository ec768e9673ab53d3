//! Image intake for the client: format sniffing, size ceilings, and the
//! ordered collection the user builds up before analysis.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;
use moments_core::limits::MB;
use thiserror::Error;
use uuid::Uuid;

/// Originals above this size are refused outright.
pub const MAX_ORIGINAL_BYTES: u64 = 30 * MB;

/// Originals above this size trigger a notice that they will be compressed.
pub const COMPRESSION_NOTICE_BYTES: u64 = 5 * MB;

pub const PREVIEW_COLUMNS: usize = 6;
pub const PREVIEW_ROWS: usize = 3;
pub const MAX_PREVIEW_COUNT: usize = PREVIEW_COLUMNS * PREVIEW_ROWS;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("仅支持JPG、PNG、JPEG格式")]
    UnsupportedFormat,

    #[error("单张原图不能超过{}MB", MAX_ORIGINAL_BYTES / MB)]
    TooLarge { size_bytes: u64 },

    #[error("无法读取图片: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Detects the format from the file's magic bytes rather than its name.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// One accepted original image.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub id: String,
    pub name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let size_bytes = fs::metadata(path)?.len();
        if size_bytes > MAX_ORIGINAL_BYTES {
            return Err(UploadError::TooLarge { size_bytes });
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, fs::read(path)?)
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadError> {
        let size_bytes = bytes.len() as u64;
        if size_bytes > MAX_ORIGINAL_BYTES {
            return Err(UploadError::TooLarge { size_bytes });
        }
        let kind = ImageKind::sniff(&bytes).ok_or(UploadError::UnsupportedFormat)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            bytes,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes() as f64 / MB as f64
    }

    pub fn needs_compression_notice(&self) -> bool {
        self.size_bytes() > COMPRESSION_NOTICE_BYTES
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.kind.mime(), BASE64.encode(&self.bytes))
    }
}

/// Result of adding a batch of files.
#[derive(Debug, Default)]
pub struct AddOutcome {
    pub added: usize,
    pub rejected: Vec<(PathBuf, UploadError)>,
    /// At least one accepted original is large enough to be compressed.
    pub compression_notice: bool,
}

/// Ordered set of accepted images plus the preview toggle.
#[derive(Debug, Default)]
pub struct ImageCollection {
    images: Vec<ImageAsset>,
    show_all: bool,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every acceptable file in order; rejected files are reported but
    /// never abort the batch.
    pub fn add_paths<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for path in paths {
            let path = path.as_ref();
            match ImageAsset::from_path(path) {
                Ok(asset) => {
                    outcome.compression_notice |= asset.needs_compression_notice();
                    self.push(asset);
                    outcome.added += 1;
                }
                Err(e) => {
                    log::debug!("Rejected {}: {}", path.display(), e);
                    outcome.rejected.push((path.to_path_buf(), e));
                }
            }
        }
        if outcome.added > 0 {
            self.show_all = false;
        }
        outcome
    }

    pub fn push(&mut self, asset: ImageAsset) {
        self.images.push(asset);
    }

    pub fn remove(&mut self, id: &str) -> Option<ImageAsset> {
        let index = self.images.iter().position(|image| image.id == id)?;
        let removed = self.images.remove(index);
        if self.images.len() <= MAX_PREVIEW_COUNT {
            self.show_all = false;
        }
        Some(removed)
    }

    /// Removes the first image with the given file name.
    pub fn remove_by_name(&mut self, name: &str) -> Option<ImageAsset> {
        let id = self.images.iter().find(|image| image.name == name)?.id.clone();
        self.remove(&id)
    }

    pub fn images(&self) -> &[ImageAsset] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn set_show_all(&mut self, show_all: bool) {
        self.show_all = show_all && self.has_hidden();
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn has_hidden(&self) -> bool {
        self.images.len() > MAX_PREVIEW_COUNT
    }

    /// Images currently shown in the preview grid.
    pub fn visible(&self) -> &[ImageAsset] {
        if self.show_all {
            &self.images
        } else {
            &self.images[..self.images.len().min(MAX_PREVIEW_COUNT)]
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.images.len() - self.visible().len()
    }

    /// The leading images that will be sent for analysis.
    pub fn selected(&self, max: usize) -> &[ImageAsset] {
        &self.images[..self.images.len().min(max)]
    }
}
