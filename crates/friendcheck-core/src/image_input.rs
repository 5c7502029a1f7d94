//! Validated image bytes for enrollment and probe uploads.
//!
//! Everything here runs before any network call, so a bad file never
//! costs a backend round-trip.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest inline image the backend accepts (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum InputReadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image is empty")]
    Empty,
    #[error("not a recognizable image")]
    UnrecognizedFormat,
    #[error("unsupported image format {0:?} (need JPEG or PNG)")]
    UnsupportedFormat(ImageFormat),
    #[error("image is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("corrupt image: {0}")]
    Corrupt(String),
}

/// Image bytes that passed local validation.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ImageInput {
    /// Validate an in-memory buffer against the default size cap.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, InputReadError> {
        Self::from_bytes_with_limit(bytes, DEFAULT_MAX_IMAGE_BYTES)
    }

    pub fn from_bytes_with_limit(bytes: Vec<u8>, max_bytes: usize) -> Result<Self, InputReadError> {
        if bytes.is_empty() {
            return Err(InputReadError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(InputReadError::TooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }

        let format =
            image::guess_format(&bytes).map_err(|_| InputReadError::UnrecognizedFormat)?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(InputReadError::UnsupportedFormat(format));
        }

        // Header parse only; pixels are never decoded locally.
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| InputReadError::Corrupt(e.to_string()))?;

        Ok(Self {
            bytes,
            format,
            width,
            height,
        })
    }

    /// Read and validate an image file.
    pub async fn read(path: impl AsRef<Path>, max_bytes: usize) -> Result<Self, InputReadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| InputReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let input = Self::from_bytes_with_limit(bytes, max_bytes)?;
        tracing::debug!(
            path = %path.display(),
            format = ?input.format,
            width = input.width,
            height = input.height,
            size = input.bytes.len(),
            "image read"
        );
        Ok(input)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 180, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encode png fixture");
    out.into_inner()
}
