use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;

use crate::error::GenerationError;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A user-selected file plus the content type declared at the selection boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub mime_type: Option<String>,
}

impl SelectedImage {
    pub fn new(path: impl Into<PathBuf>, mime_type: Option<String>) -> Self {
        Self {
            path: path.into(),
            mime_type,
        }
    }

    /// Declares the content type from the file extension, like a browser file list does.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_for_path(&path).map(str::to_string);
        Self { path, mime_type }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|mime| mime.starts_with("image/"))
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Base64 image content paired with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type())
}

pub fn encode_image(file: &SelectedImage) -> Result<EncodedImage, GenerationError> {
    let bytes = fs::read(&file.path).map_err(|err| GenerationError::Encoding {
        path: file.path.display().to_string(),
        reason: err.to_string(),
    })?;
    Ok(EncodedImage {
        data: BASE64.encode(bytes),
        mime_type: file
            .mime_type
            .clone()
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
    })
}

/// Reads every file concurrently and waits for all of them.
///
/// Output order follows input order. Any failed read fails the batch; the
/// reported error is the first failure in input order.
pub fn encode_all(files: &[SelectedImage]) -> Result<Vec<EncodedImage>, GenerationError> {
    let results: Vec<Result<EncodedImage, GenerationError>> = thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| scope.spawn(move || encode_image(file)))
            .collect();
        handles
            .into_iter()
            .zip(files)
            .map(|(handle, file)| {
                handle.join().unwrap_or_else(|_| {
                    Err(GenerationError::Encoding {
                        path: file.path.display().to_string(),
                        reason: "reader thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });
    results.into_iter().collect()
}
