use std::path::Path;

use crate::{ApiError, FailureKind};

/// Extensions the backend accepts, with the MIME type sent for each.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// A file that passed client-side checks and is ready for multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Maps a file name to its upload MIME type, rejecting anything the backend
/// would refuse.
pub fn mime_for_file_name(file_name: &str) -> Result<&'static str, ApiError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| {
            ApiError::new(
                FailureKind::UnsupportedFileType { extension },
                "only PDF, PNG and JPEG files are supported",
            )
        })
}

impl UploadFile {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ApiError> {
        let file_name = file_name.into();
        let mime = mime_for_file_name(&file_name)?;
        if bytes.is_empty() {
            return Err(ApiError::new(FailureKind::EmptyFile, file_name));
        }
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    /// Reads and validates a file from disk. The type check runs before the read.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        mime_for_file_name(&file_name)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ApiError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        Self::from_bytes(file_name, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_whitelisted_extensions_in_any_case() {
        assert_eq!(mime_for_file_name("scan.PDF").unwrap(), "application/pdf");
        assert_eq!(mime_for_file_name("photo.Jpeg").unwrap(), "image/jpeg");
        assert_eq!(mime_for_file_name("a.b.png").unwrap(), "image/png");
    }

    #[test]
    fn rejects_other_types_before_reading() {
        let err = mime_for_file_name("invoice.docx").unwrap_err();
        assert_eq!(
            err.kind,
            FailureKind::UnsupportedFileType {
                extension: "docx".to_string()
            }
        );
        let err = mime_for_file_name("README").unwrap_err();
        assert_eq!(
            err.kind,
            FailureKind::UnsupportedFileType {
                extension: String::new()
            }
        );
    }

    #[test]
    fn rejects_empty_file() {
        let err = UploadFile::from_bytes("empty.pdf", Vec::new()).unwrap_err();
        assert_eq!(err.kind, FailureKind::EmptyFile);
    }
}
