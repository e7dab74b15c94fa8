//! Upload checks for images handed to OCR.

use std::path::Path;

use ocrchat_core::error::OcrChatError;

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Image container of an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Classify a file name by its extension (case-insensitive).
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// Check an upload's name and size before running OCR on it.
pub fn validate_upload(
    filename: &str,
    data: &[u8],
    max_bytes: usize,
) -> Result<ImageKind, OcrChatError> {
    let kind = ImageKind::from_filename(filename).ok_or_else(|| {
        OcrChatError::Ocr(format!(
            "Unsupported file '{}': expected one of {}",
            filename,
            ALLOWED_EXTENSIONS.join(", ")
        ))
    })?;
    if data.is_empty() {
        return Err(OcrChatError::Ocr("Empty image data".to_string()));
    }
    if data.len() > max_bytes {
        return Err(OcrChatError::Ocr(format!(
            "Image is {} bytes, limit is {} bytes",
            data.len(),
            max_bytes
        )));
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename_accepts_allowed() {
        assert_eq!(ImageKind::from_filename("scan.png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_filename("scan.jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_filename("scan.jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_filename("SCAN.JPG"), Some(ImageKind::Jpeg));
        assert_eq!(
            ImageKind::from_filename("receipts/2024.03.png"),
            Some(ImageKind::Png)
        );
    }

    #[test]
    fn test_from_filename_rejects_others() {
        assert_eq!(ImageKind::from_filename("scan.gif"), None);
        assert_eq!(ImageKind::from_filename("scan.pdf"), None);
        assert_eq!(ImageKind::from_filename("png"), None);
        assert_eq!(ImageKind::from_filename(""), None);
    }

    #[test]
    fn test_validate_upload() {
        assert_eq!(
            validate_upload("a.png", &[1, 2, 3], 10).unwrap(),
            ImageKind::Png
        );
        assert!(validate_upload("a.bmp", &[1, 2, 3], 10).is_err());
        assert!(validate_upload("a.png", &[], 10).is_err());
        let err = validate_upload("a.jpg", &[0; 11], 10).unwrap_err();
        assert!(err.to_string().contains("limit is 10 bytes"));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(ImageKind::Png.mime_type(), "image/png");
        assert_eq!(ImageKind::Jpeg.mime_type(), "image/jpeg");
    }
}
