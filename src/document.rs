//! The document holder: the single PDF loaded into a session.
//!
//! Inference APIs take documents as base64 text embedded in the JSON request
//! body, so the bytes are encoded once on upload and the encoded form is
//! shared (`Arc<str>`) by every analysis and chat call. The raw bytes are not
//! kept; [`Document::decode`] recovers them when needed.
//!
//! The render handle is a temp file holding the original bytes. It lives as
//! long as the `Document` (and its clones), so a local viewer can open the
//! path for the whole session; dropping the last clone on reset removes it.

use crate::error::LuminaError;
use crate::upload::Upload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

/// The only media type a session accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Returns `true` if `media_type` names a PDF.
///
/// Ignores ASCII case and surrounding whitespace; parameters such as
/// `; charset=binary` are not accepted.
pub fn is_pdf_media_type(media_type: &str) -> bool {
    media_type.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE)
}

/// A locally openable copy of the document.
#[derive(Clone)]
pub struct RenderHandle {
    file: Arc<NamedTempFile>,
}

impl RenderHandle {
    fn create(bytes: &[u8]) -> Result<Self, LuminaError> {
        let mut file = tempfile::Builder::new()
            .prefix("lumina-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| LuminaError::Internal(format!("tempfile: {e}")))?;
        file.write_all(bytes)
            .map_err(|e| LuminaError::Internal(format!("tempfile write: {e}")))?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenderHandle").field(&self.path()).finish()
    }
}

/// The loaded PDF. Immutable once built.
#[derive(Clone)]
pub struct Document {
    display_name: String,
    byte_size: u64,
    encoded: Arc<str>,
    render_handle: RenderHandle,
}

impl Document {
    /// Validate an upload and build the document from it.
    ///
    /// # Errors
    /// [`LuminaError::InvalidFileType`] when the declared media type is not
    /// `application/pdf`. The bytes themselves are not inspected.
    pub fn from_upload(upload: Upload) -> Result<Self, LuminaError> {
        if !is_pdf_media_type(&upload.media_type) {
            return Err(LuminaError::InvalidFileType {
                name: upload.name,
                media_type: upload.media_type,
            });
        }

        let byte_size = upload.bytes.len() as u64;
        let encoded: Arc<str> = STANDARD.encode(&upload.bytes).into();
        let render_handle = RenderHandle::create(&upload.bytes)?;
        debug!(
            "Encoded '{}': {} bytes → {} bytes base64",
            upload.name,
            byte_size,
            encoded.len()
        );

        Ok(Self {
            display_name: upload.name,
            byte_size,
            encoded,
            render_handle,
        })
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Base64 (standard alphabet, padded) encoding of the full content.
    pub fn encoded_content(&self) -> &str {
        &self.encoded
    }

    /// The encoded content as a shared handle, for request parts.
    pub(crate) fn shared_content(&self) -> Arc<str> {
        Arc::clone(&self.encoded)
    }

    pub fn media_type(&self) -> &'static str {
        PDF_MEDIA_TYPE
    }

    pub fn render_handle(&self) -> &RenderHandle {
        &self.render_handle
    }

    /// Decode the transport encoding back to the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.encoded.as_bytes())
    }

    /// Human-readable size, e.g. `2 KB`.
    pub fn formatted_size(&self) -> String {
        format_size(self.byte_size)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name
            && self.byte_size == other.byte_size
            && self.encoded == other.encoded
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("display_name", &self.display_name)
            .field("byte_size", &self.byte_size)
            .field("encoded_len", &self.encoded.len())
            .field("render_handle", &self.render_handle)
            .finish()
    }
}

/// Format a byte count using base-1024 units and one decimal place.
///
/// `0` → `0 B`, `2048` → `2 KB`, `1572864` → `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_upload(name: &str, bytes: Vec<u8>) -> Upload {
        Upload::new(name, PDF_MEDIA_TYPE, bytes)
    }

    #[test]
    fn byte_size_matches_input_length() {
        for len in [0usize, 1, 3, 2048, 70_001] {
            let doc = Document::from_upload(pdf_upload("a.pdf", vec![7u8; len])).unwrap();
            assert_eq!(doc.byte_size(), len as u64);
        }
    }

    #[test]
    fn encoding_round_trips() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let doc = Document::from_upload(pdf_upload("bin.pdf", bytes.clone())).unwrap();
        assert_eq!(doc.decode().unwrap(), bytes);
    }

    #[test]
    fn rejects_non_pdf_media_type() {
        let upload = Upload::new("image.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        let err = Document::from_upload(upload).unwrap_err();
        match err {
            LuminaError::InvalidFileType { name, media_type } => {
                assert_eq!(name, "image.png");
                assert_eq!(media_type, "image/png");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn media_type_check_ignores_case_and_padding() {
        assert!(is_pdf_media_type("application/pdf"));
        assert!(is_pdf_media_type(" Application/PDF "));
        assert!(!is_pdf_media_type("application/pdf; charset=binary"));
        assert!(!is_pdf_media_type("application/octet-stream"));
        assert!(!is_pdf_media_type(""));
    }

    #[test]
    fn render_handle_holds_original_bytes() {
        let doc = Document::from_upload(pdf_upload("r.pdf", b"%PDF-1.7 body".to_vec())).unwrap();
        let on_disk = std::fs::read(doc.render_handle().path()).unwrap();
        assert_eq!(on_disk, b"%PDF-1.7 body");
        assert_eq!(
            doc.render_handle().path().extension().and_then(|e| e.to_str()),
            Some("pdf")
        );
    }

    #[test]
    fn render_handle_removed_with_last_clone() {
        let doc = Document::from_upload(pdf_upload("r.pdf", b"%PDF".to_vec())).unwrap();
        let path = doc.render_handle().path().to_path_buf();
        let clone = doc.clone();
        drop(doc);
        assert!(path.exists());
        drop(clone);
        assert!(!path.exists());
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_572_864), "1.5 MB");
        assert_eq!(format_size(10 * 1024 * 1024), "10 MB");
    }
}
