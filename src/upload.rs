//! Upload boundary: turn a user-supplied path, URL or buffer into one [`Upload`].
//!
//! An upload is exactly one file: a display name, a *declared* media type and
//! the raw bytes. The session only trusts the declared type (see
//! [`crate::document::Document::from_upload`]), so this module is where the
//! declaration comes from:
//!
//! * local paths — the file extension, falling back to `%PDF` magic bytes
//! * URLs — the `Content-Type` header, then the URL extension, then magic bytes
//! * in-memory buffers — whatever the caller passes to [`Upload::new`]

use crate::document::PDF_MEDIA_TYPE;
use crate::error::LuminaError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const OCTET_STREAM: &str = "application/octet-stream";

/// A single file handed to the session.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a local file and declare its media type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LuminaError> {
        let path = path.as_ref();
        let bytes = read_local(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_from_name(&name)
            .map(str::to_string)
            .unwrap_or_else(|| sniff_media_type(&bytes).to_string());

        debug!("Read local upload '{}' ({}, {} bytes)", name, media_type, bytes.len());
        Ok(Self::new(name, media_type, bytes))
    }

    /// Download a URL and declare its media type from the response.
    pub async fn fetch(url: &str, timeout_secs: u64) -> Result<Self, LuminaError> {
        info!("Downloading document from: {}", url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LuminaError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LuminaError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                LuminaError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(LuminaError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(essence);

        let name = filename_from_url(url);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LuminaError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        let media_type = match header_type {
            Some(t) if !t.is_empty() && t != OCTET_STREAM => t,
            _ => media_type_from_name(&name)
                .map(str::to_string)
                .unwrap_or_else(|| sniff_media_type(&bytes).to_string()),
        };

        info!("Downloaded '{}' ({}, {} bytes)", name, media_type, bytes.len());
        Ok(Self::new(name, media_type, bytes))
    }

    /// Resolve a path-or-URL string into an upload.
    pub async fn resolve(input: &str, timeout_secs: u64) -> Result<Self, LuminaError> {
        if is_url(input) {
            Self::fetch(input, timeout_secs).await
        } else {
            Self::from_path(input)
        }
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn read_local(path: &Path) -> Result<Vec<u8>, LuminaError> {
    if !path.exists() {
        return Err(LuminaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => LuminaError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => LuminaError::FileNotFound {
            path: PathBuf::from(path),
        },
        _ => LuminaError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Media type implied by a file name's extension, if it is a known one.
fn media_type_from_name(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        _ => return None,
    };
    Some(media_type)
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) {
        PDF_MEDIA_TYPE
    } else {
        OCTET_STREAM
    }
}

/// Strip parameters from a `Content-Type` value: `application/pdf; q=1` → `application/pdf`.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Extract a reasonable display name from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn extension_decides_media_type() {
        assert_eq!(media_type_from_name("report.pdf"), Some(PDF_MEDIA_TYPE));
        assert_eq!(media_type_from_name("REPORT.PDF"), Some(PDF_MEDIA_TYPE));
        assert_eq!(media_type_from_name("image.png"), Some("image/png"));
        assert_eq!(media_type_from_name("archive.tar.zst"), None);
        assert_eq!(media_type_from_name("README"), None);
    }

    #[test]
    fn sniffs_pdf_magic() {
        assert_eq!(sniff_media_type(b"%PDF-1.4\n"), PDF_MEDIA_TYPE);
        assert_eq!(sniff_media_type(b"PK\x03\x04"), OCTET_STREAM);
        assert_eq!(sniff_media_type(b""), OCTET_STREAM);
    }

    #[test]
    fn content_type_essence() {
        assert_eq!(essence("application/pdf"), "application/pdf");
        assert_eq!(essence("Application/PDF; name=x.pdf"), "application/pdf");
        assert_eq!(essence(""), "");
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(filename_from_url("https://example.com/a/paper.pdf"), "paper.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
    }

    #[test]
    fn from_path_reads_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7 hello")
            .unwrap();

        let upload = Upload::from_path(&path).unwrap();
        assert_eq!(upload.name, "report.pdf");
        assert_eq!(upload.media_type, PDF_MEDIA_TYPE);
        assert_eq!(upload.bytes, b"%PDF-1.7 hello");
    }

    #[test]
    fn from_path_sniffs_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.bin");
        std::fs::write(&path, b"%PDF-1.3").unwrap();
        assert_eq!(Upload::from_path(&path).unwrap().media_type, PDF_MEDIA_TYPE);

        let other = dir.path().join("blob.bin");
        std::fs::write(&other, b"\x00\x01").unwrap();
        assert_eq!(Upload::from_path(&other).unwrap().media_type, OCTET_STREAM);
    }

    #[test]
    fn from_path_missing_file() {
        let err = Upload::from_path("/definitely/not/a/real/file.pdf").unwrap_err();
        assert!(matches!(err, LuminaError::FileNotFound { .. }), "got: {err}");
    }
}
