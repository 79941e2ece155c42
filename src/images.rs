use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use std::path::{Path, PathBuf};

use crate::AnalysisError;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Represents the source of an image for analysis
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Image from a file path
    Path(PathBuf),
    /// Raw image bytes, e.g. a captured camera frame
    Bytes { data: Vec<u8>, mime_type: String },
    /// Already encoded `data:<mime>;base64,<payload>` URI
    DataUri(String),
}

/// An image ready to be sent inline to the model
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Base64 payload without the `data:` prefix
    pub data: String,
}

impl EncodedImage {
    /// The `data:` URI form of the image
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Read and base64-encode an image source
///
/// # Errors
/// Returns [`AnalysisError::Encoding`] if the file cannot be read or a data
/// URI carries no base64 payload.
pub async fn encode(source: &ImageSource) -> Result<EncodedImage, AnalysisError> {
    match source {
        ImageSource::Path(path) => encode_file(path).await,
        ImageSource::Bytes { data, mime_type } => Ok(encode_bytes(data, mime_type)),
        ImageSource::DataUri(uri) => parse_data_uri(uri),
    }
}

async fn encode_file(path: &Path) -> Result<EncodedImage, AnalysisError> {
    let image_data = tokio::fs::read(path)
        .await
        .map_err(|e| AnalysisError::Encoding(format!("{}: {}", path.display(), e)))?;

    if image_data.is_empty() {
        return Err(AnalysisError::Encoding(format!(
            "{}: file is empty",
            path.display()
        )));
    }

    debug!("Image file size: {} bytes", image_data.len());
    Ok(encode_bytes(&image_data, mime_type_for(path)))
}

fn encode_bytes(data: &[u8], mime_type: &str) -> EncodedImage {
    EncodedImage {
        mime_type: mime_type.to_string(),
        data: STANDARD.encode(data),
    }
}

/// Split a data URI into MIME type and payload (the part after the first comma)
fn parse_data_uri(uri: &str) -> Result<EncodedImage, AnalysisError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| AnalysisError::Encoding("data URI has no payload".to_string()))?;

    let header = header.strip_prefix("data:").ok_or_else(|| {
        AnalysisError::Encoding("image string is not a data URI".to_string())
    })?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
        AnalysisError::Encoding("data URI is not base64-encoded".to_string())
    })?;

    if payload.is_empty() {
        return Err(AnalysisError::Encoding("data URI has no payload".to_string()));
    }

    Ok(EncodedImage {
        mime_type: if mime_type.is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type.to_string()
        },
        data: payload.to_string(),
    })
}

/// Guess the MIME type from the file extension, defaulting to JPEG
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("noext")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_encode_bytes_round_trips_through_data_uri() {
        let source = ImageSource::Bytes {
            data: b"test data".to_vec(),
            mime_type: "image/png".to_string(),
        };
        let encoded = encode(&source).await.unwrap();
        assert_eq!(encoded.data, "dGVzdCBkYXRh");
        assert_eq!(encoded.data_uri(), "data:image/png;base64,dGVzdCBkYXRh");

        let reparsed = encode(&ImageSource::DataUri(encoded.data_uri())).await.unwrap();
        assert_eq!(reparsed, encoded);
    }

    #[tokio::test]
    async fn test_encode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pho.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let encoded = encode(&ImageSource::Path(path)).await.unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        assert!(!encoded.data.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_encoding_error() {
        let result = encode(&ImageSource::Path(PathBuf::from("/nonexistent/food.jpg"))).await;
        assert!(matches!(result, Err(AnalysisError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_empty_file_is_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, b"").unwrap();

        let result = encode(&ImageSource::Path(path)).await;
        assert!(matches!(result, Err(AnalysisError::Encoding(_))));
    }

    #[test]
    fn test_bad_data_uris() {
        for uri in [
            "not a uri",
            "data:image/png;base64,",
            "data:image/png,abc",
            "image/png;base64,abc",
        ] {
            assert!(
                matches!(parse_data_uri(uri), Err(AnalysisError::Encoding(_))),
                "expected encoding error for {uri}"
            );
        }
    }
}
