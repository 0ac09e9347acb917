//! URL download for document ingestion
//!
//! Downloads a remote PDF or image into memory with a size cap, sniffing the
//! document kind from the URL path first and the Content-Type header second.

use super::{ExtractError, FileKind};
use tracing::debug;
use url::Url;

/// A downloaded remote document
#[derive(Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub kind: FileKind,
    /// Shown to the user in the document list; the original URL
    pub display_name: String,
}

/// Sniff the document kind from the URL path extension
fn kind_from_url(url: &Url) -> Option<FileKind> {
    let path = url.path();
    let extension = path.rsplit_once('.').map(|(_, ext)| ext)?;
    FileKind::from_extension(extension)
}

/// Map a Content-Type header value to a document kind
fn kind_from_content_type(content_type: &str) -> Option<FileKind> {
    let ct = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match ct.as_str() {
        "application/pdf" => Some(FileKind::Pdf),
        "image/png" | "image/jpeg" | "image/jpg" => Some(FileKind::Image),
        _ => None,
    }
}

/// Download a document from `raw_url`, enforcing `max_bytes`.
///
/// The caller provides the HTTP client so timeouts and redirect policy are
/// configured in one place.
pub async fn download(
    client: &reqwest::Client,
    raw_url: &str,
    max_bytes: usize,
) -> Result<Download, ExtractError> {
    let parsed = Url::parse(raw_url).map_err(|e| ExtractError::Download {
        url: raw_url.to_string(),
        message: format!("invalid URL: {}", e),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractError::InvalidScheme {
            scheme: parsed.scheme().to_string(),
        });
    }

    let response = client
        .get(parsed.clone())
        .send()
        .await
        .map_err(|e| ExtractError::Download {
            url: raw_url.to_string(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(ExtractError::Download {
            url: raw_url.to_string(),
            message: format!("HTTP {}", response.status()),
        });
    }

    if let Some(length) = response.content_length() {
        if length as usize > max_bytes {
            return Err(ExtractError::TooLarge {
                size: length as usize,
                limit: max_bytes,
            });
        }
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::Download {
            url: raw_url.to_string(),
            message: e.to_string(),
        })?
        .to_vec();

    if bytes.len() > max_bytes {
        return Err(ExtractError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let kind = kind_from_url(&parsed)
        .or_else(|| kind_from_content_type(&content_type))
        .ok_or_else(|| ExtractError::UnsupportedContent {
            url: raw_url.to_string(),
            content_type,
        })?;

    debug!(url = raw_url, size = bytes.len(), ?kind, "url download complete");

    Ok(Download {
        bytes,
        kind,
        display_name: raw_url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_url_extension() {
        let url = Url::parse("https://example.com/papers/report.pdf").unwrap();
        assert_eq!(kind_from_url(&url), Some(FileKind::Pdf));

        let url = Url::parse("https://example.com/scan.JPG?dl=1").unwrap();
        assert_eq!(kind_from_url(&url), Some(FileKind::Image));

        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(kind_from_url(&url), None);
    }

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(kind_from_content_type("application/pdf"), Some(FileKind::Pdf));
        assert_eq!(
            kind_from_content_type("image/png; charset=binary"),
            Some(FileKind::Image)
        );
        assert_eq!(kind_from_content_type("text/html"), None);
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let client = reqwest::Client::new();
        let err = download(&client, "ftp://example.com/a.pdf", 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidScheme { .. }));
    }

    #[tokio::test]
    async fn test_rejects_unparseable_url() {
        let client = reqwest::Client::new();
        let err = download(&client, "not a url", 1024).await.unwrap_err();
        assert!(matches!(err, ExtractError::Download { .. }));
    }
}
