//! Fetching remote documents for URL submissions.

use anyhow::{bail, Result};
use reqwest::header::CONTENT_TYPE;

use content_intake_core::models::RawFormat;

/// A fetched body and the format it was classified as.
#[derive(Debug)]
pub struct FetchedDocument {
    pub format: Option<RawFormat>,
    pub content_type: String,
    pub final_url: String,
    pub bytes: Vec<u8>,
}

/// Downloads `url`, refusing bodies larger than `max_bytes`.
pub async fn fetch(client: &reqwest::Client, url: &str, max_bytes: u64) -> Result<FetchedDocument> {
    let mut response = client.get(url).send().await?.error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let final_url = response.url().to_string();
    let bytes = read_bounded(&mut response, max_bytes).await?;

    Ok(FetchedDocument {
        format: classify(&content_type, &final_url),
        content_type,
        final_url,
        bytes,
    })
}

/// Reads a response body, failing once it grows past `max_bytes`.
pub async fn read_bounded(response: &mut reqwest::Response, max_bytes: u64) -> Result<Vec<u8>> {
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            bail!("response of {} bytes exceeds limit of {} bytes", len, max_bytes);
        }
    }

    // Content-Length can be absent or wrong, so the limit is enforced while reading.
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
            bail!("response body exceeds limit of {} bytes", max_bytes);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Sends `request` and returns the body as lossy UTF-8, bounded like
/// [`read_bounded`].
pub async fn fetch_text(request: reqwest::RequestBuilder, max_bytes: u64) -> Result<String> {
    let mut response = request.send().await?.error_for_status()?;
    let bytes = read_bounded(&mut response, max_bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Maps a Content-Type (or, failing that, the URL path extension) to a format.
pub fn classify(content_type: &str, url: &str) -> Option<RawFormat> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => return Some(RawFormat::Html),
        "application/pdf" => return Some(RawFormat::Pdf),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            return Some(RawFormat::Docx)
        }
        "text/plain" | "text/markdown" => return Some(RawFormat::Text),
        _ => {}
    }
    let path = url::Url::parse(url).ok()?.path().to_string();
    let ext = std::path::Path::new(&path).extension()?.to_str()?.to_string();
    RawFormat::from_extension(&ext)
}
