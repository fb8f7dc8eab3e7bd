//! Multi-format text extraction.
//!
//! The [`Extractor`] turns a [`SubmissionSource`] into plain text plus
//! metadata. Formats with more than one viable parser (PDF, YouTube) go
//! through a [`StrategyChain`]; the rest have a single extraction path.
//!
//! | Format | Path |
//! |--------|------|
//! | text | UTF-8 decode |
//! | html | `scraper` readable-text walk |
//! | pdf | `pdf-extract`, then `lopdf` |
//! | docx | `zip` + `quick-xml` over `word/document.xml` |
//! | youtube | watch-page caption track, then `yt-dlp` |

pub mod document;
pub mod pdf;
pub mod strategy;
pub mod web;
pub mod youtube;

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::info;

use content_intake_core::error::IntakeError;
use content_intake_core::models::{RawFormat, SubmissionSource};

use crate::config::ExtractConfig;
use strategy::StrategyChain;
use youtube::VideoRef;

/// Text and metadata produced by one extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub title: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Extracted {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Dispatches submissions to the right extraction path.
#[derive(Clone)]
pub struct Extractor {
    client: reqwest::Client,
    max_bytes: u64,
    pdf: StrategyChain<[u8]>,
    youtube: StrategyChain<VideoRef>,
}

impl Extractor {
    pub fn new(config: &ExtractConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            pdf: pdf::default_chain(),
            youtube: youtube::default_chain(client.clone(), config),
            client,
            max_bytes: config.max_file_bytes,
        })
    }

    pub fn with_pdf_strategies(mut self, chain: StrategyChain<[u8]>) -> Self {
        self.pdf = chain;
        self
    }

    pub fn with_youtube_strategies(mut self, chain: StrategyChain<VideoRef>) -> Self {
        self.youtube = chain;
        self
    }

    /// Extracts text from any submission source.
    ///
    /// File uploads are classified by extension before any parsing, so an
    /// unsupported extension never reaches an extractor.
    pub async fn extract(
        &self,
        source: &SubmissionSource,
    ) -> Result<(RawFormat, Extracted), IntakeError> {
        match source {
            SubmissionSource::File { bytes, filename } => {
                let format = RawFormat::from_filename(filename)?;
                let extracted = self.extract_bytes(format, bytes).await?;
                Ok((format, extracted))
            }
            SubmissionSource::YouTube { url } => {
                Ok((RawFormat::Youtube, self.extract_youtube(url).await?))
            }
            SubmissionSource::Url { url } if youtube::is_youtube_url(url) => {
                Ok((RawFormat::Youtube, self.extract_youtube(url).await?))
            }
            SubmissionSource::Url { url } => self.extract_url(url).await,
            SubmissionSource::Text { text } => Ok((RawFormat::Text, Extracted::new(text.clone()))),
        }
    }

    /// Extracts text from a payload whose format is already known.
    pub async fn extract_bytes(
        &self,
        format: RawFormat,
        bytes: &[u8],
    ) -> Result<Extracted, IntakeError> {
        if bytes.len() as u64 > self.max_bytes {
            return Err(IntakeError::extraction(
                format.as_str(),
                format!(
                    "payload of {} bytes exceeds limit of {} bytes",
                    bytes.len(),
                    self.max_bytes
                ),
            ));
        }
        match format {
            RawFormat::Text => Ok(document::extract_plain_text(bytes)),
            RawFormat::Html => Ok(document::extract_html(&String::from_utf8_lossy(bytes))),
            RawFormat::Pdf => self
                .pdf
                .run(bytes)
                .await
                .map_err(|failures| IntakeError::Extraction {
                    format: format.as_str().to_string(),
                    failures,
                }),
            RawFormat::Docx => {
                let owned = bytes.to_vec();
                tokio::task::spawn_blocking(move || document::extract_docx(&owned))
                    .await
                    .map_err(|e| IntakeError::extraction("docx", e.to_string()))?
                    .map_err(|e| IntakeError::extraction("docx", e))
            }
            RawFormat::Youtube => Err(IntakeError::UnsupportedFormat(
                "youtube content is fetched by URL, not uploaded".to_string(),
            )),
        }
    }

    /// Fetches a transcript for a YouTube URL or bare video id.
    pub async fn extract_youtube(&self, url: &str) -> Result<Extracted, IntakeError> {
        let video = youtube::parse_video_id(url).ok_or_else(|| {
            IntakeError::UnsupportedFormat(format!("not a YouTube video URL: {}", url))
        })?;
        let mut extracted =
            self.youtube
                .run(&video)
                .await
                .map_err(|failures| IntakeError::NoCaptions {
                    video_id: video.id.clone(),
                    failures,
                })?;
        extracted
            .metadata
            .entry("video_id".to_string())
            .or_insert_with(|| video.id.clone());
        Ok(extracted)
    }

    async fn extract_url(&self, url: &str) -> Result<(RawFormat, Extracted), IntakeError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| IntakeError::UnsupportedFormat(format!("invalid URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IntakeError::UnsupportedFormat(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let fetched = web::fetch(&self.client, url, self.max_bytes)
            .await
            .map_err(|e| IntakeError::extraction("url", format!("{:#}", e)))?;
        let format = fetched.format.ok_or_else(|| {
            IntakeError::UnsupportedFormat(format!(
                "unsupported content type '{}' at {}",
                fetched.content_type, fetched.final_url
            ))
        })?;
        info!(url = %fetched.final_url, raw_format = %format, bytes = fetched.bytes.len(), "fetched document");

        let extracted = self
            .extract_bytes(format, &fetched.bytes)
            .await?
            .with_metadata("content_type", fetched.content_type)
            .with_metadata("final_url", fetched.final_url);
        Ok((format, extracted))
    }
}
