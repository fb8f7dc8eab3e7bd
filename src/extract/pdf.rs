//! PDF text extraction strategies.
//!
//! `pdf-extract` is tried first; `lopdf` page-by-page text extraction is
//! the fallback for documents the first parser rejects or reads as empty.
//! Both parsers are CPU-bound and run on the blocking thread pool. A panic
//! inside a parser surfaces as an ordinary strategy failure.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use super::strategy::{Strategy, StrategyChain};
use super::Extracted;

/// Default chain: `pdf-extract`, then `lopdf`.
pub fn default_chain() -> StrategyChain<[u8]> {
    StrategyChain::new().push(PdfExtractStrategy).push(LopdfStrategy)
}

pub struct PdfExtractStrategy;

#[async_trait]
impl Strategy<[u8]> for PdfExtractStrategy {
    fn name(&self) -> &str {
        "pdf-extract"
    }

    async fn extract(&self, input: &[u8]) -> Result<Extracted> {
        let bytes = input.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| anyhow!("parser aborted: {}", e))?
            .map_err(|e| anyhow!("pdf-extract could not read the document: {}", e))?;
        Ok(Extracted::new(text))
    }
}

pub struct LopdfStrategy;

#[async_trait]
impl Strategy<[u8]> for LopdfStrategy {
    fn name(&self) -> &str {
        "lopdf"
    }

    async fn extract(&self, input: &[u8]) -> Result<Extracted> {
        let bytes = input.to_vec();
        tokio::task::spawn_blocking(move || extract_with_lopdf(&bytes))
            .await
            .map_err(|e| anyhow!("parser aborted: {}", e))?
    }
}

fn extract_with_lopdf(bytes: &[u8]) -> Result<Extracted> {
    let doc = lopdf::Document::load_mem(bytes).context("lopdf could not load the document")?;
    let pages = doc.get_pages();
    let mut parts = Vec::with_capacity(pages.len());
    // Unreadable pages are skipped so one bad content stream does not
    // sink the whole document.
    for page_num in pages.keys() {
        if let Ok(text) = doc.extract_text(&[*page_num]) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }
    Ok(Extracted::new(parts.join("\n\n")).with_metadata("page_count", pages.len().to_string()))
}
