//! Exact-duplicate detection over normalized text.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of the normalized
//! text. Two entries with the same fingerprint are duplicates; no fuzzy
//! matching is attempted.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{IntakeError, Result};
use crate::store::ContentStore;

/// Deterministic digest of normalized text.
pub fn fingerprint(normalized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Result of checking one submission against the fingerprint index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupCheck {
    pub fingerprint: String,
    pub is_duplicate: bool,
    pub existing_entry_id: Option<String>,
}

/// Fingerprints `normalized_text` and looks it up in `index`.
///
/// Empty text is rejected with [`IntakeError::EmptyContent`] before any
/// hashing happens.
pub async fn check_duplicate<S>(index: &S, normalized_text: &str) -> Result<DedupCheck>
where
    S: ContentStore + ?Sized,
{
    if normalized_text.trim().is_empty() {
        return Err(IntakeError::EmptyContent);
    }
    let fp = fingerprint(normalized_text);
    let existing = index.find_by_fingerprint(&fp).await?;
    Ok(DedupCheck {
        is_duplicate: existing.is_some(),
        existing_entry_id: existing,
        fingerprint: fp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ContentEntry, RawFormat};
    use crate::store::memory::InMemoryStore;

    #[test]
    fn fingerprint_matches_sha256_hex() {
        assert_eq!(
            fingerprint("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("the same text");
        let b = fingerprint("the same text");
        assert_eq!(a, b);
        assert_ne!(a, fingerprint("the same text."));
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_lookup() {
        let store = InMemoryStore::new();
        let err = check_duplicate(&store, "").await.unwrap_err();
        assert!(matches!(err, IntakeError::EmptyContent));
        let err = check_duplicate(&store, "   ").await.unwrap_err();
        assert!(matches!(err, IntakeError::EmptyContent));
    }

    #[tokio::test]
    async fn reports_existing_entry_id() {
        let store = InMemoryStore::new();
        let fresh = check_duplicate(&store, "hello world").await.unwrap();
        assert!(!fresh.is_duplicate);
        assert_eq!(fresh.existing_entry_id, None);

        let entry = ContentEntry {
            id: "entry-1".to_string(),
            source: "hello.txt".to_string(),
            raw_format: RawFormat::Text,
            title: None,
            extracted_text: "Hello World".to_string(),
            normalized_text: "hello world".to_string(),
            fingerprint: fresh.fingerprint.clone(),
            category: Category::Unclassified,
            collected_at: chrono::Utc::now(),
            metadata: Default::default(),
        };
        store.put(&entry).await.unwrap();

        let again = check_duplicate(&store, "hello world").await.unwrap();
        assert!(again.is_duplicate);
        assert_eq!(again.existing_entry_id.as_deref(), Some("entry-1"));
    }
}
