//! Storage abstraction for Content Intake.
//!
//! The [`ContentStore`] trait is the contract the ingestion orchestrator
//! depends on. Backends must make [`put`](ContentStore::put) an atomic
//! check-and-insert on the fingerprint: of two concurrent puts carrying the
//! same fingerprint, exactly one succeeds.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Category, CategoryCount, ContentEntry, EntrySummary, ListFilter};

/// Abstract storage backend for ingested entries.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put`](ContentStore::put) | Insert a new entry, rejecting duplicate fingerprints |
/// | [`get`](ContentStore::get) | Retrieve an entry by id |
/// | [`set_category`](ContentStore::set_category) | Reassign an entry's category |
/// | [`find_by_fingerprint`](ContentStore::find_by_fingerprint) | Fingerprint index lookup |
/// | [`list`](ContentStore::list) | Newest-first summaries |
/// | [`category_counts`](ContentStore::category_counts) | Entry counts per category |
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Inserts `entry`.
    ///
    /// Fails with [`IntakeError::DuplicateEntry`](crate::error::IntakeError::DuplicateEntry)
    /// carrying the id of the stored entry when the fingerprint is taken.
    async fn put(&self, entry: &ContentEntry) -> Result<()>;

    /// Fails with [`IntakeError::NotFound`](crate::error::IntakeError::NotFound)
    /// when no entry has this id.
    async fn get(&self, id: &str) -> Result<ContentEntry>;

    /// The only mutation allowed after creation.
    async fn set_category(&self, id: &str, category: Category) -> Result<()>;

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>>;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<EntrySummary>>;

    /// One row per category, including categories with zero entries.
    async fn category_counts(&self) -> Result<Vec<CategoryCount>>;
}
