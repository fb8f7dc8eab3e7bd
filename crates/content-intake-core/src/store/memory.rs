//! In-memory [`ContentStore`] implementation for tests and library callers.
//!
//! Entries and the fingerprint index live behind one `std::sync::Mutex`,
//! so the duplicate check and the insert in [`put`](ContentStore::put)
//! happen under the same lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{IntakeError, Result};
use crate::models::{Category, CategoryCount, ContentEntry, EntrySummary, ListFilter};

use super::ContentStore;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, ContentEntry>,
    by_fingerprint: HashMap<String, String>,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|g| g.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| IntakeError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn put(&self, entry: &ContentEntry) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.by_fingerprint.get(&entry.fingerprint) {
            return Err(IntakeError::DuplicateEntry {
                existing_id: existing.clone(),
            });
        }
        if inner.entries.contains_key(&entry.id) {
            return Err(IntakeError::Storage(format!(
                "entry id already in use: {}",
                entry.id
            )));
        }
        inner
            .by_fingerprint
            .insert(entry.fingerprint.clone(), entry.id.clone());
        inner.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ContentEntry> {
        let inner = self.lock()?;
        inner
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| IntakeError::NotFound(id.to_string()))
    }

    async fn set_category(&self, id: &str, category: Category) -> Result<()> {
        let mut inner = self.lock()?;
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| IntakeError::NotFound(id.to_string()))?;
        entry.category = category;
        Ok(())
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>> {
        let inner = self.lock()?;
        Ok(inner.by_fingerprint.get(fingerprint).cloned())
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<EntrySummary>> {
        let inner = self.lock()?;
        let mut summaries: Vec<EntrySummary> = inner
            .entries
            .values()
            .filter(|e| filter.category.map_or(true, |c| e.category == c))
            .map(ContentEntry::summary)
            .collect();
        summaries.sort_by(|a, b| {
            b.collected_at
                .cmp(&a.collected_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(limit) = filter.limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let inner = self.lock()?;
        Ok(Category::ALL
            .into_iter()
            .map(|category| CategoryCount {
                category,
                count: inner
                    .entries
                    .values()
                    .filter(|e| e.category == category)
                    .count() as u64,
            })
            .collect())
    }
}
