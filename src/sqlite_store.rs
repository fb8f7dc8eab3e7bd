//! SQLite-backed [`ContentStore`] implementation.
//!
//! Duplicate rejection relies on the `UNIQUE` constraint on
//! `entries.fingerprint`: the insert uses `ON CONFLICT(fingerprint) DO
//! NOTHING`, and a zero row count means another writer (possibly another
//! process) already owns that fingerprint.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use content_intake_core::error::{IntakeError, Result};
use content_intake_core::models::{
    Category, CategoryCount, ContentEntry, EntrySummary, ListFilter, RawFormat,
};
use content_intake_core::store::ContentStore;

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`ContentStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::create_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage(err: sqlx::Error) -> IntakeError {
    IntakeError::Storage(err.to_string())
}

fn ts_from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| IntakeError::Storage(format!("collected_at out of range: {}", micros)))
}

fn parse_category(raw: &str) -> Result<Category> {
    raw.parse::<Category>()
        .map_err(|e| IntakeError::Storage(e.to_string()))
}

fn row_to_entry(row: &SqliteRow) -> Result<ContentEntry> {
    let raw_format: String = row.get("raw_format");
    let category: String = row.get("category");
    let metadata_json: String = row.get("metadata_json");
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
        .map_err(|e| IntakeError::Storage(format!("corrupt metadata_json: {}", e)))?;
    Ok(ContentEntry {
        id: row.get("id"),
        source: row.get("source"),
        raw_format: raw_format.parse::<RawFormat>()?,
        title: row.get("title"),
        extracted_text: row.get("extracted_text"),
        normalized_text: row.get("normalized_text"),
        fingerprint: row.get("fingerprint"),
        category: parse_category(&category)?,
        collected_at: ts_from_micros(row.get("collected_at"))?,
        metadata,
    })
}

fn row_to_summary(row: &SqliteRow) -> Result<EntrySummary> {
    let raw_format: String = row.get("raw_format");
    let category: String = row.get("category");
    Ok(EntrySummary {
        id: row.get("id"),
        source: row.get("source"),
        raw_format: raw_format.parse::<RawFormat>()?,
        title: row.get("title"),
        category: parse_category(&category)?,
        collected_at: ts_from_micros(row.get("collected_at"))?,
    })
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn put(&self, entry: &ContentEntry) -> Result<()> {
        let metadata_json =
            serde_json::to_string(&entry.metadata).map_err(|e| IntakeError::Storage(e.to_string()))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO entries (id, source, raw_format, title, extracted_text,
                                 normalized_text, fingerprint, category,
                                 collected_at, metadata_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(fingerprint) DO NOTHING
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.source)
        .bind(entry.raw_format.as_str())
        .bind(&entry.title)
        .bind(&entry.extracted_text)
        .bind(&entry.normalized_text)
        .bind(&entry.fingerprint)
        .bind(entry.category.as_str())
        .bind(entry.collected_at.timestamp_micros())
        .bind(&metadata_json)
        .execute(&self.pool)
        .await
        .map_err(storage)?
        .rows_affected();

        if inserted == 0 {
            let existing_id = self
                .find_by_fingerprint(&entry.fingerprint)
                .await?
                .ok_or_else(|| {
                    IntakeError::Storage(format!(
                        "insert ignored but fingerprint {} not found",
                        entry.fingerprint
                    ))
                })?;
            return Err(IntakeError::DuplicateEntry { existing_id });
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ContentEntry> {
        let row = sqlx::query(
            "SELECT id, source, raw_format, title, extracted_text, normalized_text, fingerprint, category, collected_at, metadata_json FROM entries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => row_to_entry(&row),
            None => Err(IntakeError::NotFound(id.to_string())),
        }
    }

    async fn set_category(&self, id: &str, category: Category) -> Result<()> {
        let updated = sqlx::query("UPDATE entries SET category = ? WHERE id = ?")
            .bind(category.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .rows_affected();
        if updated == 0 {
            return Err(IntakeError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT id FROM entries WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<EntrySummary>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query(
            r#"
            SELECT id, source, raw_format, title, category, collected_at
            FROM entries
            WHERE (?1 IS NULL OR category = ?1)
            ORDER BY collected_at DESC, id ASC
            LIMIT ?2
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_summary).collect()
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let rows = sqlx::query("SELECT category, COUNT(*) AS n FROM entries GROUP BY category")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let mut counts: Vec<CategoryCount> = Category::ALL
            .into_iter()
            .map(|category| CategoryCount { category, count: 0 })
            .collect();
        for row in &rows {
            let category = parse_category(row.get::<String, _>("category").as_str())?;
            let n: i64 = row.get("n");
            if let Some(slot) = counts.iter_mut().find(|c| c.category == category) {
                slot.count = n as u64;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, SubsecRound};
    use content_intake_core::fingerprint::fingerprint;
    use tempfile::TempDir;

    use super::*;

    async fn open_store(tmp: &TempDir) -> SqliteStore {
        let config = Config::minimal(tmp.path().join("intake.sqlite"));
        SqliteStore::open(&config).await.unwrap()
    }

    fn entry(id: &str, text: &str) -> ContentEntry {
        let mut metadata = BTreeMap::new();
        metadata.insert("page_count".to_string(), "2".to_string());
        ContentEntry {
            id: id.to_string(),
            source: "report.pdf".to_string(),
            raw_format: RawFormat::Pdf,
            title: Some("Quarterly report".to_string()),
            extracted_text: text.to_string(),
            normalized_text: text.to_lowercase(),
            fingerprint: fingerprint(&text.to_lowercase()),
            category: Category::Unclassified,
            collected_at: Utc::now().trunc_subsecs(6),
            metadata,
        }
    }

    #[tokio::test]
    async fn put_and_get_preserve_every_field() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let e = entry("a", "Some Report Text");
        store.put(&e).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), e);
    }

    #[tokio::test]
    async fn duplicate_put_reports_the_first_id() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        store.put(&entry("first", "same body")).await.unwrap();
        let err = store.put(&entry("second", "same body")).await.unwrap_err();
        match err {
            IntakeError::DuplicateEntry { existing_id } => assert_eq!(existing_id, "first"),
            other => panic!("unexpected error: {other}"),
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        assert!(matches!(
            store.get("missing").await,
            Err(IntakeError::NotFound(_))
        ));
        assert!(matches!(
            store.set_category("missing", Category::Replace).await,
            Err(IntakeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn category_updates_show_up_in_list_and_counts() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let mut older = entry("older", "first text");
        older.collected_at = older.collected_at - Duration::minutes(5);
        store.put(&older).await.unwrap();
        store.put(&entry("newer", "second text")).await.unwrap();
        store.set_category("older", Category::HumanOnly).await.unwrap();

        let all = store.list(&ListFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["newer", "older"]
        );

        let limited = store
            .list(&ListFilter {
                category: None,
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let human = store
            .list(&ListFilter {
                category: Some(Category::HumanOnly),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(human.len(), 1);
        assert_eq!(human[0].id, "older");

        let counts = store.category_counts().await.unwrap();
        let find = |c: Category| counts.iter().find(|x| x.category == c).unwrap().count;
        assert_eq!(find(Category::HumanOnly), 1);
        assert_eq!(find(Category::Unclassified), 1);
        assert_eq!(find(Category::Replace), 0);
    }

    #[tokio::test]
    async fn corrupt_rows_are_storage_errors() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        store.put(&entry("meta", "bad metadata row")).await.unwrap();
        store.put(&entry("time", "bad timestamp row")).await.unwrap();

        sqlx::query("UPDATE entries SET metadata_json = '{not json' WHERE id = 'meta'")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE entries SET collected_at = ? WHERE id = 'time'")
            .bind(i64::MAX)
            .execute(store.pool())
            .await
            .unwrap();

        match store.get("meta").await {
            Err(IntakeError::Storage(msg)) => assert!(msg.contains("metadata_json"), "{msg}"),
            other => panic!("expected storage error, got {other:?}"),
        }
        match store.get("time").await {
            Err(IntakeError::Storage(msg)) => assert!(msg.contains("collected_at"), "{msg}"),
            other => panic!("expected storage error, got {other:?}"),
        }
        assert!(matches!(
            store.list(&ListFilter::default()).await,
            Err(IntakeError::Storage(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_admit_exactly_one() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(open_store(&tmp).await);
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(&entry(&format!("e{i}"), "contended body")).await
            }));
        }
        let mut stored = 0;
        let mut duplicates = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => stored += 1,
                Err(IntakeError::DuplicateEntry { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(duplicates, 7);
    }
}
