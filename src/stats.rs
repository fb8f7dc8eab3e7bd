//! Store overview and listings.
//!
//! `intake stats` prints entry counts per category; `intake list` prints
//! the newest entries as a table.

use anyhow::Result;

use content_intake_core::models::{Category, ListFilter};
use content_intake_core::store::ContentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let counts = store.category_counts().await?;
    let total: u64 = counts.iter().map(|c| c.count).sum();

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Content Intake Store Stats");
    println!("==========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Entries:     {}", total);
    println!();
    println!("  By category:");
    for c in &counts {
        println!("  {:<16} {:>6}", c.category.as_str(), c.count);
    }
    println!();

    store.pool().close().await;
    Ok(())
}

/// Run the list command: newest entries first, optionally filtered.
pub async fn run_list(config: &Config, category: Option<Category>, limit: usize) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let entries = store
        .list(&ListFilter {
            category,
            limit: Some(limit),
        })
        .await?;

    if entries.is_empty() {
        println!("No entries.");
    } else {
        println!(
            "{:<36}  {:<8} {:<14} {:<16}  {}",
            "ID", "FORMAT", "CATEGORY", "COLLECTED", "TITLE / SOURCE"
        );
        for e in &entries {
            println!(
                "{:<36}  {:<8} {:<14} {:<16}  {}",
                e.id,
                e.raw_format.as_str(),
                e.category.as_str(),
                e.collected_at.format("%Y-%m-%d %H:%M"),
                e.title.as_deref().unwrap_or(&e.source)
            );
        }
    }

    store.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
