//! Entry retrieval and recategorization.
//!
//! Used by the `intake get` and `intake set-category` commands. The HTTP
//! server talks to the store directly.

use anyhow::Result;

use content_intake_core::models::{Category, ContentEntry};
use content_intake_core::store::ContentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// CLI entry point: fetches one entry and prints it to stdout.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let entry = store.get(id).await?;
    print_entry(&entry);
    store.pool().close().await;
    Ok(())
}

/// CLI entry point: reassigns an entry's category.
pub async fn run_set_category(config: &Config, id: &str, category: Category) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    store.set_category(id, category).await?;
    println!("{} -> {}", id, category);
    store.pool().close().await;
    Ok(())
}

fn print_entry(entry: &ContentEntry) {
    println!("--- Entry ---");
    println!("id:           {}", entry.id);
    println!(
        "title:        {}",
        entry.title.as_deref().unwrap_or("(untitled)")
    );
    println!("source:       {}", entry.source);
    println!("format:       {}", entry.raw_format);
    println!("category:     {}", entry.category);
    println!("fingerprint:  {}", entry.fingerprint);
    println!(
        "collected_at: {}",
        entry.collected_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    if !entry.metadata.is_empty() {
        println!("metadata:");
        for (key, value) in &entry.metadata {
            println!("  {}: {}", key, value);
        }
    }
    println!();

    println!("--- Text ---");
    println!("{}", entry.extracted_text);
}
