//! Bulk import of archived snippets from a local directory.
//!
//! Walks a directory tree, applies include/exclude glob patterns from
//! `[import]`, and submits every matching file through the [`Ingestor`].
//! Files are processed in sorted path order so repeated imports are
//! deterministic: the first file carrying some content wins, later copies
//! are reported as duplicates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use content_intake_core::models::{Category, Submission};

use crate::config::{Config, ImportConfig};
use crate::ingest::{IngestOutcome, Ingestor};
use crate::sqlite_store::SqliteStore;

/// Per-outcome counts for one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Lists files under `root` matching the import globs, sorted by path.
pub fn scan_directory(root: &Path, import: &ImportConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Import root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&import.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(import.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(import.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy();

        if exclude_set.is_match(rel_str.as_ref()) || !include_set.is_match(rel_str.as_ref()) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Submits each file in order and tallies the outcomes.
pub async fn import_files(
    ingestor: &Ingestor,
    root: &Path,
    files: &[PathBuf],
    category: Option<Category>,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for path in files {
        let label = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read file");
                println!("  failed     {}  ({})", label, e);
                summary.failed += 1;
                continue;
            }
        };

        let mut submission = Submission::file(bytes, label.clone());
        if let Some(category) = category {
            submission = submission.with_category(category);
        }

        match ingestor.submit(submission).await.outcome {
            IngestOutcome::Stored { id, .. } => {
                println!("  stored     {}  {}", label, id);
                summary.stored += 1;
            }
            IngestOutcome::Duplicate { existing_id } => {
                println!("  duplicate  {}  of {}", label, existing_id);
                summary.duplicates += 1;
            }
            IngestOutcome::Failed(err) => {
                println!("  failed     {}  [{}] {}", label, err.kind(), err);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// CLI entry point for `intake import <dir>`.
pub async fn run_import(
    config: &Config,
    root: &Path,
    category: Option<Category>,
    dry_run: bool,
) -> Result<()> {
    let files = scan_directory(root, &config.import)?;
    println!("Found {} file(s) under {}", files.len(), root.display());

    if dry_run {
        for path in &files {
            println!("  {}", path.strip_prefix(root).unwrap_or(path).display());
        }
        println!("Dry run: nothing submitted.");
        return Ok(());
    }

    let store = Arc::new(SqliteStore::open(config).await?);
    let ingestor = Ingestor::from_config(config, store.clone())?;
    let summary = import_files(&ingestor, root, &files, category).await;

    println!(
        "Import complete: {} stored, {} duplicate(s), {} failed",
        summary.stored, summary.duplicates, summary.failed
    );

    store.pool().close().await;
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
