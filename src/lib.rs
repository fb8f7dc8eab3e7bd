//! # Content Intake
//!
//! Manual-entry intake for a research corpus. An operator (or a bulk import
//! job) submits articles, PDFs, DOCX files, pasted text, or YouTube links;
//! each submission is reduced to plain text, normalized, fingerprinted,
//! checked for exact duplicates, and stored in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌───────────┐   ┌──────────┐
//! │ CLI / HTTP  │──▶│ Extractor  │──▶│ normalize │──▶│  SQLite  │
//! │ / import    │   │ strategies │   │ + sha256  │   │ (unique) │
//! └─────────────┘   └────────────┘   └───────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! intake init
//! intake add --file ./report.pdf --category augment
//! intake add --youtube "https://youtu.be/dQw4w9WgXcQ"
//! intake list --limit 10
//! intake serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Per-format text extraction and strategy chains |
//! | [`ingest`] | Submission state machine |
//! | [`sqlite_store`] | SQLite content store |
//! | [`import`] | Bulk directory import |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod config;
pub mod db;
pub mod extract;
pub mod get;
pub mod import;
pub mod ingest;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod stats;
