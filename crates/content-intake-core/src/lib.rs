//! # Content Intake Core
//!
//! Runtime-free logic shared by every Content Intake surface: the data
//! model, the error taxonomy, text normalization, fingerprint-based
//! duplicate detection, and the content store abstraction.
//!
//! This crate contains no tokio, sqlx, network, or filesystem I/O.

pub mod error;
pub mod fingerprint;
pub mod models;
pub mod normalize;
pub mod store;

pub use error::{ErrorKind, IntakeError, StrategyFailure};
