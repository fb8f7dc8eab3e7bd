//! Ingestion pipeline orchestration.
//!
//! Runs one submission through extract → normalize → duplicate check →
//! store. The walk is strictly sequential and never retries:
//!
//! ```text
//! RECEIVED → EXTRACTED → NORMALIZED → DEDUP_CHECKED → STORED
//!     │          │            │              └──────→ REJECTED_DUPLICATE
//!     └──────────┴────────────┴─────────────────────→ FAILED(kind)
//! ```
//!
//! Every visited state is recorded in the [`IngestReport`] so callers can
//! show how far a submission got.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use content_intake_core::error::{ErrorKind, IntakeError};
use content_intake_core::fingerprint::check_duplicate;
use content_intake_core::models::{Category, ContentEntry, Submission};
use content_intake_core::normalize::normalize;
use content_intake_core::store::ContentStore;

use crate::config::Config;
use crate::extract::Extractor;

/// States a submission moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state", content = "error")]
pub enum IngestState {
    Received,
    Extracted,
    Normalized,
    DedupChecked,
    Stored,
    RejectedDuplicate,
    Failed(ErrorKind),
}

impl IngestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IngestState::Stored | IngestState::RejectedDuplicate | IngestState::Failed(_)
        )
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestState::Received => f.write_str("RECEIVED"),
            IngestState::Extracted => f.write_str("EXTRACTED"),
            IngestState::Normalized => f.write_str("NORMALIZED"),
            IngestState::DedupChecked => f.write_str("DEDUP_CHECKED"),
            IngestState::Stored => f.write_str("STORED"),
            IngestState::RejectedDuplicate => f.write_str("REJECTED_DUPLICATE"),
            IngestState::Failed(kind) => write!(f, "FAILED({})", kind),
        }
    }
}

/// Terminal result of one submission.
#[derive(Debug)]
pub enum IngestOutcome {
    Stored { id: String, category: Category },
    Duplicate { existing_id: String },
    Failed(IntakeError),
}

/// Outcome plus the states visited on the way.
#[derive(Debug)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub states: Vec<IngestState>,
}

impl IngestReport {
    pub fn final_state(&self) -> IngestState {
        self.states.last().copied().unwrap_or(IngestState::Received)
    }
}

/// Wires an [`Extractor`] to a [`ContentStore`].
#[derive(Clone)]
pub struct Ingestor {
    extractor: Extractor,
    store: Arc<dyn ContentStore>,
    extract_timeout: Duration,
}

impl Ingestor {
    pub fn new(extractor: Extractor, store: Arc<dyn ContentStore>, extract_timeout: Duration) -> Self {
        Self {
            extractor,
            store,
            extract_timeout,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn ContentStore>) -> anyhow::Result<Self> {
        Ok(Self::new(
            Extractor::new(&config.extract)?,
            store,
            Duration::from_secs(config.extract.timeout_secs),
        ))
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Processes one submission to a terminal state.
    pub async fn submit(&self, submission: Submission) -> IngestReport {
        let label = submission.source_label();
        let mut states = vec![IngestState::Received];
        info!(source = %label, "submission received");

        match self.run(&submission, &label, &mut states).await {
            Ok(outcome) => IngestReport { outcome, states },
            Err(err) => {
                warn!(source = %label, kind = %err.kind(), error = %err, "submission failed");
                states.push(IngestState::Failed(err.kind()));
                IngestReport {
                    outcome: IngestOutcome::Failed(err),
                    states,
                }
            }
        }
    }

    async fn run(
        &self,
        submission: &Submission,
        label: &str,
        states: &mut Vec<IngestState>,
    ) -> Result<IngestOutcome, IntakeError> {
        let (raw_format, extracted) =
            tokio::time::timeout(self.extract_timeout, self.extractor.extract(&submission.source))
                .await
                .map_err(|_| {
                    IntakeError::extraction(
                        "submission",
                        format!(
                            "extraction timed out after {}s",
                            self.extract_timeout.as_secs_f32()
                        ),
                    )
                })??;
        states.push(IngestState::Extracted);

        let normalized_text = normalize(&extracted.text);
        states.push(IngestState::Normalized);

        let check = check_duplicate(self.store.as_ref(), &normalized_text).await?;
        states.push(IngestState::DedupChecked);

        if let Some(existing_id) = check.existing_entry_id {
            return Ok(self.rejected(label, existing_id, states));
        }

        let category = submission.category.unwrap_or_default();
        let entry = ContentEntry {
            id: Uuid::new_v4().to_string(),
            source: label.to_string(),
            raw_format,
            title: submission.title.clone().or(extracted.title),
            extracted_text: extracted.text,
            normalized_text,
            fingerprint: check.fingerprint,
            category,
            collected_at: Utc::now().trunc_subsecs(6),
            metadata: extracted.metadata,
        };

        match self.store.put(&entry).await {
            Ok(()) => {
                states.push(IngestState::Stored);
                info!(source = %label, id = %entry.id, raw_format = %raw_format, category = %category, "entry stored");
                Ok(IngestOutcome::Stored {
                    id: entry.id,
                    category,
                })
            }
            // Lost a race with a concurrent submission of the same content.
            Err(IntakeError::DuplicateEntry { existing_id }) => {
                Ok(self.rejected(label, existing_id, states))
            }
            Err(e) => Err(e),
        }
    }

    fn rejected(
        &self,
        label: &str,
        existing_id: String,
        states: &mut Vec<IngestState>,
    ) -> IngestOutcome {
        states.push(IngestState::RejectedDuplicate);
        info!(source = %label, existing_id = %existing_id, "duplicate submission rejected");
        IngestOutcome::Duplicate { existing_id }
    }
}
