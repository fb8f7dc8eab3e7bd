//! Core data models used throughout Content Intake.
//!
//! These types represent submissions as they arrive, the entries persisted
//! for them, and the lightweight views used for listing and statistics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

/// Source format of a submission's raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawFormat {
    Text,
    Html,
    Pdf,
    Docx,
    Youtube,
}

impl RawFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawFormat::Text => "text",
            RawFormat::Html => "html",
            RawFormat::Pdf => "pdf",
            RawFormat::Docx => "docx",
            RawFormat::Youtube => "youtube",
        }
    }

    /// Detects the format of an uploaded file from its extension.
    pub fn from_filename(filename: &str) -> Result<Self, IntakeError> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                IntakeError::UnsupportedFormat(format!("file has no extension: {}", filename))
            })?;
        Self::from_extension(&ext).ok_or_else(|| {
            IntakeError::UnsupportedFormat(format!("unsupported file extension: .{}", ext))
        })
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" | "md" => Some(RawFormat::Text),
            "html" | "htm" => Some(RawFormat::Html),
            "pdf" => Some(RawFormat::Pdf),
            "docx" => Some(RawFormat::Docx),
            _ => None,
        }
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RawFormat {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(RawFormat::Text),
            "html" => Ok(RawFormat::Html),
            "pdf" => Ok(RawFormat::Pdf),
            "docx" => Ok(RawFormat::Docx),
            "youtube" => Ok(RawFormat::Youtube),
            other => Err(IntakeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Editorial category of an entry. New entries start as `Unclassified`
/// unless the submitter picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Replace,
    Augment,
    NewTasks,
    HumanOnly,
    #[default]
    Unclassified,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Replace,
        Category::Augment,
        Category::NewTasks,
        Category::HumanOnly,
        Category::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Replace => "replace",
            Category::Augment => "augment",
            Category::NewTasks => "new_tasks",
            Category::HumanOnly => "human_only",
            Category::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown category '{}'. Must be replace, augment, new_tasks, human_only, or unclassified.",
            self.0
        )
    }
}

impl std::error::Error for ParseCategoryError {}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Where a submission's payload comes from.
#[derive(Debug, Clone)]
pub enum SubmissionSource {
    /// A web page or remote document.
    Url { url: String },
    /// Uploaded file contents.
    File { bytes: Vec<u8>, filename: String },
    /// A YouTube video whose transcript is the content.
    YouTube { url: String },
    /// Text pasted directly by the operator.
    Text { text: String },
}

/// One request to add content to the store.
#[derive(Debug, Clone)]
pub struct Submission {
    pub source: SubmissionSource,
    pub category: Option<Category>,
    pub title: Option<String>,
}

impl Submission {
    pub fn new(source: SubmissionSource) -> Self {
        Self {
            source,
            category: None,
            title: None,
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::new(SubmissionSource::Url { url: url.into() })
    }

    pub fn file(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new(SubmissionSource::File {
            bytes,
            filename: filename.into(),
        })
    }

    pub fn youtube(url: impl Into<String>) -> Self {
        Self::new(SubmissionSource::YouTube { url: url.into() })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(SubmissionSource::Text { text: text.into() })
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Identifier recorded as the entry's source: URL or filename.
    pub fn source_label(&self) -> String {
        match &self.source {
            SubmissionSource::Url { url } | SubmissionSource::YouTube { url } => url.clone(),
            SubmissionSource::File { filename, .. } => filename.clone(),
            SubmissionSource::Text { .. } => "manual".to_string(),
        }
    }
}

/// The persisted record for one ingested item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub source: String,
    pub raw_format: RawFormat,
    pub title: Option<String>,
    pub extracted_text: String,
    pub normalized_text: String,
    pub fingerprint: String,
    pub category: Category,
    pub collected_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

impl ContentEntry {
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id.clone(),
            source: self.source.clone(),
            raw_format: self.raw_format,
            title: self.title.clone(),
            category: self.category,
            collected_at: self.collected_at,
        }
    }
}

/// Listing view of an entry without its text bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub id: String,
    pub source: String,
    pub raw_format: RawFormat,
    pub title: Option<String>,
    pub category: Category,
    pub collected_at: DateTime<Utc>,
}

/// Filter for [`ContentStore::list`](crate::store::ContentStore::list).
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<Category>,
    pub limit: Option<usize>,
}

/// Number of entries carrying one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_extensions() {
        assert_eq!(RawFormat::from_filename("a.TXT").unwrap(), RawFormat::Text);
        assert_eq!(RawFormat::from_filename("notes.md").unwrap(), RawFormat::Text);
        assert_eq!(RawFormat::from_filename("x/y/page.htm").unwrap(), RawFormat::Html);
        assert_eq!(RawFormat::from_filename("paper.pdf").unwrap(), RawFormat::Pdf);
        assert_eq!(RawFormat::from_filename("memo.docx").unwrap(), RawFormat::Docx);
    }

    #[test]
    fn rejects_unknown_or_missing_extension() {
        assert!(matches!(
            RawFormat::from_filename("sheet.xlsx"),
            Err(IntakeError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            RawFormat::from_filename("README"),
            Err(IntakeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn category_parsing_is_lenient_about_case_and_dashes() {
        assert_eq!("new-tasks".parse::<Category>().unwrap(), Category::NewTasks);
        assert_eq!("HUMAN_ONLY".parse::<Category>().unwrap(), Category::HumanOnly);
        assert_eq!(" replace ".parse::<Category>().unwrap(), Category::Replace);
        assert!("misc".parse::<Category>().is_err());
    }

    #[test]
    fn category_defaults_to_unclassified() {
        assert_eq!(Category::default(), Category::Unclassified);
        let json = serde_json::to_string(&Category::NewTasks).unwrap();
        assert_eq!(json, "\"new_tasks\"");
    }

    #[test]
    fn text_submissions_are_labelled_manual() {
        let sub = Submission::text("hi").with_category(Category::Augment);
        assert_eq!(sub.source_label(), "manual");
        assert_eq!(sub.category, Some(Category::Augment));
    }
}
