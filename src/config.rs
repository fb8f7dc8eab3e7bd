use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Largest accepted upload or fetched body, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Per-request HTTP timeout for page, document and caption fetches.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Outer deadline around the whole extraction step.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Preferred caption languages, most preferred first.
    #[serde(default = "default_youtube_languages")]
    pub youtube_languages: Vec<String>,
    /// `yt-dlp` executable used as the alternate transcript downloader.
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: String,
    /// Limit on one `yt-dlp` run. Must be below `timeout_secs` so a stalled
    /// run fails as a transcript strategy, not as the whole extraction.
    #[serde(default = "default_yt_dlp_timeout_secs")]
    pub yt_dlp_timeout_secs: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            youtube_languages: default_youtube_languages(),
            yt_dlp_path: default_yt_dlp_path(),
            yt_dlp_timeout_secs: default_yt_dlp_timeout_secs(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_user_agent() -> String {
    format!("content-intake/{}", env!("CARGO_PKG_VERSION"))
}
fn default_youtube_languages() -> Vec<String> {
    vec!["en".to_string()]
}
fn default_yt_dlp_path() -> String {
    "yt-dlp".to_string()
}
fn default_yt_dlp_timeout_secs() -> u64 {
    45
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    ["txt", "md", "html", "htm", "pdf", "docx"]
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect()
}

impl Config {
    /// Config with every default and the database at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            extract: ExtractConfig::default(),
            server: ServerConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.extract.max_file_bytes == 0 {
        anyhow::bail!("extract.max_file_bytes must be > 0");
    }
    if config.extract.fetch_timeout_secs == 0 || config.extract.timeout_secs == 0 {
        anyhow::bail!("extract timeouts must be > 0");
    }
    if config.extract.yt_dlp_timeout_secs == 0
        || config.extract.yt_dlp_timeout_secs >= config.extract.timeout_secs
    {
        anyhow::bail!(
            "extract.yt_dlp_timeout_secs ({}) must be > 0 and below extract.timeout_secs ({})",
            config.extract.yt_dlp_timeout_secs,
            config.extract.timeout_secs
        );
    }
    if config.extract.youtube_languages.is_empty() {
        anyhow::bail!("extract.youtube_languages must list at least one language");
    }
    if config.import.include_globs.is_empty() {
        anyhow::bail!("import.include_globs must not be empty");
    }
    Ok(())
}
