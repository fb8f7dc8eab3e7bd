//! YouTube transcript extraction.
//!
//! Two strategies, tried in order:
//!
//! 1. [`TimedTextStrategy`] reads the caption track list embedded in the
//!    watch page's player response and downloads the preferred track.
//! 2. [`YtDlpStrategy`] runs the `yt-dlp` binary to write subtitles (manual
//!    or auto-generated) as WebVTT into a temporary directory.
//!
//! When both fail the caller reports `NoCaptions`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::strategy::{Strategy, StrategyChain};
use super::web::fetch_text;
use super::Extracted;
use crate::config::ExtractConfig;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid video id regex"));

static VTT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid vtt tag regex"));

const YOUTUBE_HOSTS: [&str; 6] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// A video identified by its 11-character id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: String,
}

impl VideoRef {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// True when `url` points at a YouTube host.
pub fn is_youtube_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|h| h == "youtu.be" || YOUTUBE_HOSTS.contains(&h.as_str()))
        .unwrap_or(false)
}

/// Parses a video id from the usual URL shapes or a bare id.
pub fn parse_video_id(input: &str) -> Option<VideoRef> {
    let input = input.trim();
    if VIDEO_ID_RE.is_match(input) {
        return Some(VideoRef {
            id: input.to_string(),
        });
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if host == "youtu.be" {
        segments.next().map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    candidate
        .filter(|id| VIDEO_ID_RE.is_match(id))
        .map(|id| VideoRef { id })
}

/// Default chain built from configuration: timedtext, then yt-dlp.
pub fn default_chain(client: reqwest::Client, config: &ExtractConfig) -> StrategyChain<VideoRef> {
    StrategyChain::new()
        .push(TimedTextStrategy {
            client,
            languages: config.youtube_languages.clone(),
            max_bytes: config.max_file_bytes,
        })
        .push(YtDlpStrategy {
            binary: config.yt_dlp_path.clone(),
            languages: config.youtube_languages.clone(),
            timeout: Duration::from_secs(config.yt_dlp_timeout_secs),
        })
}

// ============ timedtext ============

pub struct TimedTextStrategy {
    pub client: reqwest::Client,
    pub languages: Vec<String>,
    /// Size cap for the watch page and the caption document.
    pub max_bytes: u64,
}

#[async_trait]
impl Strategy<VideoRef> for TimedTextStrategy {
    fn name(&self) -> &str {
        "timedtext"
    }

    async fn extract(&self, video: &VideoRef) -> Result<Extracted> {
        let page = fetch_text(
            self.client
                .get(video.watch_url())
                .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8"),
            self.max_bytes,
        )
        .await
        .context("watch page")?;

        let player = extract_player_response(&page)
            .ok_or_else(|| anyhow!("player response not found in watch page"))?;
        let track = select_caption_track(&player, &self.languages)
            .ok_or_else(|| anyhow!("captions are disabled for this video"))?;
        debug!(video_id = %video.id, language = %track.language_code, auto = track.auto_generated, "fetching caption track");

        let xml = fetch_text(self.client.get(&track.base_url), self.max_bytes)
            .await
            .context("caption track")?;
        let text = parse_timedtext_xml(&xml)?;

        let mut extracted = Extracted::new(text)
            .with_metadata("video_id", video.id.clone())
            .with_metadata("language", track.language_code.clone())
            .with_metadata("auto_generated", track.auto_generated.to_string());
        let details = &player["videoDetails"];
        if let Some(title) = details["title"].as_str() {
            extracted.title = Some(title.to_string());
        }
        if let Some(channel) = details["author"].as_str() {
            extracted = extracted.with_metadata("channel", channel);
        }
        if let Some(secs) = details["lengthSeconds"].as_str() {
            extracted = extracted.with_metadata("duration_seconds", secs);
        }
        Ok(extracted)
    }
}

/// Caption track chosen from the player response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub auto_generated: bool,
}

/// Locates and parses the `ytInitialPlayerResponse` object in a watch page.
pub fn extract_player_response(page: &str) -> Option<Value> {
    let marker = "ytInitialPlayerResponse";
    let after_marker = &page[page.find(marker)? + marker.len()..];
    let start = after_marker.find('{')?;
    let json = balanced_object(&after_marker[start..])?;
    serde_json::from_str(json).ok()
}

/// Returns the prefix of `s` holding one balanced JSON object.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Picks a caption track: preferred languages in order, manual tracks
/// before auto-generated ones, then any track at all.
pub fn select_caption_track(player: &Value, languages: &[String]) -> Option<CaptionTrack> {
    let tracks: Vec<CaptionTrack> = player["captions"]["playerCaptionsTracklistRenderer"]
        ["captionTracks"]
        .as_array()?
        .iter()
        .filter_map(|t| {
            Some(CaptionTrack {
                base_url: t["baseUrl"].as_str()?.to_string(),
                language_code: t["languageCode"].as_str().unwrap_or_default().to_string(),
                auto_generated: t["kind"].as_str() == Some("asr"),
            })
        })
        .collect();

    let lang_matches = |track: &CaptionTrack, lang: &str| {
        track.language_code == lang || track.language_code.starts_with(&format!("{}-", lang))
    };

    for lang in languages {
        for auto in [false, true] {
            if let Some(t) = tracks
                .iter()
                .find(|t| t.auto_generated == auto && lang_matches(t, lang))
            {
                return Some(t.clone());
            }
        }
    }
    tracks.into_iter().next()
}

/// Joins the cue texts of a timedtext XML document.
///
/// Handles both the legacy `<transcript><text>` layout and format 3
/// (`<timedtext><body><p>`), where words may be split into `<s>` spans.
pub fn parse_timedtext_xml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut cues: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event().context("malformed caption XML")? {
            Event::Start(e) if matches!(e.local_name().as_ref(), b"text" | b"p") => {
                current = Some(String::new());
            }
            Event::Text(te) => {
                if let Some(cue) = current.as_mut() {
                    cue.push_str(te.unescape().context("bad caption text")?.as_ref());
                }
            }
            Event::End(e) if matches!(e.local_name().as_ref(), b"text" | b"p") => {
                if let Some(cue) = current.take() {
                    let cue = cue.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !cue.is_empty() {
                        cues.push(cue);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(cues.join("\n"))
}

// ============ yt-dlp ============

pub struct YtDlpStrategy {
    pub binary: String,
    pub languages: Vec<String>,
    pub timeout: Duration,
}

#[async_trait]
impl Strategy<VideoRef> for YtDlpStrategy {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(&self, video: &VideoRef) -> Result<Extracted> {
        let dir = tempfile::Builder::new()
            .prefix("intake-ytdlp-")
            .tempdir()
            .context("could not create temp dir")?;
        let template = dir.path().join("%(id)s");
        let sub_langs = self
            .languages
            .iter()
            .map(|l| format!("{}.*", l))
            .collect::<Vec<_>>()
            .join(",");

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args([
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--write-info-json",
            "--sub-format",
            "vtt",
            "--sub-langs",
            sub_langs.as_str(),
            "--no-progress",
            "-o",
        ])
        .arg(&template)
        .arg(video.watch_url())
        .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => bail!("{} timed out after {}s", self.binary, self.timeout.as_secs()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!("{} is not installed", self.binary)
            }
            Ok(Err(e)) => return Err(e).context("could not start yt-dlp"),
            Ok(Ok(output)) => output,
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
            bail!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                last.unwrap_or("no output")
            );
        }

        let vtt_path = pick_subtitle_file(dir.path(), &self.languages)?
            .ok_or_else(|| anyhow!("no subtitles were written"))?;
        let vtt = tokio::fs::read_to_string(&vtt_path).await?;
        let mut extracted = Extracted::new(parse_vtt(&vtt)).with_metadata("video_id", video.id.clone());
        if let Some(lang) = subtitle_language(&vtt_path) {
            extracted = extracted.with_metadata("language", lang);
        }

        let info_path = dir.path().join(format!("{}.info.json", video.id));
        if let Ok(raw) = tokio::fs::read_to_string(&info_path).await {
            if let Ok(info) = serde_json::from_str::<Value>(&raw) {
                extracted.title = info["title"].as_str().map(str::to_string);
                if let Some(channel) = info["channel"].as_str().or(info["uploader"].as_str()) {
                    extracted = extracted.with_metadata("channel", channel);
                }
                if let Some(secs) = info["duration"].as_f64() {
                    extracted = extracted.with_metadata("duration_seconds", (secs as u64).to_string());
                }
            }
        }
        Ok(extracted)
    }
}

/// Picks the `.vtt` file matching the earliest preferred language.
fn pick_subtitle_file(dir: &Path, languages: &[String]) -> Result<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|x| x == "vtt").unwrap_or(false))
        .collect();
    files.sort();
    let rank = |p: &PathBuf| {
        subtitle_language(p)
            .and_then(|lang| {
                languages
                    .iter()
                    .position(|l| lang == *l || lang.starts_with(&format!("{}-", l)))
            })
            .unwrap_or(usize::MAX)
    };
    Ok(files.into_iter().min_by_key(rank))
}

/// `<id>.<lang>.vtt` → `<lang>`.
fn subtitle_language(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit_once('.').map(|(_, lang)| lang.to_string())
}

/// Converts WebVTT to plain text.
///
/// Timing lines, headers, notes and inline tags are dropped. Consecutive
/// identical lines (the rolling display of auto-generated captions) are
/// kept once.
pub fn parse_vtt(vtt: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_note = false;
    for raw in vtt.lines() {
        let line = raw.trim();
        if line.is_empty() {
            in_note = false;
            continue;
        }
        if in_note {
            continue;
        }
        if line.starts_with("NOTE") || line.starts_with("STYLE") || line.starts_with("REGION") {
            in_note = true;
            continue;
        }
        if line.starts_with("WEBVTT")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
            || line.contains("-->")
            || line.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        let text = VTT_TAG_RE.replace_all(line, "");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() || lines.last() == Some(&text) {
            continue;
        }
        lines.push(text);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_url_shapes() {
        let id = "dQw4w9WgXcQ";
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ] {
            assert_eq!(parse_video_id(url).map(|v| v.id), Some(id.to_string()), "{url}");
        }
    }

    #[test]
    fn rejects_non_video_urls() {
        assert_eq!(parse_video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(parse_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(parse_video_id("https://youtu.be/short"), None);
        assert_eq!(parse_video_id("not a url"), None);
    }

    #[test]
    fn recognizes_youtube_hosts() {
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://WWW.YouTube.com/watch?v=x"));
        assert!(!is_youtube_url("https://example.com/youtube.com"));
    }

    fn player_json() -> Value {
        serde_json::json!({
            "videoDetails": {"title": "Talk", "author": "Chan", "lengthSeconds": "61"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://x/asr-en", "languageCode": "en", "kind": "asr"},
                {"baseUrl": "https://x/de", "languageCode": "de"},
                {"baseUrl": "https://x/en-GB", "languageCode": "en-GB"}
            ]}}
        })
    }

    #[test]
    fn prefers_manual_tracks_in_preferred_language() {
        let track = select_caption_track(&player_json(), &["en".to_string()]).unwrap();
        assert_eq!(track.base_url, "https://x/en-GB");
        assert!(!track.auto_generated);

        let track = select_caption_track(&player_json(), &["fr".to_string()]).unwrap();
        assert_eq!(track.base_url, "https://x/asr-en");
    }

    #[test]
    fn no_track_list_means_no_captions() {
        let player = serde_json::json!({"videoDetails": {"title": "x"}});
        assert_eq!(select_caption_track(&player, &["en".to_string()]), None);
    }

    #[test]
    fn finds_player_response_in_page() {
        let page = format!(
            "<script>var ytInitialPlayerResponse = {};var meta = {{\"a\": 1}};</script>",
            serde_json::json!({"videoDetails": {"title": "Brace } in \"title\""}})
        );
        let player = extract_player_response(&page).unwrap();
        assert_eq!(player["videoDetails"]["title"], "Brace } in \"title\"");
    }

    #[test]
    fn timedtext_legacy_and_format3() {
        let legacy = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1">Hello &amp;amp; welcome</text><text start="1" dur="2">to the   show</text></transcript>"#;
        assert_eq!(parse_timedtext_xml(legacy).unwrap(), "Hello &amp; welcome\nto the show");

        let fmt3 = r#"<timedtext format="3"><body><p t="0" d="900"><s>split</s><s t="300"> words</s></p><p t="900" d="10"></p></body></timedtext>"#;
        assert_eq!(parse_timedtext_xml(fmt3).unwrap(), "split words");
    }

    #[test]
    fn vtt_drops_timing_and_rolling_duplicates() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\nNOTE generated\nby a tool\n\n1\n00:00:00.000 --> 00:00:01.000 align:start\nhello<00:00:00.500><c> there</c>\n\n00:00:01.000 --> 00:00:02.000\nhello there\ngeneral kenobi\n";
        assert_eq!(parse_vtt(vtt), "hello there\ngeneral kenobi");
    }

    #[test]
    fn subtitle_language_from_filename() {
        assert_eq!(
            subtitle_language(Path::new("/tmp/dQw4w9WgXcQ.en-US.vtt")).as_deref(),
            Some("en-US")
        );
    }

    #[tokio::test]
    async fn missing_yt_dlp_binary_is_a_strategy_failure() {
        let strategy = YtDlpStrategy {
            binary: "/nonexistent/yt-dlp-binary".to_string(),
            languages: vec!["en".to_string()],
            timeout: Duration::from_secs(5),
        };
        let err = strategy
            .extract(&VideoRef {
                id: "dQw4w9WgXcQ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }
}
