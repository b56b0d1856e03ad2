use crate::tools::{self, ToolError, Tools};
use serde_json::{Map, Value};
use thiserror::Error;

/// Characters of the description shown before the ellipsis.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Failed to fetch video info: {0}")]
    ProcessFailed(String),
    #[error("Failed to parse video metadata: {0}")]
    ParseFailed(String),
}

/// Best-effort view of the downloader's info record. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub uploader: Option<String>,
    /// Length in seconds
    pub duration: Option<f64>,
    pub duration_string: Option<String>,
    /// Upload date as YYYYMMDD
    pub upload_date: Option<String>,
    pub view_count: Option<u64>,
    pub description: Option<String>,
    pub webpage_url: Option<String>,
}

fn string_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_owned)
}

impl VideoMetadata {
    /// Decode the first JSON record of a `--dump-json` document.
    ///
    /// Playlists produce one record per line; only the first is used.
    pub fn parse(document: &str) -> Result<Self, FetchError> {
        let first = serde_json::Deserializer::from_str(document)
            .into_iter::<Value>()
            .next()
            .ok_or_else(|| FetchError::ParseFailed("downloader printed no JSON".to_string()))?
            .map_err(|e| FetchError::ParseFailed(e.to_string()))?;

        let record = first
            .as_object()
            .ok_or_else(|| FetchError::ParseFailed("expected a JSON object".to_string()))?;

        Ok(Self {
            id: string_field(record, "id"),
            title: string_field(record, "title"),
            channel: string_field(record, "channel"),
            uploader: string_field(record, "uploader"),
            duration: record.get("duration").and_then(Value::as_f64),
            duration_string: string_field(record, "duration_string"),
            upload_date: string_field(record, "upload_date"),
            view_count: record.get("view_count").and_then(Value::as_u64),
            description: string_field(record, "description"),
            webpage_url: string_field(record, "webpage_url"),
        })
    }

    pub fn display_duration(&self) -> String {
        self.duration_string
            .clone()
            .or_else(|| self.duration.map(format_seconds))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn display_view_count(&self) -> String {
        self.view_count
            .map(format_thousands)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn description_preview(&self) -> String {
        match &self.description {
            Some(text) => {
                let preview: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
                format!("{preview}...")
            }
            None => "None".to_string(),
        }
    }

    /// Label/value pairs for the `--info-only` summary, in display order.
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN.to_string());
        vec![
            ("Title", or_unknown(&self.title)),
            ("Channel", or_unknown(&self.channel)),
            ("Uploader", or_unknown(&self.uploader)),
            ("Duration", self.display_duration()),
            ("Upload Date", or_unknown(&self.upload_date)),
            ("View Count", self.display_view_count()),
            ("Description", self.description_preview()),
        ]
    }
}

/// `H:MM:SS` for an hour or more, `M:SS` below.
pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Ask the downloader for the video's info record without fetching media.
pub fn fetch_info(tools: &Tools, url: &str) -> Result<VideoMetadata, FetchError> {
    let output = tools::capture(&tools.downloader, &["--dump-json", "--no-download", url])?;

    if !output.status.success() {
        return Err(FetchError::ProcessFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let info = VideoMetadata::parse(&String::from_utf8_lossy(&output.stdout))?;
    tracing::info!(
        id = ?info.id,
        title = ?info.title,
        webpage_url = ?info.webpage_url,
        "fetched video info"
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fake_tool, spawn_guard};

    const ZOO: &str = r#"{
        "id": "jNQXAC9IVRw",
        "title": "Me at the zoo",
        "channel": "jawed",
        "uploader": "jawed",
        "duration": 19,
        "duration_string": "19",
        "upload_date": "20050424",
        "view_count": 386234567,
        "description": "The first video on YouTube.",
        "webpage_url": "https://www.youtube.com/watch?v=jNQXAC9IVRw"
    }"#;

    fn tools_with_downloader(script: &std::path::Path) -> Tools {
        Tools {
            downloader: script.to_string_lossy().into_owned(),
            ..Tools::default()
        }
    }

    #[test]
    fn parses_known_fields() {
        let info = VideoMetadata::parse(ZOO).unwrap();
        assert_eq!(info.title.as_deref(), Some("Me at the zoo"));
        assert_eq!(info.channel.as_deref(), Some("jawed"));
        assert_eq!(info.view_count, Some(386_234_567));
        assert_eq!(info.duration, Some(19.0));
    }

    #[test]
    fn missing_and_mistyped_fields_degrade() {
        let info = VideoMetadata::parse(r#"{"title": 42, "view_count": null}"#).unwrap();
        assert_eq!(info, VideoMetadata::default());

        let rows = info.summary_rows();
        assert_eq!(rows[0], ("Title", "Unknown".to_string()));
        assert_eq!(rows[3], ("Duration", "Unknown".to_string()));
        assert_eq!(rows[5], ("View Count", "Unknown".to_string()));
        assert_eq!(rows[6], ("Description", "None".to_string()));
    }

    #[test]
    fn uses_first_record_of_playlist_output() {
        let doc = "{\"title\": \"one\"}\n{\"title\": \"two\"}\n";
        assert_eq!(VideoMetadata::parse(doc).unwrap().title.as_deref(), Some("one"));
    }

    #[test]
    fn rejects_malformed_documents() {
        for doc in ["", "not json", "[1, 2]", "{\"title\": "] {
            assert!(
                matches!(VideoMetadata::parse(doc), Err(FetchError::ParseFailed(_))),
                "{doc:?} should fail to parse"
            );
        }
    }

    #[test]
    fn formats_view_counts() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(386_234_567), "386,234,567");
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_seconds(19.0), "0:19");
        assert_eq!(format_seconds(213.4), "3:33");
        assert_eq!(format_seconds(3723.0), "1:02:03");

        let info = VideoMetadata {
            duration: Some(213.0),
            ..Default::default()
        };
        assert_eq!(info.display_duration(), "3:33");
    }

    #[test]
    fn truncates_description_preview() {
        let info = VideoMetadata {
            description: Some("ü".repeat(300)),
            ..Default::default()
        };
        let preview = info.description_preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), DESCRIPTION_PREVIEW_CHARS + 3);
    }

    #[test]
    fn fetches_through_downloader() {
        let _guard = spawn_guard();
        let dir = tempfile::tempdir().unwrap();
        let script = fake_tool(
            dir.path(),
            "yt-dlp",
            &format!(
                "[ \"$1\" = --dump-json ] && [ \"$2\" = --no-download ] || exit 9\ncat <<'EOF'\n{ZOO}\nEOF"
            ),
        );

        let info = fetch_info(&tools_with_downloader(&script), "https://youtu.be/jNQXAC9IVRw")
            .unwrap();
        assert_eq!(info.id.as_deref(), Some("jNQXAC9IVRw"));
    }

    #[test]
    fn process_failure_is_distinct_from_parse_failure() {
        let _guard = spawn_guard();
        let dir = tempfile::tempdir().unwrap();
        let failing = fake_tool(dir.path(), "fails", "echo 'ERROR: Video unavailable' >&2\nexit 1");
        let garbage = fake_tool(dir.path(), "garbage", "echo '<html>'");

        match fetch_info(&tools_with_downloader(&failing), "https://youtu.be/x") {
            Err(FetchError::ProcessFailed(stderr)) => {
                assert_eq!(stderr, "ERROR: Video unavailable")
            }
            other => panic!("expected process failure, got {other:?}"),
        }
        assert!(matches!(
            fetch_info(&tools_with_downloader(&garbage), "https://youtu.be/x"),
            Err(FetchError::ParseFailed(_))
        ));
    }
}
