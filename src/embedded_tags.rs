use crate::tools::{self, ToolError, Tools};
use std::{ffi::OsStr, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("`{0}` failed: {1}")]
    ProcessFailed(String, String),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Container-level tags in the order the prober reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedTags(Vec<(String, String)>);

impl EmbeddedTags {
    /// Extract `format.tags` from a `-show_format` JSON report.
    /// A report without a tag block yields an empty set.
    pub fn parse(report: &str) -> Result<Self, ReadError> {
        let parsed: serde_json::Value = serde_json::from_str(report)?;

        let tags: Vec<(String, String)> = parsed["format"]["tags"]
            .as_object()
            .map(|tags| {
                tags.iter()
                    .map(|(key, value)| {
                        let value = match value.as_str() {
                            Some(s) => s.to_string(),
                            None => value.to_string(),
                        };
                        (key.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self(tags))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// `album_artist` -> `Album Artist`. Display only; stored keys are untouched.
pub fn humanize_key(key: &str) -> String {
    key.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Read the tags embedded in an audio file.
pub fn read_tags(tools: &Tools, path: &Path) -> Result<EmbeddedTags, ReadError> {
    let output = tools::capture(
        &tools.prober,
        &[
            OsStr::new("-v"),
            OsStr::new("quiet"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_format"),
            path.as_os_str(),
        ],
    )?;

    if !output.status.success() {
        return Err(ReadError::ProcessFailed(
            tools.prober.clone(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    EmbeddedTags::parse(&String::from_utf8_lossy(&output.stdout))
}
