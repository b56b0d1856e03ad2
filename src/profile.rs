use crate::cli::{Args, Bitrate};
use crate::tools::Tools;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";
pub const DEFAULT_PROFILE_FILE: &str = "ytgrab.json";

/// Default settings read from a JSON file. Every field is optional.
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub quality: Option<Bitrate>,
    pub keep_thumbnail: Option<bool>,
    pub verbose: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Tools>,
}

impl Profile {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Option<Self>> {
        if let Some(path) = path {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read profile {}", path.display()))?;
            let profile: Profile = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid profile {}", path.display()))?;
            Ok(Some(profile))
        } else {
            Ok(None)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write profile {}", path.display()))?;
        Ok(())
    }
}

/// Settings for one run after merging CLI arguments over the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url: Option<String>,
    pub output: PathBuf,
    pub quality: Bitrate,
    pub keep_thumbnail: bool,
    pub verbose: bool,
    pub info_only: bool,
    pub tools: Tools,
}

impl Settings {
    pub fn resolve(args: &Args, profile: Option<Profile>) -> Self {
        let profile = profile.unwrap_or_default();

        let mut tools = profile.tools.unwrap_or_default();
        if let Some(program) = &args.yt_dlp {
            tools.downloader = program.clone();
        }
        if let Some(program) = &args.ffmpeg {
            tools.transcoder = program.clone();
        }
        if let Some(program) = &args.ffprobe {
            tools.prober = program.clone();
        }

        Self {
            url: args.url.clone(),
            output: args
                .output
                .clone()
                .or(profile.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            quality: args.quality.or(profile.quality).unwrap_or_default(),
            keep_thumbnail: args.keep_thumbnail || profile.keep_thumbnail.unwrap_or(false),
            verbose: args.verbose || profile.verbose.unwrap_or(false),
            info_only: args.info_only,
            tools,
        }
    }

    pub fn to_profile(&self) -> Profile {
        Profile {
            output: Some(self.output.clone()),
            quality: Some(self.quality),
            keep_thumbnail: Some(self.keep_thumbnail),
            verbose: Some(self.verbose),
            tools: Some(self.tools.clone()),
        }
    }
}
