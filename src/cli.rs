use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// A metadata-preserving video to MP3 tool for archival purposes
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = "Example: ytgrab https://youtube.com/watch?v=VIDEO_ID -o ./music"
)]
pub struct Args {
    /// Video URL to download
    #[arg(required_unless_present = "check_deps")]
    pub url: Option<String>,

    /// Output directory (default: ./downloads)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Audio quality/bitrate in kbps (default: 192)
    #[arg(short = 'q', long, value_enum)]
    pub quality: Option<Bitrate>,

    /// Keep thumbnail as a separate image file
    #[arg(long)]
    pub keep_thumbnail: bool,

    /// Show detailed yt-dlp output and debug logs
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Only show video info, don't download
    #[arg(long)]
    pub info_only: bool,

    /// Path to a JSON profile with default settings. CLI arguments override values in the profile.
    #[arg(short = 'p', long)]
    pub profile: Option<PathBuf>,

    /// Write the resolved settings to this file as JSON. If no file is provided, ytgrab.json is used.
    #[arg(short = 'w', long = "write-profile", num_args = 0..=1, value_name = "FILE")]
    pub write_profile: Option<Option<PathBuf>>,

    /// Check that yt-dlp, ffmpeg and ffprobe are installed and show their versions.
    #[arg(long)]
    pub check_deps: bool,

    /// Program to run as the downloader
    #[arg(long = "yt-dlp", value_name = "PROGRAM")]
    pub yt_dlp: Option<String>,

    /// Program to run as the transcoder
    #[arg(long, value_name = "PROGRAM")]
    pub ffmpeg: Option<String>,

    /// Program to run for reading embedded tags
    #[arg(long, value_name = "PROGRAM")]
    pub ffprobe: Option<String>,
}

/// Target MP3 bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Bitrate {
    #[value(name = "128")]
    Kbps128,
    #[default]
    #[value(name = "192")]
    Kbps192,
    #[value(name = "256")]
    Kbps256,
    #[value(name = "320")]
    Kbps320,
}

impl Bitrate {
    pub fn kbps(self) -> u32 {
        match self {
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps192 => 192,
            Bitrate::Kbps256 => 256,
            Bitrate::Kbps320 => 320,
        }
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = String;

    fn try_from(kbps: u32) -> Result<Self, Self::Error> {
        match kbps {
            128 => Ok(Bitrate::Kbps128),
            192 => Ok(Bitrate::Kbps192),
            256 => Ok(Bitrate::Kbps256),
            320 => Ok(Bitrate::Kbps320),
            other => Err(format!(
                "unsupported quality {other}, expected one of 128, 192, 256, 320"
            )),
        }
    }
}

impl From<Bitrate> for u32 {
    fn from(bitrate: Bitrate) -> Self {
        bitrate.kbps()
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kbps())
    }
}
