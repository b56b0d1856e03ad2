use crate::cli::Bitrate;
use crate::sanitize::sanitize;
use crate::tools::{self, ToolError, Tools};
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::ExitStatus,
    time::SystemTime,
};
use thiserror::Error;

pub const AUDIO_FORMAT: &str = "mp3";
const THUMBNAIL_FORMAT: &str = "jpg";
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// `--parse-metadata` mappings: title, uploader and channel feed the track
/// title, artist and album artist; genre and track number are cleared.
const METADATA_MAPPINGS: [&str; 5] = [
    "%(title)s:%(meta_title)s",
    "%(uploader)s:%(meta_artist)s",
    "%(channel)s:%(meta_album_artist)s",
    ":%(meta_genre)s",
    ":%(meta_track)s",
];

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Download failed: `{program}` exited with {status}")]
    ProcessFailed { program: String, status: ExitStatus },
    #[error("MP3 file not found in {} after download", .0.display())]
    ArtifactNotFound(PathBuf),
    #[error("Invalid path (not UTF-8): {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Everything that decides the downloader invocation for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub bitrate: Bitrate,
    pub keep_thumbnail: bool,
    pub verbose: bool,
    /// Video title, when it was fetched ahead of the download.
    pub title: Option<String>,
}

impl DownloadRequest {
    /// Sanitized file stem for the artifact, if the title is known and survives
    /// sanitizing.
    pub fn file_stem(&self) -> Option<String> {
        self.title
            .as_deref()
            .map(sanitize)
            .filter(|stem| !stem.is_empty())
    }

    /// Where the artifact lands when the file stem is known up front.
    pub fn expected_artifact(&self) -> Option<PathBuf> {
        self.file_stem()
            .map(|stem| self.output_dir.join(format!("{stem}.{AUDIO_FORMAT}")))
    }

    fn output_template(&self) -> PathBuf {
        match self.file_stem() {
            // `%` starts a field in the downloader's template syntax
            Some(stem) => self
                .output_dir
                .join(format!("{}.%(ext)s", stem.replace('%', "%%"))),
            None => self.output_dir.join(OUTPUT_TEMPLATE),
        }
    }

    /// Downloader arguments for this request.
    pub fn args(&self) -> Result<Vec<String>, AcquireError> {
        let template = self.output_template();
        let template = template
            .to_str()
            .ok_or_else(|| AcquireError::NonUtf8Path(self.output_dir.clone()))?;

        let quality = format!("{}K", self.bitrate.kbps());

        let mut args: Vec<String> = Vec::new();
        if !self.verbose {
            args.extend(["-q", "--progress"].map(String::from));
        }
        args.extend(
            [
                "-x",
                "--audio-format",
                AUDIO_FORMAT,
                "--audio-quality",
                quality.as_str(),
                "--embed-thumbnail",
                "--embed-metadata",
                "--add-metadata",
            ]
            .map(String::from),
        );
        for mapping in METADATA_MAPPINGS {
            args.push("--parse-metadata".to_string());
            args.push(mapping.to_string());
        }
        args.extend(
            [
                "--convert-thumbnails",
                THUMBNAIL_FORMAT,
                "-o",
                template,
                "--no-overwrites",
            ]
            .map(String::from),
        );
        if self.keep_thumbnail {
            args.push("--write-thumbnail".to_string());
        }
        args.push(self.url.clone());

        Ok(args)
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_FORMAT))
}

/// Pick the most recently modified MP3 in `dir`.
///
/// Ties on modification time go to the greatest path so the choice is stable.
pub fn resolve_artifact(dir: &Path) -> Result<PathBuf, AcquireError> {
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_audio_file(&path) {
            continue;
        }
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        match meta.modified() {
            Ok(modified) => candidates.push((modified, path)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping entry without mtime");
            }
        }
    }

    tracing::debug!(dir = %dir.display(), count = candidates.len(), "artifact candidates");

    candidates
        .into_iter()
        .max()
        .map(|(_, path)| path)
        .ok_or_else(|| AcquireError::ArtifactNotFound(dir.to_path_buf()))
}

/// Download, convert and tag the audio track, returning the produced file.
pub fn acquire(tools: &Tools, request: &DownloadRequest) -> Result<PathBuf, AcquireError> {
    fs::create_dir_all(&request.output_dir)?;

    let args = request.args()?;
    let status = tools::run(&tools.downloader, &args)?;
    if !status.success() {
        return Err(AcquireError::ProcessFailed {
            program: tools.downloader.clone(),
            status,
        });
    }

    match request.expected_artifact().filter(|path| path.is_file()) {
        Some(path) => Ok(path),
        None => resolve_artifact(&request.output_dir),
    }
}
