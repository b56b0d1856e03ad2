use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsStr,
    fmt, io,
    process::{Command, ExitStatus, Output, Stdio},
    sync::LazyLock,
};
use thiserror::Error;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"version\s+(\S+)").expect("valid version regex"));

/// Program names of the external executables every run delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Tools {
    pub downloader: String,
    pub transcoder: String,
    pub prober: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            downloader: "yt-dlp".to_string(),
            transcoder: "ffmpeg".to_string(),
            prober: "ffprobe".to_string(),
        }
    }
}

impl Tools {
    pub fn program(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::Downloader => &self.downloader,
            ToolKind::Transcoder => &self.transcoder,
            ToolKind::Prober => &self.prober,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Downloader,
    Transcoder,
    Prober,
}

impl ToolKind {
    /// Tools that must be runnable before anything else happens.
    pub const REQUIRED: [ToolKind; 2] = [ToolKind::Downloader, ToolKind::Transcoder];
    pub const ALL: [ToolKind; 3] = [ToolKind::Downloader, ToolKind::Transcoder, ToolKind::Prober];

    fn version_flag(self) -> &'static str {
        match self {
            ToolKind::Downloader => "--version",
            ToolKind::Transcoder | ToolKind::Prober => "-version",
        }
    }

    pub fn install_hint(self) -> &'static str {
        match self {
            ToolKind::Downloader => "pip install yt-dlp",
            ToolKind::Transcoder | ToolKind::Prober => {
                "Download from https://ffmpeg.org/download.html"
            }
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolKind::Downloader => "Downloader",
            ToolKind::Transcoder => "Transcoder",
            ToolKind::Prober => "Prober",
        })
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("`{0}` command not found. Please ensure it is installed and in your PATH.")]
    CommandNotFound(String),
    #[error("Failed to run `{0}`: {1}")]
    CommandFailed(String, String),
}

impl ToolError {
    fn from_spawn(program: &str, e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            ToolError::CommandNotFound(program.to_string())
        } else {
            ToolError::CommandFailed(program.to_string(), e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTool {
    pub kind: ToolKind,
    pub program: String,
}

#[derive(Debug)]
pub struct MissingDependencies {
    pub missing: Vec<MissingTool>,
}

impl MissingDependencies {
    pub fn names(&self) -> Vec<&str> {
        self.missing.iter().map(|m| m.program.as_str()).collect()
    }
}

impl fmt::Display for MissingDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing dependencies: {}", self.names().join(", "))
    }
}

impl std::error::Error for MissingDependencies {}

#[derive(Debug)]
pub struct ToolStatus {
    pub kind: ToolKind,
    pub program: String,
    pub available: bool,
    pub version: Option<String>,
    pub error: Option<String>,
}

fn command_line<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// Run a tool to completion and capture both output streams.
///
/// Only a failure to start the process is an error; the caller inspects the
/// exit status.
pub fn capture<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<Output, ToolError> {
    tracing::debug!(command = %command_line(program, args), "capturing tool output");
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ToolError::from_spawn(program, e))
}

/// Run a tool with inherited stdio so its own progress output reaches the terminal.
pub fn run<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<ExitStatus, ToolError> {
    tracing::debug!(command = %command_line(program, args), "running tool");
    Command::new(program)
        .args(args)
        .status()
        .map_err(|e| ToolError::from_spawn(program, e))
}

fn is_runnable(program: &str, kind: ToolKind) -> bool {
    match Command::new(program)
        .arg(kind.version_flag())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => true,
        Ok(status) => {
            tracing::debug!(program, %status, "version query failed");
            false
        }
        Err(e) => {
            tracing::debug!(program, error = %e, "could not start tool");
            false
        }
    }
}

/// Verify that the downloader and transcoder can be started.
pub fn probe_dependencies(tools: &Tools) -> Result<(), MissingDependencies> {
    let missing: Vec<MissingTool> = ToolKind::REQUIRED
        .into_iter()
        .filter(|&kind| !is_runnable(tools.program(kind), kind))
        .map(|kind| MissingTool {
            kind,
            program: tools.program(kind).to_string(),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingDependencies { missing })
    }
}

/// Pull a version token out of a `-version`/`--version` banner.
pub fn parse_version(output: &str) -> Option<String> {
    if let Some(caps) = VERSION_RE.captures(output) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

pub fn check_installation(tools: &Tools) -> Vec<ToolStatus> {
    ToolKind::ALL
        .into_iter()
        .map(|kind| {
            let program = tools.program(kind).to_string();
            let mut status = ToolStatus {
                kind,
                program,
                available: false,
                version: None,
                error: None,
            };

            match capture(&status.program, &[kind.version_flag()]) {
                Ok(output) if output.status.success() => {
                    status.available = true;
                    status.version = parse_version(&String::from_utf8_lossy(&output.stdout));
                }
                Ok(output) => {
                    status.error = Some(format!("exited with {}", output.status));
                }
                Err(e) => {
                    status.error = Some(e.to_string());
                }
            }

            status
        })
        .collect()
}
