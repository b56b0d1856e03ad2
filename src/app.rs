use crate::acquisition::{DownloadRequest, acquire};
use crate::cli::Args;
use crate::embedded_tags::{humanize_key, read_tags};
use crate::profile::{DEFAULT_PROFILE_FILE, Profile, Settings};
use crate::tools::{
    MissingDependencies, MissingTool, ToolKind, ToolStatus, Tools, check_installation,
    probe_dependencies,
};
use crate::video_info::fetch_info;
use anyhow::Result;
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 50;

pub fn run(args: Args) -> Result<()> {
    let profile = Profile::load(args.profile.as_deref())?;
    let settings = Settings::resolve(&args, profile);
    tracing::debug!(?settings, "resolved settings");

    // Handle --check-deps command
    if args.check_deps {
        return handle_dependency_check(&settings.tools);
    }

    probe_dependencies(&settings.tools)?;

    if let Some(write_profile) = &args.write_profile {
        let path = write_profile
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE_FILE));
        settings.to_profile().save(&path)?;
        println!("✅ Wrote profile to {}", path.display());
    }

    let url = settings
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("a video URL is required"))?;

    if !url.contains("youtube.com") && !url.contains("youtu.be") {
        println!("⚠️ URL doesn't appear to be a YouTube link. Proceeding anyway...");
    }

    if settings.info_only {
        return handle_info_only(&settings.tools, url);
    }

    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("  ytgrab - Video to MP3 Archival Tool");
    println!("{}\n", "=".repeat(RULE_WIDTH));

    // Naming the file up front keeps --no-overwrites effective across runs.
    let title = match fetch_info(&settings.tools, url) {
        Ok(info) => info.title,
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch title, letting the downloader name the file");
            None
        }
    };
    if let Some(title) = &title {
        println!("ℹ️ Title: {title}");
    }

    let request = DownloadRequest {
        url: url.to_string(),
        output_dir: settings.output.clone(),
        bitrate: settings.quality,
        keep_thumbnail: settings.keep_thumbnail,
        verbose: settings.verbose,
        title,
    };

    println!(
        "ℹ️ Downloading and converting to MP3 ({}kbps)...",
        request.bitrate
    );
    let artifact = acquire(&settings.tools, &request)?;

    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let location = std::path::absolute(&artifact).unwrap_or_else(|_| artifact.clone());
    println!("\n✅ Downloaded: {}", name);
    println!("✅ Location: {}", location.display());

    display_metadata(&settings.tools, &artifact);

    println!("\n🎉 Download complete!");
    Ok(())
}

fn handle_info_only(tools: &Tools, url: &str) -> Result<()> {
    println!("ℹ️ Fetching video metadata...");
    let info = fetch_info(tools, url)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Field", "Value"]);
    for (label, value) in info.summary_rows() {
        table.add_row(vec![label.to_string(), value]);
    }

    println!("\n▶️ Video Info:");
    println!("{table}");
    Ok(())
}

/// Print the tags embedded in the artifact. Failures here never fail the run.
fn display_metadata(tools: &Tools, path: &Path) {
    println!("\n▶️ Embedded Metadata:");

    match read_tags(tools, path) {
        Ok(tags) if tags.is_empty() => println!("  No metadata tags found"),
        Ok(tags) => {
            tracing::info!(title = ?tags.get("title"), "read embedded tags");
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["Tag", "Value"]);
            for (key, value) in tags.iter() {
                table.add_row(vec![humanize_key(key), value.to_string()]);
            }
            println!("{table}");
        }
        Err(e) => {
            tracing::warn!(error = %e, file = %path.display(), "could not read embedded tags");
            println!(
                "  (Could not read metadata - {} may not be available)",
                tools.prober
            );
        }
    }
}

fn handle_dependency_check(tools: &Tools) -> Result<()> {
    println!("🔍 Checking external tools...\n");

    let report = check_installation(tools);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Tool", "Program", "Status", "Version"]);
    for status in &report {
        let state = if status.available {
            "✅ Found".to_string()
        } else {
            format!("❌ {}", status.error.as_deref().unwrap_or("Unavailable"))
        };
        table.add_row(vec![
            status.kind.to_string(),
            status.program.clone(),
            state,
            status.version.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");

    let unavailable: Vec<&ToolStatus> = report.iter().filter(|s| !s.available).collect();
    if unavailable.is_empty() {
        println!("\n🎉 All tools found!");
        return Ok(());
    }

    println!("\nInstall them with:");
    for status in &unavailable {
        println!("  {}: {}", status.program, status.kind.install_hint());
    }

    let missing: Vec<MissingTool> = unavailable
        .iter()
        .filter(|s| ToolKind::REQUIRED.contains(&s.kind))
        .map(|s| MissingTool {
            kind: s.kind,
            program: s.program.clone(),
        })
        .collect();
    if !missing.is_empty() {
        return Err(MissingDependencies { missing }.into());
    }

    println!("\n⚠️ Tag display will be skipped until the prober is installed.");
    Ok(())
}
