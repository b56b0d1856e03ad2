mod acquisition;
mod app;
mod cli;
mod embedded_tags;
mod profile;
mod sanitize;
mod tools;
mod video_info;

#[cfg(test)]
mod testutil;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = cli::Args::parse();

    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stderr());
    let default_filter = if args.verbose { "ytgrab=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            if let Some(missing) = e.downcast_ref::<tools::MissingDependencies>() {
                eprintln!("Install them with:");
                for tool in &missing.missing {
                    eprintln!("  {}: {}", tool.program, tool.kind.install_hint());
                }
            }
            ExitCode::FAILURE
        }
    }
}
