//! Versions and outdated commands

use super::open_manager;
use crate::cli::args::{OutputFormat, VersionsArgs};
use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::report::Reporter;
use crate::ui::{self, TaskSpinner, UiContext};
use console::style;

/// Execute the versions command
pub async fn execute(args: VersionsArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    let manager = open_manager(config, Reporter::silent()).await?;

    let mut spinner = spinner_for(&ctx, args.format);
    let cache = match manager.available_versions(args.refresh).await {
        Ok(cache) => cache,
        Err(e) => {
            if let Some(ref mut s) = spinner {
                s.stop_error("Release index unavailable");
            }
            return Err(e);
        }
    };
    if let Some(ref mut s) = spinner {
        s.stop("Release index loaded");
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cache)?),
        OutputFormat::Plain => {
            for version in cache.latest_by_line.values() {
                println!("{}", version);
            }
        }
        OutputFormat::Table => {
            println!(
                "{:<6} {:<10} {}",
                style("LINE").bold(),
                style("LATEST").bold(),
                style("INSTALLED").bold()
            );
            for line in manager.registry().lines() {
                let latest = cache.latest(line).unwrap_or("-");
                let installed = manager
                    .get(line)
                    .map(|r| r.exact_version.clone())
                    .unwrap_or_default();
                println!("{:<6} {:<10} {}", line, latest, installed);
            }
            println!();
            ui::remark(
                &ctx,
                &format!(
                    "Fetched {}",
                    cache.last_updated.format("%Y-%m-%d %H:%M UTC")
                ),
            );
        }
    }
    Ok(())
}

/// Execute the outdated command
pub async fn outdated(args: VersionsArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    let mut manager = open_manager(config, Reporter::silent()).await?;
    let outdated = manager.refresh_outdated(args.refresh).await?;

    match args.format {
        OutputFormat::Json => {
            let rows: Vec<_> = outdated
                .iter()
                .map(|o| {
                    serde_json::json!({
                        "line": o.line,
                        "installed": o.installed,
                        "latest": o.latest,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Plain => {
            for o in &outdated {
                println!("{}", o.line);
            }
        }
        OutputFormat::Table if outdated.is_empty() => {
            ui::step_ok(&ctx, "Every installed version is current");
        }
        OutputFormat::Table => {
            for o in &outdated {
                ui::step_warn_hint(
                    &ctx,
                    &format!("PHP {}: {} -> {}", o.line, o.installed, o.latest),
                    &format!("phpsmith rebuild {} --upgrade", o.line),
                );
            }
        }
    }
    Ok(())
}

/// Spinner only for table output; machine formats stay clean
fn spinner_for(ctx: &UiContext, format: OutputFormat) -> Option<TaskSpinner> {
    match format {
        OutputFormat::Table => {
            let mut spinner = TaskSpinner::new(ctx);
            spinner.start("Fetching release index");
            Some(spinner)
        }
        OutputFormat::Json | OutputFormat::Plain => None,
    }
}
