//! List command - show installed versions

use super::open_manager;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::report::Reporter;
use crate::state::InstalledVersion;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> PhpsmithResult<()> {
    let manager = open_manager(config, Reporter::silent()).await?;
    let versions = manager.list();

    if versions.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No PHP versions installed");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&versions),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&versions)?),
        OutputFormat::Plain => {
            for record in &versions {
                println!("{}", record.exact_version);
            }
        }
    }

    Ok(())
}

fn print_table(versions: &[InstalledVersion]) {
    println!(
        "{:<6} {:<10} {:<4} {:<18} {}",
        style("LINE").bold(),
        style("VERSION").bold(),
        style("CLI").bold(),
        style("STATUS").bold(),
        style("EXTENSIONS").bold()
    );
    println!("{}", "-".repeat(72));

    for record in versions {
        let cli = if record.is_cli { "*" } else { "" };
        let status = if record.needs_rebuild {
            style("update available").yellow()
        } else {
            style("current").green()
        };
        println!(
            "{:<6} {:<10} {:<4} {:<18} {}",
            record.major_minor,
            record.exact_version,
            cli,
            status,
            style(ui::join(&record.extensions)).dim()
        );
    }

    println!();
    println!("{} version(s) installed", versions.len());
}
