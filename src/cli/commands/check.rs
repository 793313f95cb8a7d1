//! Check command - probe build prerequisites

use super::open_manager;
use crate::cli::args::{optional_list, CheckArgs};
use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::report::Reporter;
use crate::ui::{self, UiContext};

/// Execute the check command
pub async fn execute(args: CheckArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "phpsmith check");

    let manager = open_manager(config, Reporter::silent()).await?;
    let report = manager
        .check_dependencies(optional_list(args.extensions))
        .await?;

    ui::section(&ctx, "Host");
    ui::key_value(&ctx, "Distribution", &report.distro.to_string());
    ui::key_value(&ctx, "Package manager", &report.manager.to_string());

    ui::section(&ctx, "Build prerequisites");
    if report.missing_prerequisites.is_empty() {
        ui::step_ok(&ctx, "All prerequisites found");
    }
    for name in &report.missing_prerequisites {
        ui::step_warn(&ctx, &format!("{} not found", name));
    }

    ui::section(&ctx, "Extensions");
    if report.missing_extensions.is_empty() {
        ui::step_ok(&ctx, "Every extension dependency found");
    }
    for name in &report.missing_extensions {
        ui::step_warn(&ctx, &format!("{} is missing system libraries", name));
    }

    if report.is_satisfied() {
        ui::outro_success(&ctx, "Ready to build");
    } else if config.deps.auto_install {
        ui::outro_warn(&ctx, "Missing packages will be installed on the next build");
    } else {
        ui::outro_warn(&ctx, "Install the missing packages before building");
    }
    Ok(())
}
