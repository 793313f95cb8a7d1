//! Use command - bind the php command to a line

use super::open_manager;
use crate::cli::args::LineArgs;
use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::report::Reporter;
use crate::ui::{self, UiContext};

/// Execute the use command
pub async fn execute(args: LineArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    let mut manager = open_manager(config, Reporter::silent()).await?;

    manager.set_cli(&args.line).await?;

    let generic = manager.layout().generic_binary();
    ui::step_ok_detail(
        &ctx,
        &format!("php now runs PHP {}", args.line.trim()),
        &generic.display().to_string(),
    );
    Ok(())
}
