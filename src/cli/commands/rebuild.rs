//! Rebuild command

use super::open_manager;
use crate::cli::args::RebuildArgs;
use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::ui::{self, BuildProgress, UiContext};

/// Execute the rebuild command
pub async fn execute(args: RebuildArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    let title = if args.upgrade {
        format!("Upgrading PHP {}", args.line)
    } else {
        format!("Rebuilding PHP {}", args.line)
    };
    ui::intro(&ctx, &title);

    let progress = BuildProgress::new(&ctx, &format!("PHP {}", args.line));
    let mut manager = open_manager(config, progress.reporter()).await?;
    let result = manager.rebuild(&args.line, args.upgrade).await;
    progress.finish();
    let record = result?;

    ui::outro_success(
        &ctx,
        &format!(
            "PHP {} rebuilt ({})",
            record.major_minor, record.exact_version
        ),
    );
    Ok(())
}
