//! Uninstall command - remove an installed line

use super::open_manager;
use crate::cli::args::UninstallArgs;
use crate::config::Config;
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::registry::parse_line;
use crate::report::Reporter;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the uninstall command
pub async fn execute(args: UninstallArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let line = parse_line(&args.line)?;
    let mut manager = open_manager(config, Reporter::silent()).await?;

    let Some(record) = manager.get(&line) else {
        return Err(PhpsmithError::NotInstalled(line));
    };
    let prompt = format!(
        "Remove PHP {} from {}?",
        record.exact_version,
        record.install_path.display()
    );

    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Nothing removed", "Pass --yes to skip the prompt");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Removing PHP {}", line));
    match manager.uninstall(&line).await {
        Ok(removed) => {
            spinner.stop(&format!("Removed PHP {}", removed.exact_version));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error(&format!("Failed to remove PHP {}", line));
            Err(e)
        }
    }
}
