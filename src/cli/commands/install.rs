//! Install command - build a PHP line from source

use super::open_manager;
use crate::cli::args::{optional_list, InstallArgs};
use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::ui::{self, BuildProgress, UiContext};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Installing PHP {}", args.line));

    let progress = BuildProgress::new(&ctx, &format!("PHP {}", args.line));
    let mut manager = open_manager(config, progress.reporter()).await?;
    let result = manager
        .install(&args.line, optional_list(args.extensions))
        .await;
    progress.finish();
    let record = result?;

    ui::step_ok_detail(
        &ctx,
        &format!("Installed PHP {}", record.exact_version),
        &record.install_path.display().to_string(),
    );
    ui::key_value(&ctx, "Extensions", &ui::join(&record.extensions));
    ui::key_value(&ctx, "php.ini", &record.ini_path.display().to_string());
    ui::key_value(&ctx, "FPM socket", &record.fpm_socket_path.display().to_string());

    if record.is_cli {
        ui::outro_success(&ctx, &format!("php now runs PHP {}", record.exact_version));
    } else {
        ui::outro_warn(
            &ctx,
            &format!(
                "php is not bound to {}. Run: phpsmith use {}",
                record.major_minor, record.major_minor
            ),
        );
    }
    Ok(())
}
