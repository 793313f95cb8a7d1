//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, Layout};
use crate::error::PhpsmithResult;
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> PhpsmithResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_paths(config, manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
    }
    Ok(())
}

fn show_config(config: &Config) -> PhpsmithResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_paths(config: &Config, manager: &ConfigManager) {
    let layout = Layout::from_config(config);
    println!("{}", manager.path().display());

    let ctx = UiContext::detect();
    if ctx.use_fancy_output() {
        ui::key_value(&ctx, "root", &layout.root().display().to_string());
        ui::key_value(&ctx, "state", &layout.state_file().display().to_string());
        ui::key_value(&ctx, "logs", &layout.logs_dir().display().to_string());
    }
}

async fn init_config(manager: &ConfigManager, force: bool) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if manager.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}
