//! phpsmith CLI entry point

use clap::{CommandFactory, Parser};
use console::style;
use phpsmith::cli::{commands, Cli, Commands};
use phpsmith::config::{Config, ConfigManager};
use phpsmith::error::PhpsmithResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PhpsmithResult<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "phpsmith", &mut std::io::stdout());
        return Ok(());
    }

    let config_manager = ConfigManager::locate(cli.config.clone());
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    phpsmith::ui::init_theme();
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Completions { .. } => Ok(()),
        Commands::Install(args) => commands::install(args, &config).await,
        Commands::Uninstall(args) => commands::uninstall(args, &config).await,
        Commands::List(args) => commands::list(args, &config).await,
        Commands::Use(args) => commands::use_line(args, &config).await,
        Commands::Ext(args) => commands::ext(args, &config).await,
        Commands::Rebuild(args) => commands::rebuild(args, &config).await,
        Commands::Versions(args) => commands::versions(args, &config).await,
        Commands::Outdated(args) => commands::outdated(args, &config).await,
        Commands::Check(args) => commands::check(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => "phpsmith=warn",
        1 => "phpsmith=info",
        _ => "phpsmith=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
