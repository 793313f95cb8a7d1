//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// phpsmith - build and manage PHP versions from source
///
/// Installs several PHP lines side by side, tracks their extensions and
/// binds one of them to the php command.
#[derive(Parser, Debug)]
#[command(name = "phpsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PHPSMITH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and install the latest release of a PHP line
    Install(InstallArgs),

    /// Remove an installed PHP line
    Uninstall(UninstallArgs),

    /// List installed versions
    List(ListArgs),

    /// Bind the php command to an installed line
    Use(LineArgs),

    /// Add or remove extensions of an installed line
    Ext(ExtArgs),

    /// Rebuild an installed line
    Rebuild(RebuildArgs),

    /// Show the latest upstream release of every supported line
    Versions(VersionsArgs),

    /// Check build prerequisites and extension dependencies
    Check(CheckArgs),

    /// Show installed lines behind the latest upstream release
    Outdated(VersionsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// A single major.minor line
#[derive(Parser, Debug)]
pub struct LineArgs {
    /// PHP line, e.g. 8.3
    pub line: String,
}

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
pub struct UninstallArgs {
    /// PHP line, e.g. 8.3
    pub line: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// PHP line, e.g. 8.3
    pub line: String,

    /// Extensions to enable (comma-separated, replaces the defaults)
    #[arg(short, long, value_delimiter = ',')]
    pub extensions: Vec<String>,
}

/// Arguments for the rebuild command
#[derive(Parser, Debug)]
pub struct RebuildArgs {
    /// PHP line, e.g. 8.3
    pub line: String,

    /// Build the latest upstream release instead of the installed one
    #[arg(short, long)]
    pub upgrade: bool,
}

/// Arguments for the ext command
#[derive(Parser, Debug)]
pub struct ExtArgs {
    #[command(subcommand)]
    pub action: ExtAction,
}

/// Extension subcommands
#[derive(Subcommand, Debug)]
pub enum ExtAction {
    /// Enable extensions
    Add {
        /// PHP line, e.g. 8.3
        line: String,
        /// Extension names
        #[arg(required = true, value_delimiter = ',')]
        names: Vec<String>,
    },

    /// Disable extensions
    Remove {
        /// PHP line, e.g. 8.3
        line: String,
        /// Extension names
        #[arg(required = true, value_delimiter = ',')]
        names: Vec<String>,
    },

    /// List the extensions phpsmith can enable
    Available,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the versions and outdated commands
#[derive(Parser, Debug)]
pub struct VersionsArgs {
    /// Ignore the cached release index
    #[arg(short, long)]
    pub refresh: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Extensions to check (comma-separated, defaults to the configured set)
    #[arg(short, long, value_delimiter = ',')]
    pub extensions: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// `None` when no names were given
pub fn optional_list(names: Vec<String>) -> Option<Vec<String>> {
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}
