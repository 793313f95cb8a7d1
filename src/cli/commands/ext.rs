//! Ext command - change the extension set of a line

use super::open_manager;
use crate::cli::args::{ExtAction, ExtArgs};
use crate::config::Config;
use crate::deps::EXTENSIONS;
use crate::error::PhpsmithResult;
use crate::state::InstalledVersion;
use crate::ui::{self, BuildProgress, UiContext};
use console::style;
use std::collections::BTreeSet;

/// Execute the ext command
pub async fn execute(args: ExtArgs, config: &Config) -> PhpsmithResult<()> {
    let ctx = UiContext::detect();

    let (line, names, adding) = match args.action {
        ExtAction::Available => {
            print_available(&ctx);
            return Ok(());
        }
        ExtAction::Add { line, names } => (line, names, true),
        ExtAction::Remove { line, names } => (line, names, false),
    };

    let progress = BuildProgress::new(&ctx, &format!("PHP {}", line));
    let mut manager = open_manager(config, progress.reporter()).await?;
    let before = manager.get(line.trim()).map(|r| r.extensions.clone());

    let result = if adding {
        manager.add_extensions(&line, &names).await
    } else {
        manager.remove_extensions(&line, &names).await
    };
    progress.finish();
    let record = result?;

    report_change(&ctx, before.unwrap_or_default(), &record);
    Ok(())
}

fn report_change(ctx: &UiContext, before: BTreeSet<String>, record: &InstalledVersion) {
    let added: Vec<_> = record.extensions.difference(&before).collect();
    let removed: Vec<_> = before.difference(&record.extensions).collect();

    if added.is_empty() && removed.is_empty() {
        ui::step_info(
            ctx,
            &format!("Extensions of PHP {} unchanged", record.major_minor),
        );
        return;
    }
    for name in added {
        ui::step_ok(ctx, &format!("Enabled {}", name));
    }
    for name in removed {
        ui::step_ok(ctx, &format!("Disabled {}", name));
    }
}

fn print_available(ctx: &UiContext) {
    ui::section(ctx, "Compiled in (changes rebuild PHP)");
    for ext in EXTENSIONS.iter().filter(|e| !e.is_alternate_mechanism()) {
        println!("  {:<12} {}", ext.name, style(ext.configure_flags.join(" ")).dim());
    }

    ui::section(ctx, "PECL modules (no rebuild)");
    for ext in EXTENSIONS.iter().filter(|e| e.is_alternate_mechanism()) {
        println!("  {:<12} {}", ext.name, style(ext.dependencies.join(", ")).dim());
    }
}
