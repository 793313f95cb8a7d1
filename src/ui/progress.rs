//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::report::Reporter;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const MESSAGE_WIDTH: usize = 60;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Spinner narrating a build through [`Reporter`] messages.
///
/// Interactive sessions get one updating indicatif line with elapsed time;
/// CI gets one printed line per step.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            let template = ProgressStyle::with_template(
                "  {spinner:.magenta} {prefix:.bold}  {msg}  {elapsed:.dim}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
            bar.set_style(template);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("{}", style(label).bold());
            None
        };
        Self { bar }
    }

    /// Reporter feeding this indicator
    pub fn reporter(&self) -> Reporter {
        match self.bar.clone() {
            Some(bar) => Reporter::new(move |msg| bar.set_message(shorten(msg, MESSAGE_WIDTH))),
            None => Reporter::new(|msg| println!("  {} {}", style("-").dim(), msg)),
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

impl Drop for BuildProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Truncate to `max` characters with a trailing ellipsis
fn shorten(line: &str, max: usize) -> String {
    let line = line.trim();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let kept: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
