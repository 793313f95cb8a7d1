//! Line-oriented output shared by every command
//!
//! Interactive terminals render through cliclack's log gutter; CI and pipes
//! get bracketed status tags so the output stays greppable.

use super::context::UiContext;
use console::style;

#[derive(Clone, Copy)]
enum Level {
    Ok,
    Warn,
    Info,
    Remark,
}

impl Level {
    fn tag(self) -> String {
        match self {
            Self::Ok => style("[OK]").green().to_string(),
            Self::Warn => style("[WARN]").yellow().to_string(),
            Self::Info => style("[INFO]").cyan().to_string(),
            Self::Remark => String::new(),
        }
    }
}

fn emit(ctx: &UiContext, level: Level, message: String) {
    if ctx.use_fancy_output() {
        let _ = match level {
            Level::Ok => cliclack::log::success(message),
            Level::Warn => cliclack::log::warning(message),
            Level::Info => cliclack::log::info(message),
            Level::Remark => cliclack::log::remark(message),
        };
        return;
    }
    match level {
        Level::Remark => println!("  {}", style(message).dim()),
        _ => println!("  {} {}", level.tag(), message),
    }
}

/// Opening banner of a multi-step command
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(style(title).magenta().bold());
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, message, Level::Ok);
}

pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, message, Level::Warn);
}

fn outro(ctx: &UiContext, message: &str, level: Level) {
    if !ctx.use_fancy_output() {
        println!("{} {}", level.tag(), message);
        return;
    }
    let styled = match level {
        Level::Warn => style(message).yellow().bold(),
        _ => style(message).green().bold(),
    };
    let _ = cliclack::outro(styled);
}

pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        let _ = cliclack::log::info(style(title).bold());
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Ok, message.to_string());
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    emit(ctx, Level::Ok, format!("{} ({})", message, style(detail).dim()));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Warn, message.to_string());
}

/// Warning followed by a suggested command
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    emit(ctx, Level::Warn, format!("{} - {}", message, style(hint).dim()));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Info, message.to_string());
}

pub fn remark(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Remark, message.to_string());
}

/// Indented `key: value` pair, the key dimmed on terminals
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    let key = if ctx.use_fancy_output() {
        style(key).dim().to_string()
    } else {
        key.to_string()
    };
    println!("  {}: {}", key, value);
}

/// Comma-separated names, `-` when empty
pub fn join<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let joined = names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}
