//! Terminal rendering
//!
//! `cliclack` framing and spinners in interactive terminals, plain prefixed
//! lines in CI and pipes.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, join, key_value, outro_success, outro_warn, remark, section, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{BuildProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::init_theme;
