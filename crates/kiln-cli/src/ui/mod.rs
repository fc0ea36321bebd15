//! Terminal output: status lines, spinners and build summaries.
//!
//! Everything here writes to stderr so stdout stays free for piping.
//! Colors are decided once by [`init_colors`].

mod format;
mod messages;
mod spinner;

pub use format::{format_duration, format_size, print_build_summary, print_diagnostics};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

use owo_colors::{OwoColorize, Style};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Decide once whether terminal output is colored.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled_stderr(enabled);
}

/// Apply `style` unless colors are disabled.
pub(crate) fn paint(text: impl Display, style: Style) -> String {
    if COLORS.load(Ordering::Relaxed) {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Check if color output should be enabled.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise colors follow whether
/// stderr is attended.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr()
}

/// Spinners only make sense on an interactive terminal.
pub fn should_animate() -> bool {
    !is_ci() && console::user_attended_stderr()
}
