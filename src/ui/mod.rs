//! Terminal output for CLI commands
//!
//! Uses `cliclack` for styled output in an interactive terminal and falls
//! back to plain tagged lines (`[OK]`, `[WARN]`) when piped or in CI, so
//! command output stays greppable.
//!
//! # Example
//!
//! ```rust,ignore
//! use logprep::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Encoding Sepsis...");
//! // ... wait for artifacts ...
//! spinner.stop("Artifacts ready");
//! ui::step_ok_detail(&ctx, "Archive written", "Sepsis.zip");
//! ```

mod context;
mod output;
mod progress;

use cliclack::ThemeState;
use console::{Color, Style};

pub use context::UiContext;
pub use output::{intro, key_value, remark, step_info, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;

/// Accent for banners and active widgets
pub(crate) const ACCENT: Color = Color::Blue;

struct LogprepTheme;

impl cliclack::Theme for LogprepTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Active | ThemeState::Submit => Style::new().fg(ACCENT),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Submit => Style::new().green(),
            _ => self.bar_color(state),
        }
    }
}

/// Install the logprep cliclack theme
pub fn init_theme() {
    cliclack::set_theme(LogprepTheme);
}
