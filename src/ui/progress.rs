//! Spinner shown while artifacts are built or fetched from the cache

use super::context::UiContext;
use console::style;

/// Spinner around a build wait; plain start/stop lines when not attended
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    ctx: UiContext,
}

impl TaskSpinner {
    /// Create a new spinner (shows once started)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            ctx: ctx.clone(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.ctx.use_fancy_output() {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            self.ctx.line(&format!("{} {}", style("...").dim(), message));
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => self.ctx.line(&format!("{} {}", style("[OK]").green(), message)),
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => self.ctx.line(&format!("{} {}", style("[FAIL]").red(), message)),
        }
    }
}
