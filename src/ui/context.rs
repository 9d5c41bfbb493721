//! Where status output goes and whether it may be decorated

use console::Term;

/// Output target for one CLI command
///
/// Status lines go to stdout unless the command writes its payload there
/// (`encode --output -`), in which case they move to stderr and stay plain.
#[derive(Debug, Clone)]
pub struct UiContext {
    fancy: bool,
    on_stderr: bool,
}

impl UiContext {
    /// Status on stdout, decorated when a person is watching
    pub fn detect() -> Self {
        Self {
            fancy: attended(),
            on_stderr: false,
        }
    }

    /// Status on stderr; stdout is reserved for command output
    pub fn with_stdout_reserved() -> Self {
        Self {
            fancy: false,
            on_stderr: true,
        }
    }

    /// Plain status on stdout
    pub fn non_interactive() -> Self {
        Self {
            fancy: false,
            on_stderr: false,
        }
    }

    /// Whether to use cliclack widgets and spinners
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }

    /// Write one plain status line; a closed pipe is not an error here
    pub fn line(&self, text: &str) {
        let term = if self.on_stderr {
            Term::stderr()
        } else {
            Term::stdout()
        };
        let _ = term.write_line(text);
    }
}

fn attended() -> bool {
    console::user_attended() && console::user_attended_stderr() && std::env::var_os("CI").is_none()
}
