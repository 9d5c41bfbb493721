//! Output functions for consistent CLI formatting

use super::context::UiContext;
use super::ACCENT;
use console::style;

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).fg(ACCENT).bold()).ok();
    } else {
        ctx.line(&style(title).fg(ACCENT).bold().to_string());
        ctx.line("");
    }
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        ctx.line(&format!("  {} {} ({})", style("[OK]").green(), message, detail));
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        ctx.line(&format!("  {} {} - {}", style("[WARN]").yellow(), message, hint));
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        ctx.line(&format!("  {} {}", style("[INFO]").fg(ACCENT), message));
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        ctx.line(&format!("  {}", style(message).dim()));
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        ctx.line(&format!("  {}: {}", style(key).dim(), value));
    } else {
        ctx.line(&format!("  {}: {}", key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_with_stdout_reserved() {
        let ctx = UiContext::with_stdout_reserved();
        intro(&ctx, "Encoding Sepsis");
        step_ok_detail(&ctx, "Artifacts ready", "3 files");
    }

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        intro(&ctx, "Cache");
        step_ok_detail(&ctx, "Archive written", "Sepsis.zip");
        remark(&ctx, "hint");
        step_info(&ctx, "No datasets found");
        step_warn_hint(&ctx, "Config exists", "Use --force");
        key_value(&ctx, "bind", "127.0.0.1:8000");
    }
}
