//! CLI output helpers

use colored::Colorize;

pub fn heading(text: &str) -> String {
    format!("{}", text.bright_cyan())
}

pub fn label(text: &str) -> String {
    format!("{}", text.bright_blue())
}

pub fn muted(text: &str) -> String {
    format!("{}", text.bright_black())
}

pub fn success(text: &str) -> String {
    format!("{}", text.bright_green())
}

pub fn warning(text: &str) -> String {
    format!("{}", text.yellow())
}

pub fn err_line(text: &str) -> String {
    format!("{} {}", "Error:".red().bold(), text)
}

pub fn warn_line(text: &str) -> String {
    format!("[{}] {}", "Warning".yellow(), text)
}

pub fn banner_production(text: &str) -> String {
    format!("{} {}", " PRODUCTION ".white().on_red().bold(), text.red())
}

pub fn step(index: usize, total: usize, name: &str) -> String {
    format!("{} {}", format!("[{index}/{total}]").bright_black(), name.bright_cyan())
}

/// `a, b, c`, or a muted `(none)`
pub fn list(items: &[String]) -> String {
    if items.is_empty() {
        muted("(none)")
    } else {
        items.join(", ")
    }
}
