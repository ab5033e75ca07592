//! Shared CLI output helpers for consistent operator-facing text.

use std::fmt::Display;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

const RULE_WIDTH: usize = 56;

/// Braille spinner animation frames.
const BRAILLE_SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Print a section header and separator.
pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(RULE_WIDTH).dimmed());
}

/// Print a simple key/value line.
pub fn key_value(label: &str, value: impl Display) {
    println!("  {:<16} {value}", label.dimmed());
}

/// Print a successful status line.
pub fn ok(message: &str) {
    println!("{} {message}", "✓".green());
}

/// Print a warning status line.
pub fn warn(message: &str) {
    println!("{} {message}", "⚠".yellow());
}

/// Print an error status line.
pub fn error(message: &str) {
    eprintln!("{} {message}", "✗".red());
}

/// Print a single-line note.
pub fn note(message: &str) {
    println!("  {message}");
}

/// Emphasize a value inline.
pub fn highlight(value: impl Display) -> String {
    format!("{}", value.to_string().cyan())
}

/// Create and start a progress spinner.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(BRAILLE_SPINNER)
        .template("  {spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish a spinner with a success checkmark.
pub fn spinner_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {message}", "✓".green()));
}

/// Finish a spinner with a failure mark.
pub fn spinner_fail(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {message}", "×".red()));
}
