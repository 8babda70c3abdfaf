//! Terminal UI utilities

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print a section header
pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

/// Print a key-value pair
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Create a spinner progress indicator
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Render a credit balance as `remaining / total` with a colour hint
pub fn balance(remaining: u64, total: u64) -> String {
    let text = format!("{} / {}", remaining, total);
    if remaining == 0 {
        text.red().to_string()
    } else if remaining.saturating_mul(5) <= total {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

/// Print a separator line
pub fn separator() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Print JSON prettily
pub fn json(value: &serde_json::Value) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        println!("{}", pretty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_colour_thresholds() {
        assert_eq!(balance(0, 10), "0 / 10".red().to_string());
        assert_eq!(balance(2, 10), "2 / 10".yellow().to_string());
        assert_eq!(balance(3, 10), "3 / 10".green().to_string());
    }

    #[test]
    fn test_balance_handles_huge_values() {
        let text = balance(u64::MAX, u64::MAX);
        assert_eq!(text, format!("{0} / {0}", u64::MAX).green().to_string());
    }
}
