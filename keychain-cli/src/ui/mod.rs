//! Terminal output for keychain commands
//!
//! Secret values only reach the terminal through `get`/`get-object`; every
//! listing goes through [`mask`].

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use keychain_lib::Credentials;
use std::time::Duration;

/// Kind of one-line status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The operation took effect
    Done,
    /// Nothing to act on
    Empty,
    /// Finished, but not entirely as asked
    Partial,
    /// The command failed
    Failed,
}

impl Notice {
    fn glyph(self) -> ColoredString {
        match self {
            Notice::Done => "✓".green().bold(),
            Notice::Empty => "∅".blue().bold(),
            Notice::Partial => "!".yellow().bold(),
            Notice::Failed => "✗".red().bold(),
        }
    }
}

fn notice_line(kind: Notice, message: &str) -> String {
    format!("{} {}", kind.glyph(), message)
}

/// Print a status line; failures go to stderr
pub fn notice(kind: Notice, message: &str) {
    let line = notice_line(kind, message);
    match kind {
        Notice::Failed => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

/// Report that nothing is stored under `key`
pub fn missing(what: &str, key: &str) {
    notice(Notice::Partial, &format!("No {} stored for '{}'", what, key));
}

/// Hide a secret, keeping only its length
pub fn mask(secret: Option<&str>) -> String {
    match secret {
        Some(value) => format!("{} ({} chars)", "•".repeat(8), value.chars().count()),
        None => "<withheld>".to_string(),
    }
}

fn entry_rows(entries: &[Credentials]) -> Vec<String> {
    let width = entries
        .iter()
        .map(|c| c.identifier.chars().count())
        .max()
        .unwrap_or(0);
    entries
        .iter()
        .map(|c| {
            format!(
                "  {:<width$}  {}",
                c.identifier,
                mask(c.secret.as_deref()),
                width = width
            )
        })
        .collect()
}

/// Print stored entries with masked values and a count footer
pub fn entries(entries: &[Credentials]) {
    println!("\n{}", "Stored Entries".bold().underline());
    for row in entry_rows(entries) {
        println!("{}", row);
    }
    println!("{}", "─".repeat(60).dimmed());
    println!("{} entries", entries.len().to_string().bold());
}

/// Print a titled block of aligned label/value pairs
pub fn fields(title: &str, fields: &[(&str, String)]) {
    println!("\n{}", title.bold().underline());
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in fields {
        let label = format!("{:<width$}", label, width = width);
        println!("  {}  {}", label.cyan(), value);
    }
}

fn wipe_prompt(count: Option<usize>) -> String {
    match count {
        Some(1) => "Delete the only entry?".to_string(),
        Some(n) => format!("Delete all {} entries?", n),
        None => "Delete all entries?".to_string(),
    }
}

/// Ask before wiping `count` entries (unknown when enumeration failed)
pub fn confirm_wipe(count: Option<usize>) -> anyhow::Result<bool> {
    use dialoguer::Confirm;
    Ok(Confirm::new()
        .with_prompt(wipe_prompt(count))
        .default(false)
        .interact()?)
}

/// Spinner shown while deletes are in flight
pub fn wipe_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.red} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Wiping keychain...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a decoded JSON entry
pub fn json(value: &serde_json::Value) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        println!("{}", pretty);
    }
}
