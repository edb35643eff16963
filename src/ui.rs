// UI layer: coloured console messages, spinners, and the interactive
// prompts. Prompts go through the `Prompter` trait so the orchestrator can
// be driven by a script in tests; `TerminalPrompter` is the real one, built
// on `dialoguer`.

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, stdout};
use std::time::Duration;

const WIDTH: usize = 70;

/// Source of user answers. Every method returns `Ok(None)` when the user
/// cancelled the prompt.
pub trait Prompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>>;
    fn text(&mut self, prompt: &str) -> Result<Option<String>>;
    fn password(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

/// An interrupted read (Ctrl-C inside the prompt) means "cancel"; any other
/// I/O failure is a real error.
fn cancellable<T>(res: io::Result<T>, what: &str) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {what}")),
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>> {
        // `interact_opt` returns None on Esc/q.
        let res = Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact_opt();
        Ok(cancellable(res, "confirmation")?.flatten())
    }

    fn text(&mut self, prompt: &str) -> Result<Option<String>> {
        let res = Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        cancellable(res, prompt)
    }

    fn password(&mut self, prompt: &str) -> Result<Option<String>> {
        // `Password` hides input in terminal.
        let res = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact();
        cancellable(res, prompt)
    }
}

/// Spinner shown while a blocking network call runs.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn clear_screen() {
    if let Err(e) = crossterm::execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0)) {
        log::debug!("could not clear screen: {e}");
    }
}

fn rule() -> String {
    "=".repeat(WIDTH)
}

fn centered(text: &str) -> String {
    format!("{text:^WIDTH$}")
}

pub fn banner() {
    println!();
    println!("{}", centered("E W U   C O U R S E   T O O L").bold().cyan());
    println!("{}", rule().blue());
    println!("{}", centered("EWU Course Fetching Tool").bold().white());
    println!("{}", centered("Secure • Fast • Reliable").dim());
    println!(
        "{}",
        centered("This is educational tool just for course fetching.")
            .dim()
            .yellow()
    );
    println!("{}", rule().blue());
    println!();
}

pub fn section(title: &str) {
    println!();
    println!("{}", format!("═══ {title} ═══").bold().cyan());
    println!();
}

pub fn success(message: &str) {
    println!("{} {message}", "✔".bold().green());
}

pub fn error(message: &str) {
    println!("{} {message}", "✘".bold().red());
}

pub fn info(message: &str) {
    println!("{} {message}", "ℹ".bold().blue());
}

pub fn warning(message: &str) {
    println!("{} {message}", "⚠".bold().yellow());
}

pub fn step(message: &str) {
    println!("{} {message}", "→".bold().cyan());
}

pub fn note(message: &str) {
    println!("{}", message.to_string().dim());
}

pub fn block(text: &str) {
    println!("{text}");
}

pub fn summary(text: &str) {
    println!();
    println!("{}", rule().cyan());
    println!();
    println!("{text}");
    println!();
    println!("{}", rule().cyan());
    println!();
}

pub fn goodbye() {
    println!();
    println!("{}", rule().cyan());
    println!(
        "{}",
        centered("Thank you for using EWU Course Tool!").bold().cyan()
    );
    println!("{}", centered("Have a productive day").bold().white());
    println!("{}", rule().cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_read_is_cancel() {
        let res: io::Result<String> = Err(io::Error::from(io::ErrorKind::Interrupted));
        assert!(cancellable(res, "Student ID").unwrap().is_none());
    }

    #[test]
    fn test_other_io_error_propagates() {
        let res: io::Result<String> = Err(io::Error::from(io::ErrorKind::BrokenPipe));
        let err = cancellable(res, "Student ID").unwrap_err();
        assert!(err.to_string().contains("Student ID"));
    }

    #[test]
    fn test_centered_width() {
        assert_eq!(centered("abc").chars().count(), WIDTH);
    }
}
