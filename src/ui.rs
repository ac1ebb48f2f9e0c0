// UI layer: progress feedback while a request is in flight, printing of
// command results, and the categorized command listing used in `--help`.
// Reports go to stdout so they can be piped; progress and errors go to
// stderr.

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use crate::commands::{CommandError, Outcome, Progress};

/// Shows the progress line of a command. On a terminal it is an animated
/// spinner; otherwise the line is printed once.
#[derive(Default)]
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the animation and leave the message on screen.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

impl Progress for Spinner {
    fn begin(&mut self, message: &str) {
        self.finish();
        if !io::stderr().is_terminal() {
            eprintln!("{message}");
            return;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Print the outcome of a command and pick the process exit code.
pub fn present(outcome: &Outcome) -> ExitCode {
    match outcome {
        Ok(report) => {
            for line in report.lines() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", error_line(err));
            ExitCode::FAILURE
        }
    }
}

/// The single line shown for a failed command.
pub fn error_line(err: &CommandError) -> String {
    match err {
        CommandError::Request { .. } | CommandError::Registry { .. } => err.to_string(),
        _ => format!("Error: {err}"),
    }
}

/// One section per category, commands sorted by name, descriptions aligned.
pub fn render_categories(cmd: &clap::Command, categories: &[(&str, &[&str])]) -> String {
    let width = categories
        .iter()
        .flat_map(|(_, names)| names.iter())
        .map(|name| name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (title, names) in categories {
        let mut names: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| cmd.find_subcommand(name).is_some())
            .collect();
        if names.is_empty() {
            continue;
        }
        names.sort_unstable();

        let _ = writeln!(out, "{title}:");
        for name in names {
            let about = cmd
                .find_subcommand(name)
                .and_then(|sub| sub.get_about())
                .map(|about| about.to_string())
                .unwrap_or_default();
            let _ = writeln!(out, "  {name:<width$}  {about}");
        }
        out.push('\n');
    }
    out
}
