//! One-line status messages on stderr.

use owo_colors::{OwoColorize, Style};

use super::colors_enabled;

#[derive(Clone, Copy)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn symbol(self) -> &'static str {
        match self {
            Level::Success => "✓",
            Level::Info => "ℹ",
            Level::Warning => "⚠",
            Level::Error => "✗",
        }
    }

    fn color(self) -> Style {
        match self {
            Level::Success => Style::new().green(),
            Level::Info => Style::new().blue(),
            Level::Warning => Style::new().yellow(),
            Level::Error => Style::new().red(),
        }
    }

    /// Warnings and errors tint the message too, not only the symbol.
    fn tints_message(self) -> bool {
        matches!(self, Level::Warning | Level::Error)
    }
}

fn render(level: Level, message: &str, color: bool) -> String {
    if !color {
        return format!("{} {message}", level.symbol());
    }
    let mark = level.symbol();
    let symbol = mark.style(level.color().bold());
    if level.tints_message() {
        format!("{symbol} {}", message.style(level.color()))
    } else {
        format!("{symbol} {message}")
    }
}

fn print(level: Level, message: &str) {
    eprintln!("{}", render(level, message, colors_enabled()));
}

pub fn success(message: &str) {
    print(Level::Success, message);
}

pub fn info(message: &str) {
    print(Level::Info, message);
}

pub fn warning(message: &str) {
    print(Level::Warning, message);
}

pub fn error(message: &str) {
    print(Level::Error, message);
}
