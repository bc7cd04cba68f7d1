use colored::*;
use std::fmt::Display;

pub fn success<T: Display>(text: T) -> ColoredString {
    text.to_string().green()
}

pub fn error<T: Display>(text: T) -> ColoredString {
    text.to_string().red()
}

pub fn warning<T: Display>(text: T) -> ColoredString {
    text.to_string().yellow()
}

pub fn info<T: Display>(text: T) -> ColoredString {
    text.to_string().cyan()
}

pub fn highlight<T: Display>(text: T) -> ColoredString {
    text.to_string().blue()
}

pub fn header<T: Display>(text: T) -> ColoredString {
    text.to_string().magenta().bold()
}

pub fn path<T: Display>(text: T) -> ColoredString {
    text.to_string().blue().bold()
}

/// App names in summaries and per-app headings.
pub fn app<T: Display>(text: T) -> ColoredString {
    text.to_string().white().bold()
}

pub fn timestamp<T: Display>(text: T) -> ColoredString {
    text.to_string().green().bold()
}

/// `dest -> source` arrow used in link listings.
pub fn link<S: Display, D: Display>(source: S, dest: D) -> String {
    format!("{} {} {}", path(dest), "->".dimmed(), path(source))
}
