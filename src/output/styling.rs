use console::style;

use crate::models::{BuildStatus, TestResult};

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn blue(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).blue()
}

pub fn underline(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).underlined()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

pub fn test_result(result: TestResult) -> console::StyledObject<String> {
    let label = result.label();
    match result {
        TestResult::Success => bright_green(label),
        TestResult::Failure => bright_red(label),
        TestResult::Unstable => bright_yellow(label),
        TestResult::Skipped | TestResult::Unknown => style(label.to_string()),
    }
}

/// Build status coloured by its meaning; unknown labels stay plain.
pub fn status(label: &str) -> console::StyledObject<String> {
    match BuildStatus::from_label(label) {
        BuildStatus::Success => bright_green(label),
        BuildStatus::Failure => bright_red(label),
        BuildStatus::Unstable => bright_yellow(label),
        BuildStatus::Other => style(label.to_string()),
    }
}
