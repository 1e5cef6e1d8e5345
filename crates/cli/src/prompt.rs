//! Interactive input helpers

use anyhow::Result;
use inquire::{required, Confirm, Password, PasswordDisplayMode, Select, Text};
use std::fmt::Display;

/// Non-empty text answer
pub fn text(message: &str) -> Result<String> {
    let answer = Text::new(message)
        .with_validator(required!("This field is required"))
        .prompt()?;
    Ok(answer.trim().to_string())
}

/// Text answer falling back to `default` when left empty
pub fn text_or(message: &str, default: &str) -> Result<String> {
    let answer = Text::new(message).with_default(default).prompt()?;
    Ok(answer.trim().to_string())
}

/// Text answer that may be empty
pub fn optional_text(message: &str) -> Result<Option<String>> {
    let answer = Text::new(message)
        .with_help_message("Leave empty to skip")
        .prompt()?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Items entered one per line until an empty answer
pub fn list(message: &str) -> Result<Vec<String>> {
    let mut items = Vec::new();
    loop {
        let answer = Text::new(message)
            .with_help_message("Leave empty to finish")
            .prompt()?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(items);
        }
        items.push(answer.to_string());
    }
}

pub fn password(message: &str) -> Result<String> {
    Ok(Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?)
}

pub fn confirm(message: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new(message).with_default(default).prompt()?)
}

pub fn select<T: Display>(message: &str, options: Vec<T>) -> Result<T> {
    Ok(Select::new(message, options).prompt()?)
}
