use colored::Colorize;
use serde::Serialize;

pub fn print_error_message(error_message: &str) {
    eprintln!("{}", error_message.red());
}

pub fn print_warn_message(warn_message: &str) {
    eprintln!("{}", warn_message.yellow());
}

pub fn print_success_message(success_message: &str) {
    eprintln!("{}", success_message.green());
}

/// Pretty JSON on stdout so results can be piped.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
