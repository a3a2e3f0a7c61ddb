//! Output formatting for the CLI.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value};

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print an API payload: indented for people, one line for pipes.
pub fn print_value(value: &Value, format: &OutputFormat) {
    let rendered = match format {
        OutputFormat::Text => serde_json::to_string_pretty(value),
        OutputFormat::Json => serde_json::to_string(value),
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => {
            println!("{}", json!({ "status": "success", "message": message }));
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            eprintln!("{}", json!({ "status": "error", "message": message }));
        }
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}
