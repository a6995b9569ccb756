use console::style;
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Status line prefixes for human output
#[derive(Debug, Clone, Copy)]
enum Status {
    Success,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Info => "info",
        }
    }
}

/// Writes command results to stdout, either styled or as JSON documents.
///
/// Logs and progress go to stderr so stdout stays machine readable with
/// `--json`.
pub struct OutputWriter {
    format: OutputFormat,
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!("Failed to render JSON output: {}", e),
    }
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        let format = if json { OutputFormat::Json } else { OutputFormat::Human };
        Self { format }
    }

    fn status(&self, status: Status, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                let marker = match status {
                    Status::Success => style("✓").green().bold(),
                    Status::Info => style("ℹ").blue().bold(),
                };
                println!("{} {}", marker, message);
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "status": status.label(),
                "message": message.to_string(),
            })),
        }
    }

    pub fn success(&self, message: impl Display) {
        self.status(Status::Success, message);
    }

    pub fn info(&self, message: impl Display) {
        self.status(Status::Info, message);
    }

    /// Rounded table, human mode only
    pub fn table<T: Tabled>(&self, rows: Vec<T>) {
        if rows.is_empty() {
            println!("{}", style("(no data)").dim());
            return;
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }

    /// Structured payload; wrapped in a status envelope with `--json`
    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let value = serde_json::to_value(data)?;
        match self.format {
            OutputFormat::Human => print_json(&value),
            OutputFormat::Json => print_json(&serde_json::json!({
                "status": Status::Success.label(),
                "data": value,
            })),
        }
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    pub fn section(&self, title: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}
