//! Output formatting for rsmitst

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use smi_adapter_gpu::{DeviceDescriptor, PowerTelemetry, Reading};
use smi_core::Microwatts;
use smi_harness::{CaseReport, Outcome, SuiteReport};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Compact text format
    Text,
}

impl OutputFormat {
    /// Machine-readable formats own stdout
    pub fn is_structured(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Yaml)
    }
}

/// Trait for types that can be formatted for output
pub trait Formattable {
    fn table_headers() -> Vec<String>;
    fn table_row(&self) -> Vec<String>;

    /// Key-value pairs for the text format
    fn key_value_pairs(&self) -> Vec<(String, String)>;
}

/// A registered test case, as shown by `list`
#[derive(Debug, Clone, Serialize)]
pub struct CaseListing {
    pub name: String,
    pub title: String,
    pub description: String,
}

impl Formattable for CaseListing {
    fn table_headers() -> Vec<String> {
        vec!["Name".to_string(), "Title".to_string(), "Description".to_string()]
    }

    fn table_row(&self) -> Vec<String> {
        vec![self.name.clone(), self.title.clone(), self.description.clone()]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("Name".to_string(), self.name.clone()),
            ("Title".to_string(), self.title.clone()),
            ("Description".to_string(), self.description.clone()),
        ]
    }
}

impl Formattable for CaseReport {
    fn table_headers() -> Vec<String> {
        vec![
            "Case".to_string(),
            "Title".to_string(),
            "Outcome".to_string(),
            "Duration".to_string(),
            "Reason".to_string(),
        ]
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.title.clone(),
            colorize_outcome(&self.outcome).to_string(),
            format_duration_ms(self.duration_ms),
            self.outcome.reason().unwrap_or("-").to_string(),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Case".to_string(), self.name.clone()),
            ("Title".to_string(), self.title.clone()),
            ("Outcome".to_string(), self.outcome.label().to_string()),
            ("Duration".to_string(), format_duration_ms(self.duration_ms)),
        ];
        if let Some(reason) = self.outcome.reason() {
            pairs.push(("Reason".to_string(), reason.to_string()));
        }
        pairs
    }
}

impl Formattable for DeviceDescriptor {
    fn table_headers() -> Vec<String> {
        vec!["Index".to_string(), "Device ID".to_string(), "Name".to_string()]
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            format!("0x{:04x}", self.id),
            self.name.clone(),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("Index".to_string(), self.index.to_string()),
            ("Device ID".to_string(), format!("0x{:04x}", self.id)),
            ("Name".to_string(), self.name.clone()),
        ]
    }
}

impl Formattable for PowerTelemetry {
    fn table_headers() -> Vec<String> {
        vec![
            "Device".to_string(),
            "Power Cap".to_string(),
            "Default Cap".to_string(),
            "Cap Range".to_string(),
            "Average".to_string(),
            "Cap Use".to_string(),
        ]
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.device.to_string(),
            format_reading(&self.current_cap, |cap| format_watts(*cap)),
            format_reading(&self.default_cap, |cap| format_watts(*cap)),
            format_reading(&self.cap_range, |range| {
                format!("{} - {}", format_watts(range.min), format_watts(range.max))
            }),
            format_reading(&self.average, |power| format_watts(*power)),
            self.cap_utilization()
                .map(format_percentage)
                .unwrap_or_else(|| "-".to_string()),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        Self::table_headers()
            .into_iter()
            .zip(self.table_row())
            .collect()
    }
}

/// Output formatter
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format and print a list of items
    pub fn print_list<T>(&self, items: &[T]) -> Result<()>
    where
        T: Serialize + Formattable,
    {
        if items.is_empty() {
            match self.format {
                OutputFormat::Json | OutputFormat::Yaml => println!("[]"),
                OutputFormat::Table | OutputFormat::Text => {
                    println!("{}", "No items found".dimmed());
                }
            }
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(items)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(items)?);
            }
            OutputFormat::Table => {
                println!("{}", render_table(items));
            }
            OutputFormat::Text => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    for (key, value) in item.key_value_pairs() {
                        println!("{}: {}", key, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Print a finished suite: the whole report for structured formats, a
    /// case table and a summary line otherwise
    pub fn print_report(&self, report: &SuiteReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(report)?);
            }
            OutputFormat::Table | OutputFormat::Text => {
                self.print_list(&report.cases)?;
                let summary = format!(
                    "{} passed, {} failed, {} skipped on the {} backend in {}",
                    report.passed(),
                    report.failed(),
                    report.skipped(),
                    report.backend,
                    format_duration_ms(report.duration_ms().max(0) as u64)
                );
                if report.is_success() {
                    self.print_success(&summary);
                } else {
                    self.print_error(&summary);
                }
            }
        }
        Ok(())
    }

    pub fn print_success(&self, message: &str) {
        match self.format {
            OutputFormat::Table => println!("{} {}", "✓".green().bold(), message.green()),
            _ => println!("{}", message),
        }
    }

    pub fn print_error(&self, message: &str) {
        match self.format {
            OutputFormat::Table => eprintln!("{} {}", "✗".red().bold(), message.red()),
            _ => eprintln!("{}", message),
        }
    }
}

fn render_table<T: Formattable>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = T::table_headers()
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for item in items {
        table.add_row(item.table_row());
    }
    table
}

/// Format a reading, showing the status symbol when unavailable
pub fn format_reading<T>(reading: &Reading<T>, render: impl FnOnce(&T) -> String) -> String {
    match reading {
        Reading::Value(value) => render(value),
        Reading::Unavailable(status) => status.symbol().to_string(),
    }
}

pub fn format_watts(power: Microwatts) -> String {
    format!("{:.1} W", power.as_watts())
}

/// Format a 0-100 share
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1_000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}

pub fn colorize_outcome(outcome: &Outcome) -> ColoredString {
    let label = outcome.label();
    match outcome {
        Outcome::Passed => label.green(),
        Outcome::Skipped { .. } => label.yellow(),
        Outcome::Failed { .. } => label.red(),
    }
}
