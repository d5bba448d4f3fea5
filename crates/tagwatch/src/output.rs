//! Output formatting: table, JSON, YAML, plain.
//!
//! One-shot commands render lists and detail views in the format selected
//! by `--output`. `run` streams registry events, one line each: JSON
//! objects for the structured formats, timestamped text otherwise.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::registry::{Change, RegistryEvent};

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Render one registry event as a single line. YAML has no one-line form,
/// so it streams JSON like the other structured formats.
pub fn render_event(format: &OutputFormat, event: &RegistryEvent, color: bool) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            render_json(event, true)
        }
        OutputFormat::Table | OutputFormat::Plain => render_event_text(event, color),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

fn render_event_text(event: &RegistryEvent, color: bool) -> String {
    let stamp = event.at.format("%Y-%m-%d %H:%M:%S");
    let subject = format!("{} {}", event.kind, event.device);
    let detail = match &event.change {
        Change::Capability { capability, value } => format!("{capability} = {value}"),
        Change::Unavailable { reason } => format!("unavailable: {reason}"),
        Change::Available => "available".to_owned(),
        Change::Flow { flow } => format!("flow: {flow}"),
    };

    if !color {
        return format!("{stamp}  {subject}  {detail}");
    }
    let detail = match &event.change {
        Change::Unavailable { .. } => detail.red().to_string(),
        Change::Available => detail.green().to_string(),
        Change::Flow { .. } => detail.yellow().to_string(),
        Change::Capability { .. } => detail,
    };
    format!("{}  {}  {detail}", stamp.dimmed(), subject.bold())
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}
