//! Terminal output utilities.
//!
//! Provides formatting helpers for terminal output.

use crate::api::{describe_status, RestSource};
use crate::console::Console;
use crate::models::{EntityKind, Record, RecordState};
use crate::store::RecordStore;
use colored::{ColoredString, Colorize};
use itertools::Itertools;
use serde_json::Value;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

/// Listed fields and their widths per kind.
pub fn columns(kind: EntityKind) -> &'static [(&'static str, usize)] {
    match kind {
        EntityKind::Subnet => &[
            ("Name", 16),
            ("Subnet", 20),
            ("ActiveStart", 17),
            ("ActiveEnd", 17),
            ("Strategy", 6),
            ("NextServer", 17),
        ],
        EntityKind::Machine => &[
            ("Name", 20),
            ("Uuid", 38),
            ("Address", 17),
            ("BootEnv", 16),
        ],
        EntityKind::BootEnv => &[("Name", 24), ("Kernel", 24), ("Available", 7)],
        EntityKind::Pref => &[("Name", 20), ("Val", 24)],
    }
}

/// One CSV-style line for a record, without color.
pub fn record_row(index: usize, record: &Record) -> String {
    let state = record.state();
    let fields = columns(record.kind())
        .iter()
        .map(|(name, width)| format_field(record.field_str(name), *width));
    std::iter::once(format_field(index, 4))
        .chain(std::iter::once(format_field(state.label(), 8)))
        .chain(fields)
        .join(",")
}

pub fn header_row(kind: EntityKind) -> String {
    std::iter::once(format_field("#", 4))
        .chain(std::iter::once(format_field("state", 8)))
        .chain(columns(kind).iter().map(|(name, width)| format_field(name, *width)))
        .join(",")
}

/// Render DHCP options as `code=value, ...`.
pub fn options_summary(options: Option<&Value>) -> String {
    options
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|o| {
                    let code = o.get("Code").map(Value::to_string).unwrap_or_default();
                    let value = o.get("Value").and_then(Value::as_str).unwrap_or("");
                    format!("{code}={value}")
                })
                .join(", ")
        })
        .unwrap_or_default()
}

fn paint(state: RecordState, line: &str) -> ColoredString {
    match state {
        RecordState::Clean => line.normal(),
        RecordState::New => line.green(),
        RecordState::Dirty => line.yellow(),
        RecordState::Saving | RecordState::Deleting => line.blue(),
        RecordState::Error => line.red(),
    }
}

/// Print one store: header, a row per record, details of expanded records.
pub fn print_store<S: RestSource>(store: &RecordStore<S>) {
    let kind = store.kind();
    println!("# {} ({})", kind.collection_path(), store.len());
    println!("{}", header_row(kind));
    for (i, record) in store.records().iter().enumerate() {
        println!("{}", paint(record.state(), &record_row(i, record)));
        if let Some(message) = record.error_message() {
            println!("      {} {message}", "error".on_red());
        }
        if record.expand {
            if kind == EntityKind::Subnet {
                println!("      options: {}", options_summary(record.field("Options")));
            }
            match serde_json::to_string_pretty(record.fields()) {
                Ok(text) => println!("{text}"),
                Err(e) => log::warn!("cannot render {kind} {}: {e}", record.id()),
            }
        }
    }
    if kind == EntityKind::Subnet && !store.interfaces().is_empty() {
        let free = store
            .interfaces()
            .iter()
            .map(|i| format!("{} [{}]", i.name, i.addresses.iter().join(" ")))
            .join(", ");
        println!("# interfaces without subnet: {free}");
    }
}

/// Print the session status and every collection.
pub fn print_console<S: RestSource>(console: &Console<S>) {
    let session = console.session();
    let status = session
        .last_status()
        .map(describe_status)
        .unwrap_or_else(|| "Not logged in".to_string());
    let status = if session.has_access() {
        status.as_str().green()
    } else {
        status.as_str().on_red()
    };
    println!("#access: {status}");
    if let Some(at) = session.authorized_at() {
        println!("#authorized at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "#available boot environments: {}",
        session.available_bootenvs().iter().join(", ")
    );
    for kind in EntityKind::ALL {
        print_store(console.store(kind));
    }
}
