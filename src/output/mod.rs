//! Output formatting for console data.
//!
//! - [`terminal`] - CSV-style terminal output with colors

mod terminal;

pub use terminal::{
    columns, format_field, header_row, options_summary, print_console, print_store, record_row,
};
