//! Shared utilities for the dex workspace.
//!
//! Numeric/boolean parsing used by validation and projection, and Polars
//! `AnyValue` conversion used by DataFrame-backed row sources.

pub mod values;

pub use values::{any_to_string, format_numeric, parse_bool, parse_f64, parse_i64};
