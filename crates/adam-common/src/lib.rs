//! Shared utilities for the ADaM derivation crates.
//!
//! Cell conversion between Polars `AnyValue`s and the text/number forms the
//! derivations and writers work with.

pub mod polars;

pub use polars::{
    any_is_missing, any_to_f64, any_to_i64, any_to_text, cell_text, format_numeric, parse_f64,
    parse_i64,
};
