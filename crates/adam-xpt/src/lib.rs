//! SAS Transport (XPT) V5 files for derived datasets.
//!
//! Writes single-member transport files with IBM-float numerics and a
//! caller-chosen header timestamp, and reads them back for verification.
//!
//! ```no_run
//! use std::path::Path;
//! use adam_xpt::{XptColumn, XptDataset, XptValue, XptWriterOptions, write_xpt};
//!
//! let mut ds = XptDataset::with_columns(
//!     "ADSL",
//!     vec![
//!         XptColumn::character("USUBJID", 20).with_label("Unique Subject Identifier"),
//!         XptColumn::numeric("AGE").with_label("Age"),
//!     ],
//! );
//! ds.add_row(vec![XptValue::Char("01-701-1015".into()), XptValue::Num(Some(63.0))]);
//! write_xpt(Path::new("adsl.xpt"), &ds, &XptWriterOptions::default()).unwrap();
//! ```

mod error;
pub mod float;
pub mod header;
mod reader;
mod types;
mod writer;

pub use error::{Result, XptError};
pub use reader::{parse_xpt_bytes, read_xpt};
pub use types::{
    DEFAULT_TIMESTAMP, XptColumn, XptDataset, XptType, XptValue, XptWriterOptions,
    format_xpt_datetime, parse_xpt_datetime, split_format_spec,
};
pub use writer::{XptWriter, write_xpt, write_xpt_bytes};
