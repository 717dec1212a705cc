//! Input loading for the derivation pipeline.

pub mod csv_table;
pub mod discovery;
pub mod error;

pub use csv_table::{
    CsvTable, DEFAULT_NA_VALUES, read_csv_frame, read_csv_table, read_csv_table_with_na,
};
pub use discovery::{StudyFiles, discover_study_files, list_csv_files};
pub use error::{IngestError, Result};
