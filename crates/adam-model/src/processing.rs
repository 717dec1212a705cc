use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Xpt,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Xpt => f.write_str("xpt"),
        }
    }
}

/// Files written for one dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputPaths {
    pub csv: Option<PathBuf>,
    pub xpt: Option<PathBuf>,
}
