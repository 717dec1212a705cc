use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Char,
    Num,
}

/// One output column of a derived dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub label: String,
    pub data_type: VariableType,
    /// Storage length for character variables; derived from the data when `None`.
    pub length: Option<u16>,
    /// SAS display format, e.g. `DATE9.` for numeric dates.
    pub format: Option<String>,
}

impl Variable {
    pub fn char(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            data_type: VariableType::Char,
            length: None,
            format: None,
        }
    }

    pub fn num(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            data_type: VariableType::Num,
            length: None,
            format: None,
        }
    }

    pub fn with_length(mut self, length: u16) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }
}

/// Declared column set and order of a derived dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub label: String,
    pub variables: Vec<Variable>,
}

impl DatasetSpec {
    pub fn new(name: &str, label: &str, variables: Vec<Variable>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            variables,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// Lower-case file stem used for persisted outputs.
    pub fn file_stem(&self) -> String {
        self.name.to_lowercase()
    }
}
