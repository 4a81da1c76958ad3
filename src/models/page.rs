// Models - Paged results and filter vocabulary
use serde::{Deserialize, Serialize};

/// One page of rows plus the server's totals for the whole filtered set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub rows: Vec<T>,
    pub total_pages: u64,
    pub total_records: u64,
}

impl<T> ResultPage<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total_pages: 0,
            total_records: 0,
        }
    }
}

impl<T> Default for ResultPage<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Distinct values offered as filter choices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterVocabulary {
    pub categories: Vec<String>,
    pub colors: Vec<String>,
    pub gates: Vec<String>,
}

/// Output format of a bulk export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Xlsx,
}

impl ExportFormat {
    /// Value of the `file_format` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => ".csv",
            ExportFormat::Xlsx => ".xlsx",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("Unsupported export format: {}", other)),
        }
    }
}
