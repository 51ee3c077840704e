use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::readers::date_parser::DateFormat;

/// A column referenced by header name or by zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(idx) => write!(f, "#{}", idx),
            ColumnRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<usize> for ColumnRef {
    fn from(idx: usize) -> Self {
        ColumnRef::Index(idx)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

/// How to load one CSV source into a monthly series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Output column name in the unified table
    pub name: String,
    pub path: PathBuf,
    pub date_column: ColumnRef,
    pub value_column: ColumnRef,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    /// Data rows to discard after the header
    #[serde(default)]
    pub skip_rows: usize,
}

fn default_has_header() -> bool {
    true
}

impl SourceSpec {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        date_column: impl Into<ColumnRef>,
        value_column: impl Into<ColumnRef>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            date_column: date_column.into(),
            value_column: value_column.into(),
            date_format: DateFormat::default(),
            has_header: true,
            skip_rows: 0,
        }
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    /// Positional file: no header row, columns by index only
    pub fn headerless(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Resolve a relative path against `base`
    pub fn rebased(mut self, base: &Path) -> Self {
        if self.path.is_relative() {
            self.path = base.join(&self.path);
        }
        self
    }
}
