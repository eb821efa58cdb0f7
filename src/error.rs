use thiserror::Error;

/// Input header that can't be mapped onto a stage row. Fatal for the whole
/// run: a required column is absent, or present more than once (under its
/// sheet header, its alias, or both).
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error(
    "missing required column(s): [{}]; duplicated column(s): [{}]",
    .missing.join(", "),
    .duplicated.join(", ")
)]
pub struct SchemaError {
    pub missing: Vec<String>,
    pub duplicated: Vec<String>,
}

/// A single date cell that could not be read. Recovered locally: the field
/// becomes absent and the row is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparseable date in `{field}`: {value:?}")]
pub struct FieldParseError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KpiError>;
