use thiserror::Error;

/// A size or count field whose magnitude could not be read.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot parse {field}: {raw:?}")]
pub struct ParseError {
    pub field: String,
    pub raw:   String,
}

impl ParseError {
    pub fn new(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Self { field: field.into(), raw: raw.into() }
    }
}

/// A required attribute path is absent from the node record.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("missing attribute {path}")]
pub struct SchemaError {
    pub path: String,
}

impl SchemaError {
    pub fn missing(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Why a single host could not be turned into a report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
