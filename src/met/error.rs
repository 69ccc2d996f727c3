use chrono::NaiveDate;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the content of a `.met` file. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum MetParseError {
    #[error("No column headings found")]
    MissingHeadings,

    #[error("Required column '{0}' not found")]
    MissingColumn(&'static str),

    #[error("Required constant '{0}' not found in header")]
    MissingConstant(&'static str),

    #[error("Constant '{name}' has non-numeric value '{value}'")]
    InvalidConstant { name: String, value: String },

    #[error("Line {line}: expected {expected} values, found {found}")]
    RowLength {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Line {line}: invalid date")]
    InvalidDate { line: usize },

    #[error("Line {line}: date {date} does not follow {previous}")]
    OutOfOrder {
        line: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("File contains no daily records")]
    NoData,
}

#[derive(Debug, Error)]
pub enum MetFileError {
    #[error("Failed to read weather file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Malformed weather file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: MetParseError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Errors from navigating or exporting a loaded series.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Date {date} is outside the weather series ({first} to {last})")]
    DateOutOfRange {
        date: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },

    #[error("Year {0} cannot be represented as a date")]
    InvalidYear(i32),

    #[error("Failed building DataFrame: {0}")]
    Frame(#[from] PolarsError),
}
