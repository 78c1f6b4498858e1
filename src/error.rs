//! Error type shared by the loading and analysis stages.

use chrono::NaiveDate;
use thiserror::Error;

use crate::analyzers::types::ArticleKey;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: cannot parse timestamp {value:?}")]
    InvalidTimestamp { line: u64, value: String },

    #[error("line {line}, column {column:?}: invalid count {value:?}")]
    InvalidCount {
        line: u64,
        column: String,
        value: String,
    },

    #[error("line {line}: invalid value {value:?}")]
    InvalidValue { line: u64, value: String },

    #[error("line {line}: expected {expected} fields, found {found}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("date [{0}] present multiple times in ground truth CSV")]
    DuplicateDate(NaiveDate),

    #[error("unknown article {0}")]
    UnknownArticle(ArticleKey),

    #[error("{article} has {found} reference-aligned dates at offset {offset}, need at least 2")]
    InsufficientDates {
        article: ArticleKey,
        offset: i64,
        found: usize,
    },

    #[error("{article} is not aligned with {first} at offset {offset}")]
    MisalignedSeries {
        article: ArticleKey,
        first: ArticleKey,
        offset: i64,
    },

    #[error("no article has a defined correlation with the ground truth")]
    NoRankedArticles,

    #[error("regression failed: {0}")]
    Regression(String),

    #[error("{command} failed: {reason}")]
    ExternalTool { command: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
