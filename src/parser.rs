//! CSV loaders for the Wikipedia access counts and the ground-truth series.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{ArticleKey, CountSeries, GroundTruth, WikiCounts};
use crate::error::{AnalysisError, Result};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// What a column of the counts CSV holds.
#[derive(Debug, Clone, PartialEq)]
enum Column {
    Article(ArticleKey),
    ProjectTotal(String),
}

/// Parses a timestamp in any of the accepted layouts. Bare dates read as midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Maps a counts-CSV header to its column kind.
///
/// `project` is a whole-project total; `project-article` names an article,
/// with any further hyphens in the article name dropped.
fn parse_header(header: &str) -> Column {
    let mut parts = header.trim().split('-');
    let project = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        Column::ProjectTotal(project)
    } else {
        Column::Article(ArticleKey::new(project, rest.concat()))
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Reads hourly (or coarser) Wikipedia access counts in wide format.
///
/// The first column holds the timestamp of the *end* of each counting period,
/// so one hour is subtracted before the calendar day is taken. Counts landing
/// on the same day are summed.
pub fn parse_wiki_counts<R: Read>(reader: R) -> Result<WikiCounts> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns: Vec<Column> = headers.iter().skip(1).map(parse_header).collect();

    let mut articles: BTreeMap<ArticleKey, CountSeries> = BTreeMap::new();
    let mut project_totals: BTreeMap<String, CountSeries> = BTreeMap::new();
    for column in &columns {
        match column {
            Column::Article(key) => {
                articles.entry(key.clone()).or_default();
                project_totals.entry(key.project.clone()).or_default();
            }
            Column::ProjectTotal(project) => {
                project_totals.entry(project.clone()).or_default();
            }
        }
    }

    let mut rows = 0usize;
    for result in rdr.records() {
        let record = result?;
        let line = line_of(&record);
        if record.len() != headers.len() {
            return Err(AnalysisError::RowWidth {
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let raw = record.get(0).unwrap_or_default();
        let timestamp = parse_timestamp(raw).ok_or_else(|| AnalysisError::InvalidTimestamp {
            line,
            value: raw.to_string(),
        })?;
        let date = (timestamp - Duration::hours(1)).date();

        for ((column, value), header) in columns
            .iter()
            .zip(record.iter().skip(1))
            .zip(headers.iter().skip(1))
        {
            let count: u64 =
                value
                    .trim()
                    .parse()
                    .map_err(|_| AnalysisError::InvalidCount {
                        line,
                        column: header.to_string(),
                        value: value.to_string(),
                    })?;

            let series = match column {
                Column::Article(key) => articles.entry(key.clone()).or_default(),
                Column::ProjectTotal(project) => project_totals.entry(project.clone()).or_default(),
            };
            series.add(date, count);
        }
        rows += 1;
    }

    debug!(rows, columns = columns.len(), "Wiki counts parsed");
    Ok(WikiCounts::new(articles, project_totals))
}

/// Reads a headerless `date,value` ground-truth series.
///
/// # Errors
///
/// Fails with [`AnalysisError::DuplicateDate`] as soon as a date repeats.
pub fn parse_ground_truth<R: Read>(reader: R) -> Result<GroundTruth> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = line_of(&record);
        if record.len() < 2 {
            return Err(AnalysisError::RowWidth {
                line,
                expected: 2,
                found: record.len(),
            });
        }

        let raw_date = record.get(0).unwrap_or_default();
        let date = parse_timestamp(raw_date)
            .ok_or_else(|| AnalysisError::InvalidTimestamp {
                line,
                value: raw_date.to_string(),
            })?
            .date();

        let raw_value = record.get(1).unwrap_or_default();
        let value: f64 = raw_value
            .trim()
            .parse()
            .map_err(|_| AnalysisError::InvalidValue {
                line,
                value: raw_value.to_string(),
            })?;

        entries.push((date, value));
    }

    GroundTruth::from_entries(entries)
}

/// Loads the Wikipedia counts CSV at `path`.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_wiki_counts(path: impl AsRef<Path>) -> Result<WikiCounts> {
    let file = File::open(path.as_ref())?;
    let counts = parse_wiki_counts(file)?;
    info!(
        articles = counts.article_count(),
        projects = counts.project_count(),
        "Wiki counts loaded"
    );
    Ok(counts)
}

/// Loads the ground-truth CSV at `path`.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_ground_truth(path: impl AsRef<Path>) -> Result<GroundTruth> {
    let file = File::open(path.as_ref())?;
    let truth = parse_ground_truth(file)?;
    info!(dates = truth.len(), "Ground truth loaded");
    Ok(truth)
}
