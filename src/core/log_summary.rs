/// Tree statistics scraped from PAUP* logs.
///
/// Statistic lines are collected until a `tree saved to file "..."` line
/// names the class they belong to. A record is committed only when both CI
/// and RI have been seen; the collected values are then cleared.
use crate::utils::format::EMPTY_SET;
use crate::{Result, SupertreeError};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

pub const TABLE_HEADER: &str =
    "Class\tminimum_length\tlength\tconsistency_index\tretention_index\trescaled_consistency_index\tgoloboff_fit";

const LABEL_MARKER: &str = "tree saved to file";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub minimum_length: Option<String>,
    pub length: Option<String>,
    pub consistency_index: Option<String>,
    pub retention_index: Option<String>,
    pub rescaled_consistency_index: Option<String>,
    pub goloboff_fit: Option<String>,
}

impl TreeStats {
    /// CI and RI are both known
    pub fn is_ready(&self) -> bool {
        self.consistency_index.is_some() && self.retention_index.is_some()
    }

    pub fn fields(&self) -> [Option<&str>; 6] {
        [
            self.minimum_length.as_deref(),
            self.length.as_deref(),
            self.consistency_index.as_deref(),
            self.retention_index.as_deref(),
            self.rescaled_consistency_index.as_deref(),
            self.goloboff_fit.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statistic {
    MinimumLength,
    Length,
    ConsistencyIndex,
    RetentionIndex,
    RescaledConsistencyIndex,
    GoloboffFit,
}

impl Statistic {
    fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_start();
        let prefixes = [
            ("Min", Self::MinimumLength),
            ("Length", Self::Length),
            ("CI", Self::ConsistencyIndex),
            ("RI", Self::RetentionIndex),
            ("RC", Self::RescaledConsistencyIndex),
            ("G-fit", Self::GoloboffFit),
        ];
        prefixes
            .into_iter()
            .find(|(prefix, _)| line.starts_with(prefix))
            .map(|(_, stat)| stat)
    }

    /// Undefined ratios are written as `x/y` by PAUP*
    fn canonical(self, value: &str) -> String {
        if !value.contains('/') {
            return value.to_string();
        }
        match self {
            Self::ConsistencyIndex | Self::RetentionIndex | Self::RescaledConsistencyIndex => "1.000".to_string(),
            Self::GoloboffFit => "0.000".to_string(),
            Self::MinimumLength | Self::Length => value.to_string(),
        }
    }

    fn slot(self, stats: &mut TreeStats) -> &mut Option<String> {
        match self {
            Self::MinimumLength => &mut stats.minimum_length,
            Self::Length => &mut stats.length,
            Self::ConsistencyIndex => &mut stats.consistency_index,
            Self::RetentionIndex => &mut stats.retention_index,
            Self::RescaledConsistencyIndex => &mut stats.rescaled_consistency_index,
            Self::GoloboffFit => &mut stats.goloboff_fit,
        }
    }
}

/// File name inside the first pair of double quotes
fn saved_tree_label(line: &str) -> Option<&str> {
    let quoted = line.split('"').nth(1)?;
    let label = quoted.rsplit('/').next().unwrap_or(quoted);
    (!label.is_empty()).then_some(label)
}

#[derive(Debug, Default)]
pub struct LogSummarizer {
    pending: TreeStats,
    records: IndexMap<String, TreeStats>,
}

impl LogSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) {
        if line.contains(LABEL_MARKER) {
            match saved_tree_label(line) {
                Some(label) => self.commit(label),
                None => warn!("No quoted file name in `{}`", line.trim()),
            }
            return;
        }

        let Some(stat) = Statistic::from_line(line) else {
            return;
        };
        match line.split_whitespace().last() {
            Some(value) => *stat.slot(&mut self.pending) = Some(stat.canonical(value)),
            None => debug!("Statistic line without a value: `{}`", line.trim()),
        }
    }

    fn commit(&mut self, label: &str) {
        if !self.pending.is_ready() {
            debug!("{} seen before CI and RI, still collecting", label);
            return;
        }
        let stats = std::mem::take(&mut self.pending);
        if self.records.contains_key(label) {
            debug!("Keeping the first record for {}", label);
        } else {
            self.records.insert(label.to_string(), stats);
        }
    }

    pub fn finish(self) -> IndexMap<String, TreeStats> {
        self.records
    }
}

pub fn summarize<R: BufRead>(reader: R) -> Result<IndexMap<String, TreeStats>> {
    let mut summarizer = LogSummarizer::new();
    for line in reader.lines() {
        summarizer.feed_line(&line?);
    }
    Ok(summarizer.finish())
}

fn class_name(label: &str) -> &str {
    label.strip_suffix(".tre").unwrap_or(label)
}

pub fn write_table<W: Write>(mut writer: W, records: &IndexMap<String, TreeStats>) -> Result<()> {
    writeln!(writer, "{}", TABLE_HEADER)?;
    for (label, stats) in records {
        let values: Vec<&str> = stats
            .fields()
            .iter()
            .map(|v| v.unwrap_or(EMPTY_SET))
            .collect();
        writeln!(writer, "{}\t{}", class_name(label), values.join("\t"))?;
    }
    Ok(())
}

pub fn write_json<W: Write>(writer: W, records: &IndexMap<String, TreeStats>) -> Result<()> {
    let by_class: IndexMap<&str, &TreeStats> = records
        .iter()
        .map(|(label, stats)| (class_name(label), stats))
        .collect();
    serde_json::to_writer_pretty(writer, &by_class)
        .map_err(|e| SupertreeError::Other(format!("Failed to write JSON: {}", e)))
}

/// Rows of a written summary table keyed by class, header skipped
pub fn read_table<R: BufRead>(reader: R) -> Result<IndexMap<String, Vec<String>>> {
    let mut rows = IndexMap::new();
    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(class) = fields.next() else {
            continue;
        };
        if class == "Class" {
            continue;
        }
        rows.insert(class.to_string(), fields.map(str::to_string).collect());
    }
    Ok(rows)
}
