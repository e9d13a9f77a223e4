/// Per-study totals of externally computed per-character scores.
use crate::bio::mrp::study_id_from_source;
use crate::bio::nexus::CharLabel;
use crate::{Result, SupertreeError};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use tracing::warn;

/// Whitespace separated integer scores, one per matrix column
pub fn read_scores<R: BufRead>(reader: R) -> Result<Vec<u64>> {
    let mut scores = Vec::new();
    for line in reader.lines() {
        for token in line?.split_whitespace() {
            let score = token
                .parse::<u64>()
                .map_err(|_| SupertreeError::Parse(format!("score `{}` is not an integer", token)))?;
            scores.push(score);
        }
    }
    Ok(scores)
}

/// Sum column scores per study, ascending by score
pub fn study_scores(labels: &[CharLabel], scores: &[u64]) -> Vec<(String, u64)> {
    let columns: usize = labels.iter().map(|l| l.length).sum();
    if columns != scores.len() {
        warn!(
            "Char labels cover {} columns but {} scores were given, using the shorter",
            columns,
            scores.len()
        );
    }

    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    let columns = labels
        .iter()
        .flat_map(|label| std::iter::repeat(label.source.as_str()).take(label.length));
    for (source, score) in columns.zip(scores) {
        *totals.entry(study_id_from_source(source)).or_insert(0) += score;
    }

    let mut ranked: Vec<(String, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub fn write_study_scores<W: Write>(mut writer: W, scores: &[(String, u64)]) -> Result<()> {
    for (study, score) in scores {
        writeln!(writer, "{}\t{}", study, score)?;
    }
    Ok(())
}
