/// TreeBASE study metadata tables.
///
/// A metadata file has a header row of `prism:`/`tb:` property names and then
/// tab-separated rows keyed by year. A row is classified by its second
/// column alone: a filled matrix type makes it a matrix row, whatever follows.
/// Otherwise a row of at least four columns is a tree row, read from its last
/// three columns as quality, tree type and kind. Shorter rows are skipped.
use crate::utils::format::{format_set, percent};
use crate::Result;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaRecord {
    Matrix {
        year: String,
        matrix_type: String,
    },
    Tree {
        year: String,
        quality: String,
        tree_type: String,
        kind: String,
    },
}

pub fn parse_metadata<R: BufRead>(reader: R) -> Result<Vec<MetaRecord>> {
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() || line.contains("prism:") {
            continue;
        }
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        let year = fields[0].trim().to_string();
        let second = fields.get(1).map(|s| s.trim()).unwrap_or_default();

        if !second.is_empty() {
            records.push(MetaRecord::Matrix {
                year,
                matrix_type: second.to_string(),
            });
        } else if fields.len() >= 4 {
            let n = fields.len();
            records.push(MetaRecord::Tree {
                year,
                quality: fields[n - 3].trim().to_string(),
                tree_type: fields[n - 2].trim().to_string(),
                kind: fields[n - 1].trim().to_string(),
            });
        }
    }

    Ok(records)
}

/// Publication years and matrix types of one study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyMeta {
    pub study: String,
    pub years: BTreeSet<String>,
    pub matrix_types: BTreeSet<String>,
}

impl StudyMeta {
    /// `None` when the study has no matrix with a type
    pub fn from_records(study: impl Into<String>, records: &[MetaRecord]) -> Option<Self> {
        let mut years = BTreeSet::new();
        let mut matrix_types = BTreeSet::new();

        for record in records {
            match record {
                MetaRecord::Matrix { year, matrix_type } => {
                    years.insert(year.clone());
                    matrix_types.insert(matrix_type.clone());
                }
                MetaRecord::Tree { year, .. } => {
                    years.insert(year.clone());
                }
            }
        }

        if years.is_empty() || matrix_types.is_empty() {
            return None;
        }
        Some(Self {
            study: study.into(),
            years,
            matrix_types,
        })
    }

    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.study,
            format_set(&self.years),
            format_set(&self.matrix_types)
        )
    }
}

/// Value counts over a combined metadata file
#[derive(Debug, Default)]
pub struct MetaSummary {
    pub matrix_types: IndexMap<String, usize>,
    pub tree_kinds: IndexMap<String, usize>,
    pub qualities: IndexMap<String, usize>,
    pub tree_types: IndexMap<String, usize>,
}

fn bump(counts: &mut IndexMap<String, usize>, value: &str) {
    if !value.is_empty() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
}

impl MetaSummary {
    pub fn from_records(records: &[MetaRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            match record {
                MetaRecord::Matrix { matrix_type, .. } => bump(&mut summary.matrix_types, matrix_type),
                MetaRecord::Tree {
                    quality,
                    tree_type,
                    kind,
                    ..
                } => {
                    bump(&mut summary.qualities, quality);
                    bump(&mut summary.tree_types, tree_type);
                    bump(&mut summary.tree_kinds, kind);
                }
            }
        }
        summary
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let sections = [
            ("tb:type.matrix", &self.matrix_types),
            ("tb:kind.tree", &self.tree_kinds),
            ("tb:quality.tree", &self.qualities),
            ("tb:type.tree", &self.tree_types),
        ];
        for (title, counts) in sections {
            writeln!(writer, "{}\n----", title)?;
            let total: usize = counts.values().sum();
            for (value, count) in counts {
                writeln!(writer, "{} {:.2}", value, percent(*count, total))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
