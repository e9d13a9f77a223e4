/// MRP character blocks and the text formats they travel in.
///
/// Two layouts are read here:
///
/// * per-study dat files, one `treeblockId taxonId characterString` row per line
/// * MRP tables, `taxonId characterString` rows grouped under `#source` header lines
use crate::{Result, SupertreeError};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::warn;

/// Blocks with fewer taxa than this cannot resolve a quartet
pub const MIN_BLOCK_TAXA: usize = 4;

/// Characters contributed by one source tree, rows kept in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrpBlock {
    pub source: String,
    rows: IndexMap<String, String>,
}

impl MrpBlock {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rows: IndexMap::new(),
        }
    }

    /// Add a row, keeping every character string the same length
    pub fn insert(&mut self, taxon: impl Into<String>, chars: impl Into<String>) -> Result<()> {
        let taxon = taxon.into();
        let chars = chars.into();

        if let Some(nchar) = self.nchar() {
            if chars.len() != nchar {
                return Err(SupertreeError::MalformedBlock(format!(
                    "{}: taxon {} has {} characters, block has {}",
                    self.source,
                    taxon,
                    chars.len(),
                    nchar
                )));
            }
        }
        if self.rows.contains_key(&taxon) {
            return Err(SupertreeError::MalformedBlock(format!(
                "{}: taxon {} appears twice",
                self.source, taxon
            )));
        }

        self.rows.insert(taxon, chars);
        Ok(())
    }

    pub fn get(&self, taxon: &str) -> Option<&str> {
        self.rows.get(taxon).map(String::as_str)
    }

    /// Character count, `None` while the block is empty
    pub fn nchar(&self) -> Option<usize> {
        self.rows.values().next().map(String::len)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_degenerate(&self) -> bool {
        self.rows.len() < MIN_BLOCK_TAXA
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().map(|(t, c)| (t.as_str(), c.as_str()))
    }

    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|t, _| keep(t));
    }

    /// Taxon -> characters, sorted by taxon id
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.rows.iter().map(|(t, c)| (t.clone(), c.clone())).collect()
    }
}

/// Ordered collection of blocks as found in an MRP table file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MrpTable {
    pub blocks: Vec<MrpBlock>,
}

impl MrpTable {
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = MrpTable::default();
        let mut current: Option<usize> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(source) = trimmed.strip_prefix('#') {
                let source = source.trim();
                current = Some(table.block_index(source));
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != 2 {
                warn!(
                    "MRP line {}: expected `taxon characters`, found {} fields, dropping",
                    line_no + 1,
                    fields.len()
                );
                continue;
            }
            let Some(idx) = current else {
                warn!("MRP line {}: row before any `#source` header, dropping", line_no + 1);
                continue;
            };
            if let Err(e) = table.blocks[idx].insert(fields[0], fields[1]) {
                warn!("MRP line {}: {}, dropping", line_no + 1, e);
            }
        }

        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    fn block_index(&mut self, source: &str) -> usize {
        match self.blocks.iter().position(|b| b.source == source) {
            Some(idx) => idx,
            None => {
                self.blocks.push(MrpBlock::new(source));
                self.blocks.len() - 1
            }
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        for block in &self.blocks {
            writeln!(writer, "#{}", block.source)?;
            for (taxon, chars) in block.rows() {
                writeln!(writer, "{}\t{}", taxon, chars)?;
            }
        }
        Ok(())
    }
}

/// One line of a per-study dat file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyRow {
    pub treeblock: String,
    pub taxon: String,
    pub chars: String,
}

pub fn read_study_rows<R: BufRead>(reader: R) -> Result<Vec<StudyRow>> {
    let mut rows = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            warn!(
                "dat line {}: expected `treeblock taxon characters`, dropping",
                line_no + 1
            );
            continue;
        }
        rows.push(StudyRow {
            treeblock: fields[0].to_string(),
            taxon: fields[1].to_string(),
            chars: fields[2].to_string(),
        });
    }

    Ok(rows)
}

pub fn load_study_rows<P: AsRef<Path>>(path: P) -> Result<Vec<StudyRow>> {
    let file = File::open(path)?;
    read_study_rows(BufReader::new(file))
}

/// Group dat rows into treeblock -> (taxon -> characters)
pub fn group_by_treeblock(rows: &[StudyRow]) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.treeblock.clone())
            .or_default()
            .insert(row.taxon.clone(), row.chars.clone());
    }
    grouped
}

/// Study id encoded in a dat file name: `S1234.Tb5678.dat` -> `S1234`
pub fn study_id_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    study_id_from_source(name.trim_end_matches(".dat"))
}

/// Study part of a block source id: `S1234.Tb5678` -> `S1234`
pub fn study_id_from_source(source: &str) -> String {
    match source.find(".Tb") {
        Some(idx) => source[..idx].to_string(),
        None => source.to_string(),
    }
}
