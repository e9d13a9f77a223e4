/// One table per class joining tree statistics, class sizes and matrix width.
use crate::core::classes::ClassRow;
use crate::{Result, SupertreeError};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use tracing::warn;

pub const CLASSDATA_HEADER: &str = "class\tminimum_length\tlength\tconsistency_index\tretention_index\t\
                                    rescaled_consistency_index\tgoloboff_fit\tspecies\tstudies\tcharacters";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassData {
    pub class: String,
    pub stats: Vec<String>,
    pub species: usize,
    pub studies: usize,
    pub characters: usize,
}

impl ClassData {
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.class,
            self.stats.join("\t"),
            self.species,
            self.studies,
            self.characters
        )
    }
}

/// `className\tnchar` rows
pub fn read_nchar_table<R: BufRead>(reader: R) -> Result<BTreeMap<String, usize>> {
    let mut table = BTreeMap::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [class, nchar] => {
                let nchar = nchar.parse::<usize>().map_err(|_| {
                    SupertreeError::Parse(format!("nchar table line {}: `{}` is not a number", line_no + 1, nchar))
                })?;
                table.insert(class.to_string(), nchar);
            }
            _ => warn!("nchar table line {}: expected `class nchar`, dropping", line_no + 1),
        }
    }
    Ok(table)
}

/// Join on class name; classes absent from any table are skipped
pub fn join_class_data(
    summary: &IndexMap<String, Vec<String>>,
    class_rows: &[ClassRow],
    nchar: &BTreeMap<String, usize>,
) -> Vec<ClassData> {
    let classes: BTreeMap<&str, &ClassRow> = class_rows.iter().map(|row| (row.name.as_str(), row)).collect();

    summary
        .iter()
        .filter_map(|(class, stats)| {
            let missing = |table: &str| {
                let err = SupertreeError::MissingKey {
                    table: table.to_string(),
                    key: class.clone(),
                };
                warn!("{}, skipping", err);
            };
            let Some(row) = classes.get(class.as_str()) else {
                missing("class table");
                return None;
            };
            let Some(&characters) = nchar.get(class) else {
                missing("nchar table");
                return None;
            };
            Some(ClassData {
                class: class.clone(),
                stats: stats.clone(),
                species: row.species_count,
                studies: row.studies.len(),
                characters,
            })
        })
        .collect()
}

pub fn write_class_data<W: Write>(mut writer: W, rows: &[ClassData]) -> Result<()> {
    writeln!(writer, "{}", CLASSDATA_HEADER)?;
    for row in rows {
        writeln!(writer, "{}", row.to_row())?;
    }
    Ok(())
}
