/// Per-class MRP tables cut out of the per-study dat files.
use crate::bio::mrp::{group_by_treeblock, load_study_rows, study_id_from_path, MrpBlock, MrpTable};
use crate::core::classes::ClassRow;
use crate::{Result, SupertreeError};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Classes need more species than this to be worth a partition
const MIN_CLASS_SPECIES: usize = 2;

/// Dat files paired with the study id encoded in their name
#[derive(Debug, Clone, Default)]
pub struct StudyFiles {
    files: Vec<(String, PathBuf)>,
}

impl StudyFiles {
    pub fn new<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let mut files: Vec<(String, PathBuf)> = paths
            .into_iter()
            .map(|path| (study_id_from_path(&path), path))
            .collect();
        files.sort();
        Self { files }
    }

    pub fn for_studies<'a>(&'a self, studies: &'a BTreeSet<String>) -> impl Iterator<Item = (&'a str, &'a Path)> + 'a {
        self.files
            .iter()
            .filter(move |(study, _)| studies.contains(study))
            .map(|(study, path)| (study.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Rows of the given studies restricted to `species`, one block per treeblock
pub fn class_table(species: &BTreeSet<String>, studies: &BTreeSet<String>, files: &StudyFiles) -> MrpTable {
    let mut table = MrpTable::default();

    for (study, path) in files.for_studies(studies) {
        let rows = match load_study_rows(path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        for (treeblock, taxa) in group_by_treeblock(&rows) {
            let mut block = MrpBlock::new(format!("{}.{}", study, treeblock));
            for (taxon, chars) in taxa.iter().filter(|(taxon, _)| species.contains(*taxon)) {
                if let Err(e) = block.insert(taxon.as_str(), chars.as_str()) {
                    warn!("{}, dropping row", e);
                }
            }
            if block.is_empty() {
                continue;
            }
            if block.is_degenerate() {
                debug!("Block {} is degenerate ({} taxa)", block.source, block.len());
            }
            table.blocks.push(block);
        }
    }

    table
}

/// Build the MRP table of every class with enough species and a study list
pub fn partition_classes(
    species_by_class: &BTreeMap<String, BTreeSet<String>>,
    class_rows: &[ClassRow],
    files: &StudyFiles,
) -> BTreeMap<String, MrpTable> {
    let studies_by_class: BTreeMap<&str, &BTreeSet<String>> = class_rows
        .iter()
        .map(|row| (row.name.as_str(), &row.studies))
        .collect();

    let candidates: Vec<(&String, &BTreeSet<String>, &BTreeSet<String>)> = species_by_class
        .iter()
        .filter_map(|(class, species)| {
            if species.len() <= MIN_CLASS_SPECIES {
                warn!("Not enough species in {} ({}), skipping", class, species.len());
                return None;
            }
            match studies_by_class.get(class.as_str()) {
                Some(studies) => Some((class, species, *studies)),
                None => {
                    let err = SupertreeError::MissingKey {
                        table: "class table".to_string(),
                        key: class.clone(),
                    };
                    warn!("{}, skipping", err);
                    None
                }
            }
        })
        .collect();

    candidates
        .into_par_iter()
        .map(|(class, species, studies)| {
            let table = class_table(species, studies, files);
            info!("Processed {}: {} matrices", class, table.blocks.len());
            (class.clone(), table)
        })
        .collect()
}

/// Write `<dir>/<class>.mrp` for every partition, returning the paths
pub fn write_partitions(dir: &Path, partitions: &BTreeMap<String, MrpTable>) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(partitions.len());
    for (class, table) in partitions {
        let path = dir.join(format!("{}.mrp", class));
        let file = std::fs::File::create(&path)?;
        table.write(std::io::BufWriter::new(file))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> (TempDir, StudyFiles) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("S1.dat"),
            "Tb1 7227 01\nTb1 7237 10\nTb1 9606 11\nTb2 7227 1\nTb2 9606 0\n",
        )
        .unwrap();
        fs::write(dir.path().join("S2.dat"), "Tb5 7227 0\nTb5 7237 1\n").unwrap();
        fs::write(dir.path().join("S3.dat"), "Tb1 7227 0\n").unwrap();

        let files = StudyFiles::new(vec![
            dir.path().join("S2.dat"),
            dir.path().join("S1.dat"),
            dir.path().join("S3.dat"),
        ]);
        (dir, files)
    }

    #[test]
    fn test_class_table_keeps_first_row_of_each_treeblock() {
        let (_dir, files) = fixture();
        let table = class_table(&set(&["7227", "7237", "7240"]), &set(&["S1", "S2"]), &files);

        let sources: Vec<&str> = table.blocks.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(sources, vec!["S1.Tb1", "S1.Tb2", "S2.Tb5"]);
        assert_eq!(table.blocks[0].get("7227"), Some("01"));
        assert!(table.blocks[0].get("9606").is_none());
        assert_eq!(table.blocks[1].len(), 1);
    }

    #[test]
    fn test_partition_classes_skips_small_and_unlisted() {
        let (_dir, files) = fixture();
        let mut species = BTreeMap::new();
        species.insert("Insecta".to_string(), set(&["7227", "7237", "7240"]));
        species.insert("Mammalia".to_string(), set(&["9606"]));
        species.insert("Arachnida".to_string(), set(&["1", "2", "3"]));

        let rows = vec![ClassRow {
            name: "Insecta".to_string(),
            species_count: 3,
            studies: set(&["S2"]),
        }];
        let partitions = partition_classes(&species, &rows, &files);

        assert_eq!(partitions.keys().collect::<Vec<_>>(), vec!["Insecta"]);
        assert_eq!(partitions["Insecta"].blocks.len(), 1);
    }

    #[test]
    fn test_write_partitions() {
        let (dir, files) = fixture();
        let mut partitions = BTreeMap::new();
        partitions.insert(
            "Insecta".to_string(),
            class_table(&set(&["7227", "7237"]), &set(&["S2"]), &files),
        );

        let out = dir.path().join("out");
        let written = write_partitions(&out, &partitions).unwrap();
        assert_eq!(written, vec![out.join("Insecta.mrp")]);
        assert_eq!(
            fs::read_to_string(&written[0]).unwrap(),
            "#S2.Tb5\n7227\t0\n7237\t1\n"
        );
    }
}
