/// Taxonomy-guided partitioning of studies and taxa into classes (or any
/// other target rank).
use crate::bio::mrp::StudyRow;
use crate::bio::taxonomy::{TaxonNode, TaxonomyIndex, ROOT_ID};
use crate::utils::format::{format_float, format_set, parse_set, percent, sanitize_name};
use crate::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Bucket for taxa whose lineage reaches the root without meeting the rank
pub const UNCLASSIFIED: &str = "none";

/// Nearest ancestor (or the taxon itself) at `rank`.
///
/// `Ok(None)` means the taxon is unclassified at that rank.
pub fn assign_to_rank<'a>(index: &'a TaxonomyIndex, taxon_id: &str, rank: &str) -> Result<Option<&'a TaxonNode>> {
    for node in index.ancestor_chain(taxon_id) {
        let node = node?;
        if node.rank == rank {
            return Ok(Some(node));
        }
    }
    Ok(None)
}

/// Bucket key for a taxon, `None` when the taxonomy lookup failed
fn bucket_for(index: &TaxonomyIndex, taxon_id: &str, rank: &str) -> Option<String> {
    match assign_to_rank(index, taxon_id, rank) {
        Ok(Some(node)) => Some(node.id.clone()),
        Ok(None) => Some(UNCLASSIFIED.to_string()),
        Err(e) => {
            warn!("Skipping taxon {}: {}", taxon_id, e);
            None
        }
    }
}

/// Display names for bucket keys, unique within one table
fn bucket_names<'a, I>(index: &TaxonomyIndex, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    keys.into_iter()
        .map(|key| {
            let name = if key == UNCLASSIFIED {
                "None".to_string()
            } else {
                match index.name(key) {
                    Some(name) => sanitize_name(name),
                    None => {
                        warn!("No scientific name for {}, using the id", key);
                        key.clone()
                    }
                }
            };
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                format!("{}_{}", name, count)
            } else {
                name
            }
        })
        .collect()
}

/// Species cited by one study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySpecies {
    pub study_id: String,
    pub species: Vec<String>,
}

impl StudySpecies {
    /// Distinct taxa of a dat file in first-seen order, `*` markers stripped
    pub fn from_rows(study_id: impl Into<String>, rows: &[StudyRow]) -> Self {
        let mut seen = BTreeSet::new();
        let mut species = Vec::new();
        for row in rows {
            let taxon = row.taxon.trim_matches('*');
            if !taxon.is_empty() && seen.insert(taxon.to_string()) {
                species.push(taxon.to_string());
            }
        }
        Self {
            study_id: study_id.into(),
            species,
        }
    }

    /// `study\tcount\tids`; a study without species points at the root
    pub fn to_row(&self) -> String {
        if self.species.is_empty() {
            format!("{}\t0\t{}", self.study_id, ROOT_ID)
        } else {
            format!(
                "{}\t{}\t{}",
                self.study_id,
                self.species.len(),
                format_set(&self.species)
            )
        }
    }

    pub fn parse_table<R: BufRead>(reader: R) -> Result<Vec<StudySpecies>> {
        let mut studies = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.len() {
                0 => continue,
                1 => warn!("study table line {}: missing species count, dropping", line_no + 1),
                2 => studies.push(StudySpecies {
                    study_id: fields[0].to_string(),
                    species: vec![ROOT_ID.to_string()],
                }),
                _ => studies.push(StudySpecies {
                    study_id: fields[0].to_string(),
                    species: parse_set(fields[2]).into_iter().collect(),
                }),
            }
        }
        Ok(studies)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTally {
    /// Unique species whose nearest ranked ancestor is this class
    pub species_count: usize,
    pub studies: BTreeSet<String>,
}

/// One written row of the class table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRow {
    pub name: String,
    pub species_count: usize,
    pub studies: BTreeSet<String>,
}

impl ClassRow {
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.name,
            self.species_count,
            self.studies.len(),
            format_set(&self.studies)
        )
    }

    /// Read a class table; short lines (legacy summary counts) are ignored
    pub fn parse_table<R: BufRead>(reader: R) -> Result<Vec<ClassRow>> {
        let mut rows = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < 4 {
                if !line.trim().is_empty() {
                    debug!("class table line {}: not a class row, skipping", line_no + 1);
                }
                continue;
            }
            let species_count = match fields[1].parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    warn!("class table line {}: species count `{}` is not a number", line_no + 1, fields[1]);
                    continue;
                }
            };
            rows.push(ClassRow {
                name: fields[0].to_string(),
                species_count,
                studies: parse_set(&fields[3..].join(",")),
            });
        }
        Ok(rows)
    }
}

/// Studies and species tallied per class
#[derive(Debug, Default)]
pub struct ClassTable {
    pub tallies: BTreeMap<String, ClassTally>,
}

impl ClassTable {
    pub fn build(index: &TaxonomyIndex, studies: &[StudySpecies], rank: &str) -> Self {
        let mut tallies: BTreeMap<String, ClassTally> = BTreeMap::new();
        let mut assignments: HashMap<&str, Option<String>> = HashMap::new();

        for study in studies {
            debug!("Processing {}", study.study_id);
            let mut hit = false;
            for species in &study.species {
                let bucket = assignments
                    .entry(species.as_str())
                    .or_insert_with(|| bucket_for(index, species, rank));
                if let Some(class_id) = bucket.as_deref().filter(|b| *b != UNCLASSIFIED) {
                    tallies
                        .entry(class_id.to_string())
                        .or_default()
                        .studies
                        .insert(study.study_id.clone());
                    hit = true;
                }
            }
            if !hit {
                tallies
                    .entry(UNCLASSIFIED.to_string())
                    .or_default()
                    .studies
                    .insert(study.study_id.clone());
            }
        }

        for bucket in assignments.values().flatten() {
            tallies.entry(bucket.clone()).or_default().species_count += 1;
        }

        Self { tallies }
    }

    /// Rows for every class cited by at least one study
    pub fn rows(&self, index: &TaxonomyIndex) -> Vec<ClassRow> {
        let cited: Vec<(&String, &ClassTally)> = self
            .tallies
            .iter()
            .filter(|(_, tally)| !tally.studies.is_empty())
            .collect();
        let names = bucket_names(index, cited.iter().map(|(key, _)| *key));

        cited
            .into_iter()
            .zip(names)
            .map(|((_, tally), name)| ClassRow {
                name,
                species_count: tally.species_count,
                studies: tally.studies.clone(),
            })
            .collect()
    }

    /// Ranked nodes of the taxonomy that no study cites
    pub fn unsupported(&self, index: &TaxonomyIndex, rank: &str) -> usize {
        index
            .nodes_at_rank(rank)
            .filter(|node| {
                self.tallies
                    .get(&node.id)
                    .map_or(true, |tally| tally.studies.is_empty())
            })
            .count()
    }

    pub fn write<W: Write>(&self, index: &TaxonomyIndex, rank: &str, mut writer: W) -> Result<()> {
        let rows = self.rows(index);
        for row in &rows {
            debug!("Writing {}", row.name);
            writeln!(writer, "{}", row.to_row())?;
        }
        info!(
            "{} {} buckets supported by studies, {} unsupported",
            rows.len(),
            rank,
            self.unsupported(index, rank)
        );
        Ok(())
    }
}

/// Taxa cited in one class, with repeat citations kept in the count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassPartition {
    pub class_id: String,
    pub taxon_count: usize,
    pub taxa: BTreeSet<String>,
}

impl ClassPartition {
    pub fn unique_taxon_count(&self) -> usize {
        self.taxa.len()
    }

    /// `unique / total`; zero for an empty partition
    pub fn overlap_ratio(&self) -> f64 {
        if self.taxon_count == 0 {
            0.0
        } else {
            self.unique_taxon_count() as f64 / self.taxon_count as f64
        }
    }
}

/// Assign every cited taxon to its class bucket
pub fn partition_taxa<'a, I>(index: &TaxonomyIndex, taxa: I, rank: &str) -> BTreeMap<String, ClassPartition>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut partitions: BTreeMap<String, ClassPartition> = BTreeMap::new();
    let mut assignments: HashMap<&str, Option<String>> = HashMap::new();

    for taxon in taxa {
        let bucket = assignments
            .entry(taxon)
            .or_insert_with(|| bucket_for(index, taxon, rank));
        if let Some(class_id) = bucket {
            let partition = partitions
                .entry(class_id.clone())
                .or_insert_with(|| ClassPartition {
                    class_id: class_id.clone(),
                    ..Default::default()
                });
            partition.taxon_count += 1;
            partition.taxa.insert(taxon.to_string());
        }
    }

    partitions
}

/// Class partitions of all rows of the given dat files
pub fn partition_study_rows(index: &TaxonomyIndex, rows: &[StudyRow], rank: &str) -> BTreeMap<String, ClassPartition> {
    partition_taxa(index, rows.iter().map(|r| r.taxon.as_str()), rank)
}

/// `name\ttaxa\tunique\toverlap%\tids`
pub fn write_partitions<W: Write>(
    index: &TaxonomyIndex,
    partitions: &BTreeMap<String, ClassPartition>,
    mut writer: W,
) -> Result<()> {
    let names = bucket_names(index, partitions.keys());
    for (partition, name) in partitions.values().zip(names) {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            name,
            partition.taxon_count,
            partition.unique_taxon_count(),
            format_float(percent(partition.unique_taxon_count(), partition.taxon_count)),
            format_set(&partition.taxa)
        )?;
    }
    Ok(())
}

/// Class name -> species ids, from a partition table
pub fn parse_partition_table<R: BufRead>(reader: R) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let mut classes = BTreeMap::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            if !fields.is_empty() {
                warn!("partition table line {}: too few fields, dropping", line_no + 1);
            }
            continue;
        }
        let name = sanitize_name(fields[0]);
        let species = parse_set(fields[fields.len() - 1]);
        classes.insert(name, species);
    }
    Ok(classes)
}

/// Phylum and kingdom above one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLineage {
    pub class: String,
    pub phylum: Option<String>,
    pub kingdom: String,
}

impl ClassLineage {
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.class,
            self.phylum.as_deref().unwrap_or("None"),
            self.kingdom
        )
    }
}

/// Resolve a class name and walk up to its kingdom (or superkingdom).
///
/// `Ok(None)` when the name is unknown or the lineage has no kingdom.
pub fn class_lineage(
    index: &TaxonomyIndex,
    ids_by_name: &HashMap<&str, &str>,
    class_name: &str,
) -> Result<Option<ClassLineage>> {
    let spaced = class_name.replace('_', " ");
    let Some(class_id) = ids_by_name
        .get(class_name)
        .or_else(|| ids_by_name.get(spaced.as_str()))
    else {
        return Ok(None);
    };

    let mut phylum = None;
    for node in index.ancestor_chain(class_id).skip(1) {
        let node = node?;
        let name = || sanitize_name(index.name(&node.id).unwrap_or(&node.id));
        match node.rank.as_str() {
            "phylum" if phylum.is_none() => phylum = Some(name()),
            "kingdom" | "superkingdom" => {
                return Ok(Some(ClassLineage {
                    class: class_name.to_string(),
                    phylum,
                    kingdom: name(),
                }))
            }
            _ => {}
        }
    }
    Ok(None)
}
