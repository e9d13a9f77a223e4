/// Supermatrix assembly from per-source MRP blocks.
///
/// Every taxon observed in any block gets one row; a block the taxon is
/// absent from contributes a run of `?` of that block's length. Blocks are
/// concatenated in sorted source order and rows are kept sorted by taxon id,
/// so identical input always produces identical output.
use crate::bio::mrp::MrpBlock;
use crate::bio::nexus::{write_nexus_matrix, write_tnt, CharLabel, TntBlock};
use crate::bio::taxonomy::TaxonomyIndex;
use crate::core::config::MatrixConfig;
use crate::{Result, SupertreeError};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Position of one source block inside the supermatrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    pub source: String,
    pub first_seen: usize,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supermatrix {
    rows: BTreeMap<String, String>,
    blocks: Vec<BlockSpan>,
    /// Synthetic all-zero outgroup row, written before the real taxa
    root: Option<(String, String)>,
    /// Observed (taxon, block index) pairs, used to keep TNT sections sparse
    observed: BTreeSet<(String, usize)>,
}

impl Supermatrix {
    pub fn nchar(&self) -> usize {
        self.blocks.iter().map(|b| b.length).sum()
    }

    /// Row count including the synthetic outgroup
    pub fn ntax(&self) -> usize {
        self.rows.len() + usize::from(self.root.is_some())
    }

    pub fn blocks(&self) -> &[BlockSpan] {
        &self.blocks
    }

    pub fn row(&self, taxon: &str) -> Option<&str> {
        match &self.root {
            Some((label, chars)) if label == taxon => Some(chars),
            _ => self.rows.get(taxon).map(String::as_str),
        }
    }

    /// Outgroup first, then taxa in ascending id order
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.root
            .iter()
            .map(|(t, c)| (t.as_str(), c.as_str()))
            .chain(self.rows.iter().map(|(t, c)| (t.as_str(), c.as_str())))
    }

    pub fn to_nexus<W: Write>(&self, writer: W) -> Result<()> {
        let rows: Vec<(&str, &str)> = self.rows().collect();
        write_nexus_matrix(writer, &rows, self.nchar())
    }

    pub fn to_tnt<W: Write>(&self, writer: W) -> Result<()> {
        let blocks: Vec<TntBlock<'_>> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(idx, span)| {
                let range = span.offset..span.offset + span.length;
                let root = self
                    .root
                    .iter()
                    .map(|(t, c)| (t.as_str(), &c[range.clone()]));
                let observed = self
                    .rows
                    .iter()
                    .filter(|(taxon, _)| self.observed.contains(&((*taxon).clone(), idx)))
                    .map(|(t, c)| (t.as_str(), &c[range.clone()]));
                TntBlock {
                    source: &span.source,
                    rows: root.chain(observed).collect(),
                }
            })
            .collect();
        write_tnt(writer, self.nchar(), self.ntax(), &blocks)
    }

    /// One label per block, in matrix column order
    pub fn char_labels(&self) -> Vec<CharLabel> {
        self.blocks
            .iter()
            .map(|span| CharLabel {
                source: span.source.clone(),
                first_seen: span.first_seen,
                length: span.length,
            })
            .collect()
    }
}

/// Builds supermatrices; rejects inputs with fewer than `min_taxa` taxa
#[derive(Debug, Clone)]
pub struct MatrixCombiner {
    min_taxa: usize,
    root_label: Option<String>,
}

impl Default for MatrixCombiner {
    fn default() -> Self {
        Self::from_config(&MatrixConfig::default())
    }
}

impl MatrixCombiner {
    pub fn new(min_taxa: usize) -> Self {
        Self {
            min_taxa,
            root_label: None,
        }
    }

    pub fn with_root(mut self, label: impl Into<String>) -> Self {
        self.root_label = Some(label.into());
        self
    }

    pub fn from_config(config: &MatrixConfig) -> Self {
        let combiner = Self::new(config.min_taxa);
        if config.root_outgroup {
            combiner.with_root(config.root_label.clone())
        } else {
            combiner
        }
    }

    pub fn combine(&self, blocks: &[MrpBlock]) -> Result<Supermatrix> {
        // Canonical block order; input position is kept as first_seen
        let mut ordered: Vec<(usize, &MrpBlock)> = Vec::with_capacity(blocks.len());
        let mut sources = BTreeSet::new();
        for (first_seen, block) in blocks.iter().enumerate() {
            if block.nchar().is_none() {
                debug!("Skipping empty block {}", block.source);
                continue;
            }
            if !sources.insert(block.source.as_str()) {
                warn!("Block {} appears more than once, keeping the first", block.source);
                continue;
            }
            if block.is_degenerate() {
                warn!("Block {} has only {} taxa", block.source, block.len());
            }
            ordered.push((first_seen, block));
        }
        ordered.sort_by(|a, b| a.1.source.cmp(&b.1.source));

        let taxa: BTreeSet<&str> = ordered
            .iter()
            .flat_map(|(_, block)| block.rows().map(|(taxon, _)| taxon))
            .collect();
        if taxa.len() < self.min_taxa {
            return Err(SupertreeError::TooFewTaxa {
                found: taxa.len(),
                required: self.min_taxa,
            });
        }

        let mut spans = Vec::with_capacity(ordered.len());
        let mut offset = 0;
        for (first_seen, block) in &ordered {
            let length = block.nchar().unwrap_or_default();
            spans.push(BlockSpan {
                source: block.source.clone(),
                first_seen: *first_seen,
                offset,
                length,
            });
            offset += length;
        }

        let mut rows: BTreeMap<String, String> = taxa
            .iter()
            .map(|taxon| (taxon.to_string(), String::with_capacity(offset)))
            .collect();
        let mut observed = BTreeSet::new();
        for (idx, (_, block)) in ordered.iter().enumerate() {
            let length = spans[idx].length;
            for (taxon, row) in rows.iter_mut() {
                match block.get(taxon) {
                    Some(chars) => {
                        row.push_str(chars);
                        observed.insert((taxon.clone(), idx));
                    }
                    None => row.extend(std::iter::repeat('?').take(length)),
                }
            }
        }

        let root = self
            .root_label
            .as_ref()
            .map(|label| (label.clone(), "0".repeat(offset)));

        debug!(
            "Combined {} blocks into {} taxa x {} characters",
            spans.len(),
            rows.len(),
            offset
        );
        Ok(Supermatrix {
            rows,
            blocks: spans,
            root,
            observed,
        })
    }

    /// Combine `study -> treeblock -> taxon -> characters`; blocks are named
    /// `<study>.<treeblock>`
    pub fn combine_studies(
        &self,
        studies: &BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
    ) -> Result<Supermatrix> {
        self.combine(&blocks_from_studies(studies))
    }
}

/// Flatten nested study maps into named blocks, dropping rows that do not
/// match their block's character count
pub fn blocks_from_studies(studies: &BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>) -> Vec<MrpBlock> {
    let mut blocks = Vec::new();
    for (study, treeblocks) in studies {
        for (treeblock, rows) in treeblocks {
            let mut block = MrpBlock::new(format!("{}.{}", study, treeblock));
            for (taxon, chars) in rows {
                if let Err(e) = block.insert(taxon.as_str(), chars.as_str()) {
                    warn!("{}, dropping row", e);
                }
            }
            blocks.push(block);
        }
    }
    blocks
}

fn binomial_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\S+ \S+$").ok()).as_ref()
}

/// Scientific names of exactly two words, excluding open nomenclature
pub fn is_clean_binomial(name: &str) -> bool {
    binomial_pattern().is_some_and(|re| re.is_match(name.trim())) && !name.contains("sp.")
}

/// Drop rows whose taxon has no clean binomial name. Returns the number of
/// distinct taxa removed.
pub fn filter_species(blocks: &mut [MrpBlock], index: &TaxonomyIndex) -> usize {
    let mut rejected = BTreeSet::new();
    for block in blocks.iter_mut() {
        block.retain(|taxon| {
            let keep = index.name(taxon).is_some_and(is_clean_binomial);
            if !keep && rejected.insert(taxon.to_string()) {
                match index.name(taxon) {
                    Some(name) => warn!("Excluding {} ({}): not a species binomial", taxon, name),
                    None => warn!("Excluding {}: no scientific name", taxon),
                }
            }
            keep
        });
    }
    rejected.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::nexus::{read_nchar, read_ntax};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn block(source: &str, rows: &[(&str, &str)]) -> MrpBlock {
        let mut block = MrpBlock::new(source);
        for (taxon, chars) in rows {
            block.insert(*taxon, *chars).unwrap();
        }
        block
    }

    #[test]
    fn test_missing_block_filled_with_unknowns() {
        let blocks = vec![
            block("T2", &[("A", "1")]),
            block("T1", &[("A", "01"), ("B", "10")]),
        ];
        let matrix = MatrixCombiner::new(2).combine(&blocks).unwrap();

        assert_eq!(matrix.row("A"), Some("011"));
        assert_eq!(matrix.row("B"), Some("10?"));
        assert_eq!(matrix.nchar(), 3);

        let labels = matrix.char_labels();
        assert_eq!(labels[0].source, "T1");
        assert_eq!(labels[0].first_seen, 1);
        assert_eq!(labels[1].length, 1);
    }

    #[test]
    fn test_too_few_taxa() {
        let blocks = vec![block("T1", &[("A", "01"), ("B", "10"), ("C", "11")])];
        match MatrixCombiner::new(4).combine(&blocks) {
            Err(SupertreeError::TooFewTaxa { found, required }) => {
                assert_eq!(found, 3);
                assert_eq!(required, 4);
            }
            other => panic!("Expected TooFewTaxa, got {:?}", other),
        }
    }

    #[test]
    fn test_root_outgroup_and_dimensions() {
        let blocks = vec![
            block("S1.Tb1", &[("A", "01"), ("B", "10"), ("C", "11")]),
            block("S2.Tb1", &[("D", "1"), ("A", "0")]),
        ];
        let matrix = MatrixCombiner::new(4).with_root("Root").combine(&blocks).unwrap();

        let mut out = Vec::new();
        matrix.to_nexus(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(read_ntax(text.as_bytes()).unwrap(), Some(5));
        assert_eq!(read_nchar(text.as_bytes()).unwrap(), Some(3));
        assert!(text.contains("matrix\nRoot\t000\nA\t010\nB\t10?\nC\t11?\nD\t??1\n;\n"));
    }

    #[test]
    fn test_nexus_output_is_deterministic() {
        let forward = vec![
            block("S1.Tb1", &[("D", "0"), ("A", "1"), ("B", "1"), ("C", "0")]),
            block("S3.Tb9", &[("E", "10"), ("A", "01")]),
        ];
        let reversed: Vec<MrpBlock> = forward.iter().rev().cloned().collect();
        let combiner = MatrixCombiner::default();

        let mut first = Vec::new();
        combiner.combine(&forward).unwrap().to_nexus(&mut first).unwrap();
        let mut second = Vec::new();
        combiner.combine(&forward).unwrap().to_nexus(&mut second).unwrap();
        let mut third = Vec::new();
        combiner.combine(&reversed).unwrap().to_nexus(&mut third).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_tnt_lists_observed_rows_per_block() {
        let blocks = vec![
            block("S1.Tb1", &[("A", "01"), ("B", "10"), ("C", "11")]),
            block("S2.Tb1", &[("D", "1"), ("A", "0")]),
        ];
        let matrix = MatrixCombiner::new(4).with_root("Root").combine(&blocks).unwrap();

        let mut out = Vec::new();
        matrix.to_tnt(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("xread\n3 5\n"));
        assert!(text.contains("& [ num ] @@ S2.Tb1 data ;\nRoot\t0\nA\t0\nD\t1\n;\n"));
    }

    #[test]
    fn test_combine_studies_names_blocks() {
        let mut studies = BTreeMap::new();
        let mut treeblocks = BTreeMap::new();
        treeblocks.insert(
            "Tb2".to_string(),
            [("A", "1"), ("B", "0"), ("C", "1"), ("D", "0")]
                .into_iter()
                .map(|(t, c)| (t.to_string(), c.to_string()))
                .collect::<BTreeMap<_, _>>(),
        );
        studies.insert("S7".to_string(), treeblocks);

        let matrix = MatrixCombiner::new(4).combine_studies(&studies).unwrap();
        assert_eq!(matrix.blocks()[0].source, "S7.Tb2");
        assert_eq!(matrix.ntax(), 4);
    }

    #[test]
    fn test_clean_binomial() {
        assert!(is_clean_binomial("Drosophila melanogaster"));
        assert!(!is_clean_binomial("Drosophila"));
        assert!(!is_clean_binomial("Drosophila sp. 1"));
        assert!(!is_clean_binomial("Drosophila sp."));
        assert!(!is_clean_binomial("Escherichia coli K-12"));
    }

    #[test]
    fn test_filter_species() {
        let names: HashMap<String, String> = [("1", "Homo sapiens"), ("2", "Homo sp."), ("3", "Homo")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let index = TaxonomyIndex::from_nodes(Vec::new()).with_names(names);

        let mut blocks = vec![block("T1", &[("1", "0"), ("2", "1"), ("3", "1"), ("4", "0")])];
        assert_eq!(filter_species(&mut blocks, &index), 3);
        assert_eq!(blocks[0].len(), 1);
        assert_eq!(blocks[0].get("1"), Some("0"));
    }

    fn arb_blocks() -> impl Strategy<Value = Vec<MrpBlock>> {
        let taxa = prop::collection::btree_set("[A-Z]", 1..8);
        let block = (taxa, 1usize..6).prop_flat_map(|(taxa, nchar)| {
            let count = taxa.len();
            (
                Just(taxa),
                prop::collection::vec(prop::collection::vec(prop::sample::select(vec!['0', '1', '?']), nchar), count),
            )
        });
        prop::collection::vec(block, 1..5).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (taxa, rows))| {
                    let mut b = MrpBlock::new(format!("T{}", i));
                    for (taxon, chars) in taxa.into_iter().zip(rows) {
                        b.insert(taxon, chars.into_iter().collect::<String>()).unwrap();
                    }
                    b
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_rows_have_total_length(blocks in arb_blocks()) {
            let total: usize = blocks.iter().filter_map(MrpBlock::nchar).sum();
            let matrix = MatrixCombiner::new(1).with_root("Root").combine(&blocks).unwrap();

            prop_assert_eq!(matrix.nchar(), total);
            for (_, chars) in matrix.rows() {
                prop_assert_eq!(chars.len(), total);
            }

            let mut nexus = Vec::new();
            matrix.to_nexus(&mut nexus).unwrap();
            prop_assert_eq!(read_nchar(nexus.as_slice()).unwrap(), Some(total));
            prop_assert_eq!(read_ntax(nexus.as_slice()).unwrap(), Some(matrix.rows().count()));
            for span in matrix.blocks() {
                for (taxon, chars) in matrix.rows().skip(1) {
                    let block = blocks.iter().find(|b| b.source == span.source).unwrap();
                    let expected = block
                        .get(taxon)
                        .map(str::to_string)
                        .unwrap_or_else(|| "?".repeat(span.length));
                    prop_assert_eq!(&chars[span.offset..span.offset + span.length], expected.as_str());
                }
            }
        }
    }
}
