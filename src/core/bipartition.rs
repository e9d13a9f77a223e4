/// Bipartitions from MRP columns and their support on an inferred tree.
use crate::bio::mrp::MrpTable;
use crate::bio::tree::TreeTopology;
use crate::utils::format::{format_float, format_set, parse_set};
use crate::{Result, SupertreeError};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Blocks need more taxa than this to split anything
const MIN_SPLIT_TAXA: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bipartition {
    pub ingroup: BTreeSet<String>,
    pub outgroup: BTreeSet<String>,
}

impl Bipartition {
    /// Both sides fall inside the corresponding sides of `node`
    pub fn is_compatible_with(&self, node: &Bipartition) -> bool {
        self.ingroup.is_subset(&node.ingroup) && self.outgroup.is_subset(&node.outgroup)
    }
}

/// Column bipartitions of one source block, position 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSplits {
    pub source: String,
    pub splits: Vec<(usize, Bipartition)>,
}

/// One bipartition per MRP column: `0` is outgroup, `?` is neither side
pub fn mrp_splits(table: &MrpTable) -> Vec<SourceSplits> {
    table
        .blocks
        .iter()
        .filter(|block| {
            let informative = block.len() > MIN_SPLIT_TAXA;
            if !informative {
                debug!("Skipping {}: {} taxa", block.source, block.len());
            }
            informative
        })
        .map(|block| {
            let nchar = block.nchar().unwrap_or_default();
            let mut splits: Vec<Bipartition> = vec![Bipartition::default(); nchar];
            for (taxon, chars) in block.rows() {
                for (split, state) in splits.iter_mut().zip(chars.chars()) {
                    match state {
                        '0' => {
                            split.outgroup.insert(taxon.to_string());
                        }
                        '?' => {}
                        _ => {
                            split.ingroup.insert(taxon.to_string());
                        }
                    }
                }
            }
            SourceSplits {
                source: block.source.clone(),
                splits: splits.into_iter().enumerate().map(|(i, s)| (i + 1, s)).collect(),
            }
        })
        .collect()
}

pub fn write_splits<W: Write>(mut writer: W, sources: &[SourceSplits]) -> Result<()> {
    for source in sources {
        writeln!(writer, "#{}", source.source)?;
        for (position, split) in &source.splits {
            writeln!(
                writer,
                "{}\t{}\t{}",
                position,
                format_set(&split.ingroup),
                format_set(&split.outgroup)
            )?;
        }
    }
    Ok(())
}

/// Read a split table into `source -> distinct bipartitions`
pub fn read_splits<R: BufRead>(reader: R) -> Result<IndexMap<String, Vec<Bipartition>>> {
    let mut sources: IndexMap<String, Vec<Bipartition>> = IndexMap::new();
    let mut current: Option<String> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(source) = trimmed.strip_prefix('#') {
            let source = source.trim().to_string();
            sources.entry(source.clone()).or_default();
            current = Some(source);
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let Some(source) = current.as_ref() else {
            warn!("split line {}: row before any `#source` header, dropping", line_no + 1);
            continue;
        };
        if fields.len() < 2 {
            warn!("split line {}: expected ingroup and outgroup, dropping", line_no + 1);
            continue;
        }
        let split = Bipartition {
            ingroup: parse_set(fields[fields.len() - 2]),
            outgroup: parse_set(fields[fields.len() - 1]),
        };
        let splits = sources.entry(source.clone()).or_default();
        if !splits.contains(&split) {
            splits.push(split);
        }
    }

    Ok(sources)
}

/// Sources agreeing and disagreeing with one internal node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSupport {
    pub supporting: BTreeSet<String>,
    pub opposing: BTreeSet<String>,
    /// `supporting / opposing / sources`, zero without opposition
    pub ratio: f64,
}

impl NodeSupport {
    fn new(supporting: BTreeSet<String>, opposing: BTreeSet<String>, total: usize) -> Self {
        let ratio = if opposing.is_empty() || total == 0 {
            0.0
        } else {
            supporting.len() as f64 / opposing.len() as f64 / total as f64
        };
        Self {
            supporting,
            opposing,
            ratio,
        }
    }
}

/// Support of every informative internal node, keyed by node label in
/// pre-order. The `outgroup_label` leaf never counts as a taxon.
pub fn bipartition_support<T: TreeTopology>(
    tree: &T,
    sources: &IndexMap<String, Vec<Bipartition>>,
    outgroup_label: &str,
) -> IndexMap<String, NodeSupport> {
    let all_leaves: BTreeSet<String> = tree
        .leaves()
        .into_iter()
        .map(|leaf| tree.label(leaf).to_string())
        .filter(|label| label != outgroup_label)
        .collect();

    let mut support = IndexMap::new();
    for node in tree.preorder() {
        if tree.is_leaf(node) {
            continue;
        }
        let mut ingroup = tree.leaf_labels_under(node);
        ingroup.remove(outgroup_label);
        let outgroup: BTreeSet<String> = all_leaves.difference(&ingroup).cloned().collect();
        if outgroup.is_empty() {
            continue;
        }
        let split = Bipartition { ingroup, outgroup };

        let supporting: BTreeSet<String> = sources
            .iter()
            .filter(|(_, splits)| splits.iter().any(|s| s.is_compatible_with(&split)))
            .map(|(source, _)| source.clone())
            .collect();
        let opposing: BTreeSet<String> = sources
            .keys()
            .filter(|source| !supporting.contains(*source))
            .cloned()
            .collect();

        support.insert(
            tree.label(node).to_string(),
            NodeSupport::new(supporting, opposing, sources.len()),
        );
    }
    support
}

/// `node\tsupporting\topposing\tratio`; the ratio is a bare `0` for
/// unopposed nodes and keeps its fractional part otherwise
pub fn write_support<W: Write>(mut writer: W, support: &IndexMap<String, NodeSupport>) -> Result<()> {
    for (node, s) in support {
        let ratio = if s.opposing.is_empty() {
            "0".to_string()
        } else {
            format_float(s.ratio)
        };
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            node,
            format_set(&s.supporting),
            format_set(&s.opposing),
            ratio
        )?;
    }
    Ok(())
}

/// Internal node labels must be unique for the support table to be keyed by them
pub fn check_unique_labels<T: TreeTopology>(tree: &T) -> Result<()> {
    let mut seen = BTreeSet::new();
    for node in tree.preorder() {
        if !tree.is_leaf(node) && !seen.insert(tree.label(node)) {
            return Err(SupertreeError::Parse(format!(
                "internal node label {} is not unique",
                tree.label(node)
            )));
        }
    }
    Ok(())
}
