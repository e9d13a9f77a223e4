/// NCBI taxonomy index: node records, scientific names and ancestor walks
use crate::{Result, SupertreeError};
use std::collections::HashMap;

/// Id of the NCBI root node; every lineage ends here
pub const ROOT_ID: &str = "1";

/// One record of `nodes.dmp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonNode {
    pub id: String,
    pub parent_id: String,
    pub rank: String,
}

impl TaxonNode {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            rank: rank.into(),
        }
    }
}

/// Immutable lookup structure over the taxonomy dump: id -> node, id -> name
#[derive(Debug, Default)]
pub struct TaxonomyIndex {
    nodes: HashMap<String, TaxonNode>,
    names: HashMap<String, String>,
}

impl TaxonomyIndex {
    pub fn new(nodes: HashMap<String, TaxonNode>, names: HashMap<String, String>) -> Self {
        Self { nodes, names }
    }

    /// Build an index from node records alone (no names)
    pub fn from_nodes<I: IntoIterator<Item = TaxonNode>>(nodes: I) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self {
            nodes,
            names: HashMap::new(),
        }
    }

    pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
        self.names = names;
        self
    }

    pub fn get(&self, id: &str) -> Option<&TaxonNode> {
        self.nodes.get(id)
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn has_names(&self) -> bool {
        !self.names.is_empty()
    }

    /// Reverse scientific-name lookup (name -> id)
    pub fn ids_by_name(&self) -> HashMap<&str, &str> {
        self.names
            .iter()
            .map(|(id, name)| (name.as_str(), id.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes carrying the given rank
    pub fn nodes_at_rank<'a>(&'a self, rank: &'a str) -> impl Iterator<Item = &'a TaxonNode> + 'a {
        self.nodes.values().filter(move |n| n.rank == rank)
    }

    /// Lazily walk from `id` towards the root.
    ///
    /// Yields the node for `id` itself first, then each ancestor, and stops
    /// before the root sentinel. An id missing from the index ends the walk
    /// with `UnknownTaxon`; a walk longer than the index ends with
    /// `TaxonomyCycle`.
    pub fn ancestor_chain<'a>(&'a self, id: &str) -> AncestorChain<'a> {
        AncestorChain {
            index: self,
            start: id.to_string(),
            current: Some(id.to_string()),
            steps: 0,
        }
    }
}

pub struct AncestorChain<'a> {
    index: &'a TaxonomyIndex,
    start: String,
    current: Option<String>,
    steps: usize,
}

impl<'a> Iterator for AncestorChain<'a> {
    type Item = Result<&'a TaxonNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current.take()?;
        if id == ROOT_ID {
            return None;
        }

        let node = match self.index.nodes.get(&id) {
            Some(node) => node,
            None => return Some(Err(SupertreeError::UnknownTaxon { id })),
        };

        self.steps += 1;
        if self.steps > self.index.nodes.len() {
            return Some(Err(SupertreeError::TaxonomyCycle {
                start: self.start.clone(),
            }));
        }

        self.current = Some(node.parent_id.clone());
        Some(Ok(node))
    }
}

/// Parse NCBI taxonomy dump files
pub mod ncbi {
    use super::*;
    use std::fs::File;
    use std::io::{BufRead, BufReader};
    use std::path::Path;
    use tracing::{debug, warn};

    const SCIENTIFIC_NAME: &str = "scientific name";

    fn split_dmp_line(line: &str) -> Vec<&str> {
        let mut fields: Vec<&str> = line.split('|').map(str::trim).collect();
        // Lines end with a trailing `|`, leaving one empty field behind
        if fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        fields
    }

    /// Read `nodes.dmp` records: `id | parent_id | rank | ...`
    pub fn read_nodes<R: BufRead>(reader: R) -> Result<HashMap<String, TaxonNode>> {
        let mut nodes = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parts = split_dmp_line(&line);
            if parts.len() < 3 || parts[0].is_empty() || parts[1].is_empty() {
                warn!("nodes.dmp line {}: expected at least 3 fields, dropping", line_no + 1);
                continue;
            }
            let node = TaxonNode::new(parts[0], parts[1], parts[2]);
            nodes.insert(node.id.clone(), node);
        }

        debug!("Read {} taxonomy nodes", nodes.len());
        Ok(nodes)
    }

    /// Read `names.dmp` records: `id | name | unique_name | name_class | ...`
    ///
    /// When a name class column is present only scientific names are kept;
    /// otherwise the first name seen for an id wins.
    pub fn read_names<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
        let mut names = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parts = split_dmp_line(&line);
            if parts.len() < 2 || parts[0].is_empty() {
                warn!("names.dmp line {}: expected at least 2 fields, dropping", line_no + 1);
                continue;
            }

            if parts.len() >= 4 {
                if parts[3] == SCIENTIFIC_NAME {
                    names.insert(parts[0].to_string(), parts[1].to_string());
                }
            } else {
                names
                    .entry(parts[0].to_string())
                    .or_insert_with(|| parts[1].to_string());
            }
        }

        debug!("Read {} scientific names", names.len());
        Ok(names)
    }

    pub fn load_nodes<P: AsRef<Path>>(path: P) -> Result<HashMap<String, TaxonNode>> {
        let file = File::open(path)?;
        read_nodes(BufReader::new(file))
    }

    pub fn load_names<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
        let file = File::open(path)?;
        read_names(BufReader::new(file))
    }

    /// Load the index from a nodes dump and an optional names dump
    pub fn load_index<P: AsRef<Path>>(nodes_path: P, names_path: Option<P>) -> Result<TaxonomyIndex> {
        let nodes = load_nodes(nodes_path)?;
        let names = match names_path {
            Some(path) => load_names(path)?,
            None => HashMap::new(),
        };
        Ok(TaxonomyIndex::new(nodes, names))
    }
}
