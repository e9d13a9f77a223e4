/// Pairwise distances between the taxa of one treeblock, in SDM layout.
///
/// `d(a, b) = differing positions / (taxa * chars)`. The extra division by
/// the taxon count is what SDM consumers of these files expect.
use crate::core::config::DistanceConfig;
use crate::{Result, SupertreeError};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    taxa: Vec<String>,
    nchar: usize,
    /// Row-major `taxa x taxa`
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    pub fn nchar(&self) -> usize {
        self.nchar
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.taxa.len() + col]
    }

    pub fn distance(&self, a: &str, b: &str) -> Option<f64> {
        let row = self.taxa.binary_search_by(|t| t.as_str().cmp(a)).ok()?;
        let col = self.taxa.binary_search_by(|t| t.as_str().cmp(b)).ok()?;
        Some(self.get(row, col))
    }

    /// `# name` comment, `ntax nchar` header, then one row per taxon
    pub fn write_sdm<W: Write>(&self, mut writer: W, name: &str) -> Result<()> {
        writeln!(writer, "\n# {}", name)?;
        writeln!(writer, "\n{} {}", self.taxa.len(), self.nchar)?;
        for (row, taxon) in self.taxa.iter().enumerate() {
            write!(writer, "{}", taxon)?;
            for col in 0..self.taxa.len() {
                write!(writer, " {:.8}", self.get(row, col))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DistanceComputer {
    max_comparisons: u64,
}

impl Default for DistanceComputer {
    fn default() -> Self {
        Self::from_config(&DistanceConfig::default())
    }
}

impl DistanceComputer {
    pub fn new(max_comparisons: u64) -> Self {
        Self { max_comparisons }
    }

    pub fn from_config(config: &DistanceConfig) -> Self {
        Self::new(config.max_comparisons)
    }

    /// All-pairs distances for one block.
    ///
    /// Returns `Ok(None)` when `taxa^2 * chars` exceeds the configured limit;
    /// the caller skips the block.
    pub fn distances(&self, block: &BTreeMap<String, String>) -> Result<Option<DistanceMatrix>> {
        if block.len() < 2 {
            return Err(SupertreeError::TooFewTaxa {
                found: block.len(),
                required: 2,
            });
        }

        let taxa: Vec<String> = block.keys().cloned().collect();
        let rows: Vec<&[u8]> = block.values().map(|chars| chars.as_bytes()).collect();
        let nchar = rows[0].len();
        if let Some((taxon, chars)) = block.iter().find(|(_, chars)| chars.len() != nchar) {
            return Err(SupertreeError::MalformedBlock(format!(
                "taxon {} has {} characters, expected {}",
                taxon,
                chars.len(),
                nchar
            )));
        }
        if nchar == 0 {
            return Err(SupertreeError::MalformedBlock("block has no characters".to_string()));
        }

        let n = taxa.len();
        let comparisons = (n as u64).saturating_mul(n as u64).saturating_mul(nchar as u64);
        if comparisons > self.max_comparisons {
            warn!(
                "{} taxa x {} characters exceeds the limit of {} comparisons",
                n, nchar, self.max_comparisons
            );
            return Ok(None);
        }

        let scale = (n * nchar) as f64;
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let differing = rows[i]
                    .iter()
                    .zip(rows[j])
                    .filter(|(a, b)| a != b)
                    .count();
                let d = differing as f64 / scale;
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }

        Ok(Some(DistanceMatrix { taxa, nchar, values }))
    }
}
