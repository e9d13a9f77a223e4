/// Bookkeeping around the class matrices in the data directory: width
/// tables, the PAUP* batch script and per-class SDM collections.
use crate::bio::nexus::read_nchar;
use crate::core::classes::ClassRow;
use crate::{Result, SupertreeError};
use glob::glob;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Files in `dir` matching `pattern`, sorted
pub fn glob_sorted(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = dir.join(pattern);
    let full = full
        .to_str()
        .ok_or_else(|| SupertreeError::Config(format!("non UTF-8 path {}", full.display())))?;
    let entries = glob(full).map_err(|e| SupertreeError::Config(format!("bad pattern {}: {}", full, e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => warn!("Unreadable entry: {}", e),
        }
    }
    paths.sort();
    Ok(paths)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// `(class, nchar)` for every Nexus matrix in `dir`
pub fn nchar_table(dir: &Path) -> Result<Vec<(String, usize)>> {
    let mut rows = Vec::new();
    for path in glob_sorted(dir, "*.nex")? {
        let file = File::open(&path)?;
        match read_nchar(BufReader::new(file))? {
            Some(nchar) => rows.push((stem(&path), nchar)),
            None => debug!("{} has no dimensions line", path.display()),
        }
    }
    Ok(rows)
}

/// Class matrices are the Nexus files whose name starts upper-case
pub fn class_matrices(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(glob_sorted(dir, "*.nex")?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.chars().next())
                .is_some_and(char::is_uppercase)
        })
        .collect())
}

/// Concatenate the `.sdm` files of each class's studies into
/// `<dir>/tb2dist_<class>`; the first line holds the file count.
/// A study's matrices are `<study>.<anything>.sdm`, so `S1` never picks
/// up the files of `S10` or `S100`
pub fn collect_sdm(dir: &Path, class_rows: &[ClassRow]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for row in class_rows {
        let mut sdm_files = Vec::new();
        for study in &row.studies {
            sdm_files.extend(glob_sorted(dir, &format!("{}.*.sdm", study))?);
        }
        if sdm_files.is_empty() {
            warn!("No distance matrices for {}, skipping", row.name);
            continue;
        }

        let path = dir.join(format!("tb2dist_{}", row.name));
        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "{}", sdm_files.len())?;
        for sdm in &sdm_files {
            for line in BufReader::new(File::open(sdm)?).lines() {
                writeln!(out, "{}", line?)?;
            }
        }
        out.flush()?;
        info!("Wrote {} matrices to {}", sdm_files.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_nchar_and_class_matrices() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Insecta.nex"), "#NEXUS\n    dimensions ntax=5 nchar=12;\n").unwrap();
        fs::write(dir.path().join("Aves.nex"), "#NEXUS\n    dimensions ntax=4 nchar=3;\n").unwrap();
        fs::write(dir.path().join("spr_analysis.nex"), "#NEXUS\nbegin paup;\nend;\n").unwrap();

        let table = nchar_table(dir.path()).unwrap();
        assert_eq!(table, vec![("Aves".to_string(), 3), ("Insecta".to_string(), 12)]);

        let matrices = class_matrices(dir.path()).unwrap();
        assert_eq!(matrices.len(), 2);
        assert!(matrices[0].ends_with("Aves.nex"));
    }

    #[test]
    fn test_collect_sdm() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("S1.dat.Tb1.sdm"), "\n# S1.dat.Tb1.sdm\n\n2 1\nA 0 1\nB 1 0\n").unwrap();
        fs::write(dir.path().join("S2.dat.Tb3.sdm"), "\n# S2.dat.Tb3.sdm\n").unwrap();

        let rows = vec![
            ClassRow {
                name: "Insecta".to_string(),
                species_count: 2,
                studies: ["S1", "S2"].iter().map(|s| s.to_string()).collect(),
            },
            ClassRow {
                name: "Aves".to_string(),
                species_count: 1,
                studies: BTreeSet::from(["S9".to_string()]),
            },
        ];
        let written = collect_sdm(dir.path(), &rows).unwrap();

        assert_eq!(written, vec![dir.path().join("tb2dist_Insecta")]);
        let text = fs::read_to_string(&written[0]).unwrap();
        assert!(text.starts_with("2\n\n# S1.dat.Tb1.sdm\n"));
        assert!(text.ends_with("# S2.dat.Tb3.sdm\n"));
    }

    #[test]
    fn test_collect_sdm_ignores_longer_study_ids() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("S1.dat.Tb1.sdm"), "\n# S1.dat.Tb1.sdm\n").unwrap();
        fs::write(dir.path().join("S10.dat.Tb7.sdm"), "\n# S10.dat.Tb7.sdm\n").unwrap();
        fs::write(dir.path().join("S100.dat.Tb9.sdm"), "\n# S100.dat.Tb9.sdm\n").unwrap();

        let rows = vec![ClassRow {
            name: "Aves".to_string(),
            species_count: 3,
            studies: BTreeSet::from(["S1".to_string()]),
        }];
        let written = collect_sdm(dir.path(), &rows).unwrap();

        let text = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(text, "1\n\n# S1.dat.Tb1.sdm\n");
    }
}
