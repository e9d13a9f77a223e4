/// Writers and small readers for the tree-inference input formats:
/// Nexus data blocks, PAUP* batch scripts, TNT xread scripts and the
/// char-label side table.
use crate::{Result, SupertreeError};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Write a standard-datatype Nexus matrix. Every row must be `nchar` long.
pub fn write_nexus_matrix<W: Write>(mut writer: W, rows: &[(&str, &str)], nchar: usize) -> Result<()> {
    writeln!(writer, "#NEXUS")?;
    writeln!(writer, "begin data;")?;
    writeln!(writer, "    dimensions ntax={} nchar={};", rows.len(), nchar)?;
    writeln!(writer, "    format datatype=standard symbols=\"012\" missing=?;")?;
    writeln!(writer, "matrix")?;
    for (taxon, chars) in rows {
        writeln!(writer, "{}\t{}", taxon, chars)?;
    }
    writeln!(writer, ";")?;
    writeln!(writer, "end;")?;
    Ok(())
}

/// Read the declared `nchar` from a Nexus file's dimensions line
pub fn read_nchar<R: BufRead>(reader: R) -> Result<Option<usize>> {
    for line in reader.lines() {
        let line = line?;
        if let Some(pos) = line.find("nchar=") {
            let value: String = line[pos + "nchar=".len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            let nchar = value
                .parse::<usize>()
                .map_err(|_| SupertreeError::Parse(format!("invalid nchar in `{}`", line.trim())))?;
            return Ok(Some(nchar));
        }
    }
    Ok(None)
}

/// Read the declared `ntax` from a Nexus file's dimensions line
pub fn read_ntax<R: BufRead>(reader: R) -> Result<Option<usize>> {
    for line in reader.lines() {
        let line = line?;
        if let Some(pos) = line.find("ntax=") {
            let value: String = line[pos + "ntax=".len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            return value
                .parse::<usize>()
                .map(Some)
                .map_err(|_| SupertreeError::Parse(format!("invalid ntax in `{}`", line.trim())));
        }
    }
    Ok(None)
}

/// PAUP* batch script executing every matrix followed by the analysis script
pub fn write_paup_batch<W: Write>(mut writer: W, matrices: &[String], analysis_script: &str) -> Result<()> {
    writeln!(writer, "#NEXUS")?;
    writeln!(writer, "begin paup;")?;
    for matrix in matrices {
        writeln!(writer, "\texe {};", matrix)?;
        writeln!(writer, "\texe {};", analysis_script)?;
    }
    writeln!(writer, "\tquit;")?;
    writeln!(writer, "end;")?;
    Ok(())
}

/// Rows of one block for the TNT script
pub struct TntBlock<'a> {
    pub source: &'a str,
    pub rows: Vec<(&'a str, &'a str)>,
}

/// TNT xread script with one `&[num]` section per source block
pub fn write_tnt<W: Write>(mut writer: W, nchar: usize, ntax: usize, blocks: &[TntBlock<'_>]) -> Result<()> {
    writeln!(writer, "macro=;")?;
    writeln!(writer, "nstates 2;")?;
    writeln!(writer, "xread")?;
    writeln!(writer, "{} {}", nchar, ntax)?;
    for block in blocks {
        writeln!(writer, "& [ num ] @@ {} data ;", block.source)?;
        for (taxon, chars) in &block.rows {
            writeln!(writer, "{}\t{}", taxon, chars)?;
        }
    }
    writeln!(writer, ";")?;
    writeln!(writer, "proc/;")?;
    Ok(())
}

/// Where a source block sits in the combined matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharLabel {
    pub source: String,
    /// Order in which the block was first seen in the input
    pub first_seen: usize,
    pub length: usize,
}

/// Char labels are written in matrix column order
pub fn write_char_labels<W: Write>(mut writer: W, labels: &[CharLabel]) -> Result<()> {
    for label in labels {
        writeln!(writer, "{}\t{}\t{}", label.source, label.first_seen, label.length)?;
    }
    Ok(())
}

pub fn read_char_labels<R: BufRead>(reader: R) -> Result<Vec<CharLabel>> {
    let mut labels = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(SupertreeError::Parse(format!(
                "char labels line {}: expected 3 fields",
                line_no + 1
            )));
        }
        let parse = |s: &str| {
            s.parse::<usize>().map_err(|_| {
                SupertreeError::Parse(format!("char labels line {}: `{}` is not a number", line_no + 1, s))
            })
        };
        labels.push(CharLabel {
            source: fields[0].to_string(),
            first_seen: parse(fields[1])?,
            length: parse(fields[2])?,
        });
    }
    Ok(labels)
}

pub fn load_char_labels<P: AsRef<Path>>(path: P) -> Result<Vec<CharLabel>> {
    let file = File::open(path)?;
    read_char_labels(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nexus_layout() {
        let mut out = Vec::new();
        write_nexus_matrix(&mut out, &[("Root", "000"), ("A", "011")], 3).unwrap();

        let expected = "#NEXUS\nbegin data;\n    dimensions ntax=2 nchar=3;\n    \
                        format datatype=standard symbols=\"012\" missing=?;\nmatrix\n\
                        Root\t000\nA\t011\n;\nend;\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_read_dimensions() {
        let text = "#NEXUS\nbegin data;\n    dimensions ntax=12 nchar=345;\n";
        assert_eq!(read_nchar(text.as_bytes()).unwrap(), Some(345));
        assert_eq!(read_ntax(text.as_bytes()).unwrap(), Some(12));
        assert_eq!(read_nchar("#NEXUS\n".as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_paup_batch() {
        let mut out = Vec::new();
        write_paup_batch(&mut out, &["data/Insecta.nex".to_string()], "data/spr_analysis.nex").unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#NEXUS\nbegin paup;\n\texe data/Insecta.nex;\n\texe data/spr_analysis.nex;\n\tquit;\nend;\n"
        );
    }

    #[test]
    fn test_tnt_script() {
        let blocks = vec![
            TntBlock { source: "S1.Tb1", rows: vec![("A", "01"), ("B", "10")] },
            TntBlock { source: "S2.Tb1", rows: vec![("A", "1"), ("B", "?")] },
        ];
        let mut out = Vec::new();
        write_tnt(&mut out, 3, 2, &blocks).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("macro=;\nnstates 2;\nxread\n3 2\n"));
        assert!(text.contains("& [ num ] @@ S2.Tb1 data ;\nA\t1\nB\t?\n"));
        assert!(text.ends_with(";\nproc/;\n"));
    }

    #[test]
    fn test_char_labels_round_trip() {
        let labels = vec![
            CharLabel { source: "S1.Tb1".into(), first_seen: 1, length: 2 },
            CharLabel { source: "S2.Tb4".into(), first_seen: 0, length: 5 },
        ];
        let mut out = Vec::new();
        write_char_labels(&mut out, &labels).unwrap();
        assert_eq!(read_char_labels(out.as_slice()).unwrap(), labels);
    }
}
