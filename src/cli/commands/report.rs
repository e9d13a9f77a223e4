use super::{open_input, open_output};
use crate::bio::metadata::{parse_metadata, MetaSummary, StudyMeta};
use crate::bio::nexus::load_char_labels;
use crate::core::classdata::{join_class_data, read_nchar_table, write_class_data};
use crate::core::classes::ClassRow;
use crate::core::config::Config;
use crate::core::log_summary::{read_table, summarize, write_json, write_table};
use crate::core::study_fit::{read_scores, study_scores, write_study_scores};
use crate::utils::io::file_name;
use anyhow::Context;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Args)]
pub struct PauplogArgs {
    /// PAUP* log file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Write the records as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Output (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_pauplog(args: PauplogArgs, _config: &Config) -> anyhow::Result<()> {
    let records = summarize(open_input(&args.input)?)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    if records.is_empty() {
        warn!("No complete tree statistics found in {}", args.input.display());
    }

    let mut out = open_output(args.output.as_deref())?;
    if args.json {
        write_json(&mut out, &records)?;
        writeln!(out)?;
    } else {
        write_table(&mut out, &records)?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Args)]
pub struct ClassdataArgs {
    /// Summary table written by `pauplog`
    #[arg(short, long, value_name = "FILE")]
    pub scores: PathBuf,

    /// Class table written by `classes`
    #[arg(short, long, value_name = "FILE")]
    pub classes: PathBuf,

    /// Table written by `nchar`
    #[arg(short, long, value_name = "FILE")]
    pub nchar: PathBuf,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_classdata(args: ClassdataArgs, _config: &Config) -> anyhow::Result<()> {
    let summary = read_table(open_input(&args.scores)?)
        .with_context(|| format!("Failed to read {}", args.scores.display()))?;
    let class_rows = ClassRow::parse_table(open_input(&args.classes)?)
        .with_context(|| format!("Failed to read {}", args.classes.display()))?;
    let nchar = read_nchar_table(open_input(&args.nchar)?)
        .with_context(|| format!("Failed to read {}", args.nchar.display()))?;

    let rows = join_class_data(&summary, &class_rows, &nchar);
    let mut out = open_output(args.output.as_deref())?;
    write_class_data(&mut out, &rows)?;
    out.flush()?;
    info!("Joined data for {} of {} classes", rows.len(), summary.len());
    Ok(())
}

#[derive(Args)]
pub struct StudyFitArgs {
    /// Char label file written by `combine`
    #[arg(short, long, value_name = "FILE")]
    pub char_labels: PathBuf,

    /// Per-character scores, one integer per matrix column
    #[arg(short, long, value_name = "FILE")]
    pub scores: PathBuf,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_study_fit(args: StudyFitArgs, _config: &Config) -> anyhow::Result<()> {
    let labels = load_char_labels(&args.char_labels)
        .with_context(|| format!("Failed to read {}", args.char_labels.display()))?;
    let scores = read_scores(open_input(&args.scores)?)
        .with_context(|| format!("Failed to read {}", args.scores.display()))?;

    let ranked = study_scores(&labels, &scores);
    let mut out = open_output(args.output.as_deref())?;
    write_study_scores(&mut out, &ranked)?;
    out.flush()?;
    Ok(())
}

#[derive(Args)]
pub struct MetaTableArgs {
    /// TreeBASE per-study metadata files
    #[arg(value_name = "META", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_meta_table(args: MetaTableArgs, _config: &Config) -> anyhow::Result<()> {
    let mut out = open_output(args.output.as_deref())?;
    let mut written = 0;

    for path in &args.inputs {
        let name = file_name(path);
        if name.contains("sitemap") {
            debug!("Ignoring {}", path.display());
            continue;
        }
        let records = parse_metadata(open_input(path)?)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match StudyMeta::from_records(name.replace("meta", "dat"), &records) {
            Some(meta) => {
                writeln!(out, "{}", meta.to_row())?;
                written += 1;
            }
            None => debug!("{} has no typed matrix, skipping", path.display()),
        }
    }
    out.flush()?;
    info!("Summarised {} of {} metadata files", written, args.inputs.len());
    Ok(())
}

#[derive(Args)]
pub struct MetaSummaryArgs {
    /// Combined TreeBASE metadata file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_meta_summary(args: MetaSummaryArgs, _config: &Config) -> anyhow::Result<()> {
    let records = parse_metadata(open_input(&args.input)?)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let summary = MetaSummary::from_records(&records);

    let mut out = open_output(args.output.as_deref())?;
    summary.write(&mut out)?;
    out.flush()?;
    Ok(())
}
