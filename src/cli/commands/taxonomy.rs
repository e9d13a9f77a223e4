use super::{load_taxonomy, open_input, open_output, study_files, TaxonomyArgs};
use crate::bio::mrp::{load_study_rows, study_id_from_path};
use crate::core::classes::{
    class_lineage, partition_study_rows, write_partitions, ClassRow, ClassTable, StudySpecies,
};
use crate::core::config::Config;
use anyhow::Context;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args)]
pub struct StudySpeciesArgs {
    /// Study dat files (default: every S*.dat in the data directory)
    #[arg(value_name = "DAT")]
    pub inputs: Vec<PathBuf>,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_study_species(args: StudySpeciesArgs, config: &Config) -> anyhow::Result<()> {
    let files = study_files(&args.inputs, &config.paths.data_dir)?;
    let mut out = open_output(args.output.as_deref())?;

    for path in &files {
        let rows = load_study_rows(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let species = StudySpecies::from_rows(study_id_from_path(path), &rows);
        writeln!(out, "{}", species.to_row())?;
    }
    out.flush()?;
    info!("Listed species of {} studies", files.len());
    Ok(())
}

#[derive(Args)]
pub struct ClassesArgs {
    /// Study table written by `study-species`
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,

    /// Target rank (overrides the configuration)
    #[arg(short, long)]
    pub rank: Option<String>,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_classes(args: ClassesArgs, config: &Config) -> anyhow::Result<()> {
    let rank = args.rank.as_deref().unwrap_or(&config.taxonomy.rank);
    let index = load_taxonomy(&args.taxonomy)?;
    let studies = StudySpecies::parse_table(open_input(&args.input)?)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let table = ClassTable::build(&index, &studies, rank);
    let mut out = open_output(args.output.as_deref())?;
    table.write(&index, rank, &mut out)?;
    out.flush()?;
    Ok(())
}

#[derive(Args)]
pub struct ClassSpeciesArgs {
    /// Study dat files (default: every S*.dat in the data directory)
    #[arg(value_name = "DAT")]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,

    /// Target rank (overrides the configuration)
    #[arg(short, long)]
    pub rank: Option<String>,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_class_species(args: ClassSpeciesArgs, config: &Config) -> anyhow::Result<()> {
    let rank = args.rank.as_deref().unwrap_or(&config.taxonomy.rank);
    let files = study_files(&args.inputs, &config.paths.data_dir)?;
    let index = load_taxonomy(&args.taxonomy)?;

    let mut rows = Vec::new();
    for path in &files {
        match load_study_rows(path) {
            Ok(study_rows) => rows.extend(study_rows),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    let partitions = partition_study_rows(&index, &rows, rank);
    let mut out = open_output(args.output.as_deref())?;
    write_partitions(&index, &partitions, &mut out)?;
    out.flush()?;
    info!("Partitioned {} rows into {} buckets", rows.len(), partitions.len());
    Ok(())
}

#[derive(Args)]
pub struct LineagesArgs {
    /// Class table written by `classes`
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_lineages(args: LineagesArgs, _config: &Config) -> anyhow::Result<()> {
    if args.taxonomy.names.is_none() {
        anyhow::bail!("lineages needs --names to resolve class names");
    }
    let index = load_taxonomy(&args.taxonomy)?;
    let ids_by_name = index.ids_by_name();
    let classes = ClassRow::parse_table(open_input(&args.input)?)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut out = open_output(args.output.as_deref())?;
    for class in &classes {
        match class_lineage(&index, &ids_by_name, &class.name) {
            Ok(Some(lineage)) => writeln!(out, "{}", lineage.to_row())?,
            Ok(None) => warn!("No kingdom found for {}, skipping", class.name),
            Err(e) => warn!("Skipping {}: {}", class.name, e),
        }
    }
    out.flush()?;
    Ok(())
}
