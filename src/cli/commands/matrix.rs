use super::{open_input, open_output, study_files};
use crate::bio::mrp::{group_by_treeblock, load_study_rows, MrpTable};
use crate::bio::nexus::{write_char_labels, write_paup_batch};
use crate::bio::taxonomy::{ncbi, TaxonomyIndex};
use crate::core::classes::{parse_partition_table, ClassRow};
use crate::core::combiner::{filter_species, MatrixCombiner, Supermatrix};
use crate::core::config::Config;
use crate::core::distance::DistanceComputer;
use crate::core::matrix_tools::{class_matrices, collect_sdm, nchar_table};
use crate::core::partition::{partition_classes, write_partitions, StudyFiles};
use crate::utils::io::file_name;
use crate::SupertreeError;
use anyhow::Context;
use clap::{Args, ValueEnum};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Args)]
pub struct PartitionArgs {
    /// Class partition table written by `class-species`
    #[arg(short, long, value_name = "FILE")]
    pub species: PathBuf,

    /// Class table written by `classes`
    #[arg(short, long, value_name = "FILE")]
    pub classes: PathBuf,

    /// Study dat files (default: every S*.dat in the data directory)
    #[arg(value_name = "DAT")]
    pub inputs: Vec<PathBuf>,

    /// Directory for the `<class>.mrp` files (default: the data directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

pub fn run_partition(args: PartitionArgs, config: &Config) -> anyhow::Result<()> {
    let species = parse_partition_table(open_input(&args.species)?)
        .with_context(|| format!("Failed to read {}", args.species.display()))?;
    let class_rows = ClassRow::parse_table(open_input(&args.classes)?)
        .with_context(|| format!("Failed to read {}", args.classes.display()))?;
    let files = StudyFiles::new(study_files(&args.inputs, &config.paths.data_dir)?);

    let partitions = partition_classes(&species, &class_rows, &files);
    let out_dir = args.out_dir.as_deref().unwrap_or(&config.paths.data_dir);
    let written = write_partitions(out_dir, &partitions)
        .with_context(|| format!("Failed to write partitions to {}", out_dir.display()))?;

    info!("Wrote {} class MRP tables to {}", written.len(), out_dir.display());
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MatrixFormat {
    Nexus,
    Tnt,
}

impl MatrixFormat {
    fn extension(self) -> &'static str {
        match self {
            MatrixFormat::Nexus => "nex",
            MatrixFormat::Tnt => "tnt",
        }
    }

    fn write<W: Write>(self, matrix: &Supermatrix, writer: W) -> crate::Result<()> {
        match self {
            MatrixFormat::Nexus => matrix.to_nexus(writer),
            MatrixFormat::Tnt => matrix.to_tnt(writer),
        }
    }
}

#[derive(Args)]
pub struct CombineArgs {
    /// MRP tables, one per class
    #[arg(value_name = "MRP", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "nexus")]
    pub format: MatrixFormat,

    /// Write `<class>.<ext>` and `<class>_charlabels.txt` per input here
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Output file for a single input (default: stdout)
    #[arg(short, long, value_name = "FILE", conflicts_with = "out_dir")]
    pub output: Option<PathBuf>,

    /// Char label file for a single input
    #[arg(long, value_name = "FILE", conflicts_with = "out_dir")]
    pub char_labels: Option<PathBuf>,

    /// NCBI names.dmp, enables the species name filter
    #[arg(short = 'n', long, value_name = "FILE")]
    pub names: Option<PathBuf>,

    /// Smallest taxon count for a matrix (overrides the configuration)
    #[arg(long)]
    pub min_taxa: Option<usize>,

    /// Do not add the all-zero outgroup row
    #[arg(long)]
    pub no_root: bool,
}

fn combine_file(path: &Path, combiner: &MatrixCombiner, names: Option<&TaxonomyIndex>) -> crate::Result<Supermatrix> {
    let mut table = MrpTable::from_path(path)?;
    if let Some(index) = names {
        let removed = filter_species(&mut table.blocks, index);
        if removed > 0 {
            info!("{}: excluded {} taxa without a species name", path.display(), removed);
        }
    }
    combiner.combine(&table.blocks)
}

fn class_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_outputs(dir: &Path, stem: &str, matrix: &Supermatrix, format: MatrixFormat) -> crate::Result<()> {
    let path = dir.join(format!("{}.{}", stem, format.extension()));
    let mut out = BufWriter::new(File::create(&path)?);
    format.write(matrix, &mut out)?;
    out.flush()?;

    let labels = dir.join(format!("{}_charlabels.txt", stem));
    let mut out = BufWriter::new(File::create(&labels)?);
    write_char_labels(&mut out, &matrix.char_labels())?;
    out.flush()?;
    Ok(())
}

pub fn run_combine(args: CombineArgs, config: &Config) -> anyhow::Result<()> {
    let mut matrix_config = config.matrix.clone();
    if let Some(min_taxa) = args.min_taxa {
        matrix_config.min_taxa = min_taxa;
    }
    if args.no_root {
        matrix_config.root_outgroup = false;
    }
    let combiner = MatrixCombiner::from_config(&matrix_config);

    let names = match (&args.names, matrix_config.filter_species) {
        (Some(path), true) => {
            let names = ncbi::load_names(path).with_context(|| format!("Failed to load {}", path.display()))?;
            Some(TaxonomyIndex::from_nodes(Vec::new()).with_names(names))
        }
        _ => None,
    };

    let Some(out_dir) = args.out_dir.as_deref() else {
        let [input] = args.inputs.as_slice() else {
            anyhow::bail!("--out-dir is required when combining more than one MRP table");
        };
        return match combine_file(input, &combiner, names.as_ref()) {
            Ok(matrix) => {
                let mut out = open_output(args.output.as_deref())?;
                args.format.write(&matrix, &mut out)?;
                out.flush()?;
                if let Some(path) = &args.char_labels {
                    let mut labels = open_output(Some(path))?;
                    write_char_labels(&mut labels, &matrix.char_labels())?;
                    labels.flush()?;
                }
                Ok(())
            }
            Err(e @ SupertreeError::TooFewTaxa { .. }) => {
                warn!("{}: {}, no matrix written", input.display(), e);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to combine {}", input.display())),
        };
    };

    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let outcomes: Vec<(&PathBuf, crate::Result<usize>)> = args
        .inputs
        .par_iter()
        .map(|input| {
            let result = combine_file(input, &combiner, names.as_ref()).and_then(|matrix| {
                write_outputs(out_dir, &class_stem(input), &matrix, args.format)?;
                Ok(matrix.ntax())
            });
            (input, result)
        })
        .collect();

    let mut written = 0;
    for (input, outcome) in outcomes {
        match outcome {
            Ok(ntax) => {
                debug!("{}: {} taxa", input.display(), ntax);
                written += 1;
            }
            Err(e) => warn!("Skipping {}: {}", input.display(), e),
        }
    }
    info!("Wrote {} of {} matrices to {}", written, args.inputs.len(), out_dir.display());
    Ok(())
}

#[derive(Args)]
pub struct NcharArgs {
    /// Directory with class matrices (default: the data directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_nchar(args: NcharArgs, config: &Config) -> anyhow::Result<()> {
    let dir = args.dir.as_deref().unwrap_or(&config.paths.data_dir);
    let mut out = open_output(args.output.as_deref())?;
    for (class, nchar) in nchar_table(dir)? {
        writeln!(out, "{}\t{}", class, nchar)?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Args)]
pub struct PaupScriptArgs {
    /// Directory with class matrices (default: the data directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Analysis script run after every matrix (overrides the configuration)
    #[arg(short, long, value_name = "FILE")]
    pub analysis_script: Option<String>,

    /// Output script (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_paup_script(args: PaupScriptArgs, config: &Config) -> anyhow::Result<()> {
    let dir = args.dir.as_deref().unwrap_or(&config.paths.data_dir);
    let script = args.analysis_script.as_deref().unwrap_or(&config.paup.analysis_script);
    let matrices: Vec<String> = class_matrices(dir)?
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    if matrices.is_empty() {
        warn!("No class matrices in {}", dir.display());
    }

    let mut out = open_output(args.output.as_deref())?;
    write_paup_batch(&mut out, &matrices, &dir.join(script).display().to_string())?;
    out.flush()?;
    Ok(())
}

#[derive(Args)]
pub struct SdmArgs {
    /// Study dat files (default: every S*.dat in the data directory)
    #[arg(value_name = "DAT")]
    pub inputs: Vec<PathBuf>,

    /// Directory for the `.sdm` files (default: the data directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// One treeblock of one dat file
struct SdmUnit {
    name: String,
    rows: BTreeMap<String, String>,
}

pub fn run_sdm(args: SdmArgs, config: &Config) -> anyhow::Result<()> {
    let files = study_files(&args.inputs, &config.paths.data_dir)?;
    let out_dir = args.out_dir.as_deref().unwrap_or(&config.paths.data_dir);
    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let computer = DistanceComputer::from_config(&config.distance);

    let mut units = Vec::new();
    for path in &files {
        let rows = match load_study_rows(path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        info!("Read MRP data from {}", path.display());
        for (treeblock, rows) in group_by_treeblock(&rows) {
            units.push(SdmUnit {
                name: format!("{}.{}.sdm", file_name(path), treeblock),
                rows,
            });
        }
    }

    let written: usize = units
        .par_iter()
        .map(|unit| match computer.distances(&unit.rows) {
            Ok(Some(matrix)) => {
                let path = out_dir.join(&unit.name);
                let result = File::create(&path)
                    .map_err(SupertreeError::from)
                    .and_then(|file| {
                        let mut out = BufWriter::new(file);
                        matrix.write_sdm(&mut out, &unit.name)?;
                        out.flush()?;
                        Ok(())
                    });
                match result {
                    Ok(()) => {
                        debug!("Wrote {}", path.display());
                        1
                    }
                    Err(e) => {
                        warn!("Could not write {}: {}", path.display(), e);
                        0
                    }
                }
            }
            Ok(None) => {
                warn!("{}: block too large, could not calculate distances", unit.name);
                0
            }
            Err(e) => {
                warn!("{}: {}", unit.name, e);
                0
            }
        })
        .sum();

    info!("Wrote {} of {} distance matrices to {}", written, units.len(), out_dir.display());
    Ok(())
}

#[derive(Args)]
pub struct CollectSdmArgs {
    /// Class table written by `classes`
    #[arg(short, long, value_name = "FILE")]
    pub classes: PathBuf,

    /// Directory with the `.sdm` files (default: the data directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

pub fn run_collect_sdm(args: CollectSdmArgs, config: &Config) -> anyhow::Result<()> {
    let class_rows = ClassRow::parse_table(open_input(&args.classes)?)
        .with_context(|| format!("Failed to read {}", args.classes.display()))?;
    let dir = args.dir.as_deref().unwrap_or(&config.paths.data_dir);

    let written = collect_sdm(dir, &class_rows)?;
    info!("Collected distance matrices for {} classes", written.len());
    Ok(())
}
