use clap::Parser;
use colored::*;
use std::process;
use supertree::cli::commands::{matrix, report, taxonomy, tree};
use supertree::cli::{Cli, Commands};
use supertree::utils::parallel::configure_thread_pool;
use supertree::SupertreeError;
use tracing_subscriber::EnvFilter;

fn main() {
    // SUPERTREE_LOG sets the default level, RUST_LOG still wins
    let log_level = std::env::var("SUPERTREE_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<SupertreeError>() {
            Some(SupertreeError::Config(_)) => 2,
            Some(SupertreeError::Io(_)) => 3,
            Some(SupertreeError::Parse(_)) | Some(SupertreeError::MalformedBlock(_)) => 4,
            Some(SupertreeError::UnknownTaxon { .. }) | Some(SupertreeError::TaxonomyCycle { .. }) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let num_threads = configure_thread_pool(cli.threads)?;
    if cli.verbose > 0 {
        eprintln!("Using {} threads", num_threads);
    }

    let config = cli.load_config()?;

    match cli.command {
        Commands::StudySpecies(args) => taxonomy::run_study_species(args, &config),
        Commands::Classes(args) => taxonomy::run_classes(args, &config),
        Commands::ClassSpecies(args) => taxonomy::run_class_species(args, &config),
        Commands::Lineages(args) => taxonomy::run_lineages(args, &config),
        Commands::Partition(args) => matrix::run_partition(args, &config),
        Commands::Combine(args) => matrix::run_combine(args, &config),
        Commands::Nchar(args) => matrix::run_nchar(args, &config),
        Commands::PaupScript(args) => matrix::run_paup_script(args, &config),
        Commands::Sdm(args) => matrix::run_sdm(args, &config),
        Commands::CollectSdm(args) => matrix::run_collect_sdm(args, &config),
        Commands::MrpSplits(args) => tree::run_mrp_splits(args, &config),
        Commands::TreeSupport(args) => tree::run_tree_support(args, &config),
        Commands::TreeCsv(args) => tree::run_tree_csv(args, &config),
        Commands::Pauplog(args) => report::run_pauplog(args, &config),
        Commands::Classdata(args) => report::run_classdata(args, &config),
        Commands::StudyFit(args) => report::run_study_fit(args, &config),
        Commands::MetaTable(args) => report::run_meta_table(args, &config),
        Commands::MetaSummary(args) => report::run_meta_summary(args, &config),
    }
}
