pub mod bipartition;
pub mod classdata;
pub mod classes;
pub mod combiner;
pub mod config;
pub mod distance;
pub mod log_summary;
pub mod matrix_tools;
pub mod partition;
pub mod study_fit;

pub use bipartition::{bipartition_support, Bipartition, NodeSupport};
pub use classes::{assign_to_rank, ClassPartition, ClassTable, StudySpecies};
pub use combiner::{MatrixCombiner, Supermatrix};
pub use config::Config;
pub use distance::{DistanceComputer, DistanceMatrix};
pub use log_summary::{LogSummarizer, TreeStats};
