pub mod metadata;
pub mod mrp;
pub mod nexus;
pub mod taxonomy;
pub mod tree;

pub use mrp::{MrpBlock, MrpTable};
pub use taxonomy::{TaxonNode, TaxonomyIndex};
pub use tree::{LabelledTree, TreeTopology};
