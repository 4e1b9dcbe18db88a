//! Modelflat - flat tabular export of trained classifiers
//!
//! Writes the numeric parameters of a fitted decision tree or a one-vs-one
//! linear classifier as comma-delimited text tables that an inference engine
//! can load without a machine-learning runtime.

pub mod config;
pub mod errors;
pub mod forest;
pub mod model;
pub mod pairwise;
pub mod sink;
pub mod table;
pub mod tree;

use std::path::Path;

pub use config::{ExportConfig, QuoteEscaping};
pub use errors::{ExportError, Result};
pub use forest::{export_forest, read_forest, tree_file_name};
pub use model::{
    argmax_first, one_vs_one_pairs, pair_count, PairwiseLinearModel, TreeArrays, TREE_LEAF,
    TREE_UNDEFINED,
};
pub use pairwise::{
    model_from_records, pairwise_header, pairwise_records, read_pairwise, write_pairwise,
    write_pairwise_records, ClassPairRecord,
};
pub use table::{read_table, Field, Table, TableWriter};
pub use tree::{
    read_tree, tree_records, write_tree, write_tree_records, TreeNodeRecord, TREE_HEADER,
};

/// Export a tree table to `path`
pub fn export_tree_to_path<S: AsRef<str>>(
    tree: &TreeArrays,
    class_names: &[S],
    path: &Path,
    config: &ExportConfig,
) -> Result<()> {
    tree::warn_unchecked_links(config);
    let records = tree_records(tree, class_names, config.validate_links)?;
    sink::write_to_path(path, config, |writer| {
        write_tree_records(&records, writer, config)
    })
}

/// Export a one-vs-one table to `path` and return its header
pub fn export_pairwise_to_path(
    model: &PairwiseLinearModel,
    path: &Path,
    config: &ExportConfig,
) -> Result<Vec<String>> {
    let records = pairwise_records(model)?;
    sink::write_to_path(path, config, |writer| {
        write_pairwise_records(&records, writer, config)
    })
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
