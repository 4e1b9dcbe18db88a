//! Decision tree encoder
//!
//! Emits one row per node of a flattened tree, in node id order:
//!
//! ```text
//! node_id,threshold,feature_id,left_children_id,right_children_id,class
//! 0,0.5,3,1,2,"neg"
//! 1,-2.0,-2,-1,-1,"neg"
//! 2,-2.0,-2,-1,-1,"pos"
//! ```
//!
//! `class` is the class name with the highest count at the node. Leaves are
//! the rows whose two child ids are both [`TREE_LEAF`](crate::model::TREE_LEAF).

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::errors::{ExportError, Result};
use crate::model::{argmax_first, TreeArrays, TREE_LEAF};
use crate::table::{read_table, Field, TableWriter};

/// Fixed column order of a tree table
pub const TREE_HEADER: [&str; 6] = [
    "node_id",
    "threshold",
    "feature_id",
    "left_children_id",
    "right_children_id",
    "class",
];

/// One row of a tree table
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNodeRecord {
    pub node_id: i64,
    pub threshold: f64,
    pub feature_id: i64,
    pub left_children_id: i64,
    pub right_children_id: i64,
    pub class: String,
}

impl TreeNodeRecord {
    pub fn is_leaf(&self) -> bool {
        self.left_children_id == TREE_LEAF && self.right_children_id == TREE_LEAF
    }

    fn fields(&self) -> [Field; 6] {
        [
            Field::Int(self.node_id),
            Field::Float(self.threshold),
            Field::Int(self.feature_id),
            Field::Int(self.left_children_id),
            Field::Int(self.right_children_id),
            Field::Text(self.class.clone()),
        ]
    }
}

/// Build the rows for every node without writing anything.
///
/// Shapes are validated first; links only when `validate_links` is set.
pub fn tree_records<S: AsRef<str>>(
    tree: &TreeArrays,
    class_names: &[S],
    validate_links: bool,
) -> Result<Vec<TreeNodeRecord>> {
    tree.validate_shape()?;
    if validate_links {
        tree.validate_links()?;
    }

    (0..tree.node_count())
        .map(|node| -> Result<TreeNodeRecord> {
            let index = argmax_first(&tree.value[node]).ok_or_else(|| {
                ExportError::ShapeMismatch(format!("node {node} has no comparable class counts"))
            })?;
            let class = class_names
                .get(index)
                .ok_or(ExportError::ClassIndex {
                    node,
                    index,
                    len: class_names.len(),
                })?
                .as_ref()
                .to_string();

            Ok(TreeNodeRecord {
                node_id: node as i64,
                threshold: tree.threshold[node],
                feature_id: tree.feature[node],
                left_children_id: tree.children_left[node],
                right_children_id: tree.children_right[node],
                class,
            })
        })
        .collect()
}

/// Log once per export call when links go unchecked
pub(crate) fn warn_unchecked_links(config: &ExportConfig) {
    if !config.validate_links {
        warn!("Tree link validation disabled");
    }
}

/// Write prepared tree rows, header first
pub fn write_tree_records<W: Write>(
    records: &[TreeNodeRecord],
    sink: W,
    config: &ExportConfig,
) -> Result<()> {
    let mut writer = TableWriter::new(sink, config.quote_escaping);
    writer.write_header(&TREE_HEADER)?;
    for record in records {
        writer.write_row(&record.fields())?;
    }
    writer.finish()?;
    Ok(())
}

/// Encode a fitted tree into `sink`.
///
/// `class_names[k]` names class-count index `k`. Every row is built before
/// the first byte is written, so shape and class-name errors leave the sink
/// untouched.
pub fn write_tree<S: AsRef<str>, W: Write>(
    tree: &TreeArrays,
    class_names: &[S],
    sink: W,
    config: &ExportConfig,
) -> Result<()> {
    warn_unchecked_links(config);
    let records = tree_records(tree, class_names, config.validate_links)?;
    write_tree_records(&records, sink, config)?;
    debug!(nodes = records.len(), "Tree table written");
    Ok(())
}

/// Decode a tree table.
///
/// The header must match [`TREE_HEADER`] and node ids must be the dense
/// range `0..n` in order.
pub fn read_tree<R: Read>(source: R) -> Result<Vec<TreeNodeRecord>> {
    let table = read_table(source)?;
    table.expect_header(&TREE_HEADER)?;

    let mut records = Vec::with_capacity(table.rows.len());
    for row in 0..table.rows.len() {
        let node_id = table.parse_int(row, 0)?;
        if node_id != row as i64 {
            return Err(ExportError::InvalidTree(format!(
                "row {row} carries node id {node_id}"
            )));
        }

        records.push(TreeNodeRecord {
            node_id,
            threshold: table.parse_float(row, 1)?,
            feature_id: table.parse_int(row, 2)?,
            left_children_id: table.parse_int(row, 3)?,
            right_children_id: table.parse_int(row, 4)?,
            class: table.rows[row][5].clone(),
        });
    }

    Ok(records)
}
