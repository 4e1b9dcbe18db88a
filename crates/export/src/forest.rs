//! Random forest export
//!
//! A forest is a directory holding one tree table per estimator. File names
//! are zero-padded so that alphabetical order equals estimator order.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::errors::{ExportError, Result};
use crate::model::TreeArrays;
use crate::sink::write_to_path;
use crate::tree::{
    read_tree, tree_records, warn_unchecked_links, write_tree_records, TreeNodeRecord,
};

const MIN_INDEX_WIDTH: usize = 4;

/// File name of estimator `index` in a forest of `count` trees
pub fn tree_file_name(index: usize, count: usize) -> String {
    let digits = count.saturating_sub(1).to_string().len();
    let width = digits.max(MIN_INDEX_WIDTH);
    format!("tree_{index:0width$}.csv")
}

fn is_table(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "csv")
}

fn is_tree_table(path: &Path) -> bool {
    is_table(path)
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("tree_"))
}

/// Remove tree tables left by an earlier export into `dir`.
///
/// Any other `*.csv` would be loaded as part of the forest, so its presence
/// is an error and nothing is removed.
fn clear_stale_tables(dir: &Path) -> Result<()> {
    let mut stale = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_tree_table(&path) {
            stale.push(path);
        } else if is_table(&path) {
            return Err(ExportError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is not a forest tree table", path.display()),
            )));
        }
    }

    for path in &stale {
        std::fs::remove_file(path)?;
    }
    if !stale.is_empty() {
        debug!("Removed {} stale tree tables from {}", stale.len(), dir.display());
    }
    Ok(())
}

/// Write every tree of a forest into `dir` and return the written paths.
///
/// All trees are encoded in memory before any file is touched. Tree tables
/// from a previous export into `dir` are removed first.
pub fn export_forest<S: AsRef<str>>(
    trees: &[TreeArrays],
    class_names: &[S],
    dir: &Path,
    config: &ExportConfig,
) -> Result<Vec<PathBuf>> {
    warn_unchecked_links(config);
    let encoded = trees
        .iter()
        .map(|tree| tree_records(tree, class_names, config.validate_links))
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(dir)?;
    clear_stale_tables(dir)?;

    let mut paths = Vec::with_capacity(encoded.len());
    for (index, records) in encoded.iter().enumerate() {
        let path = dir.join(tree_file_name(index, encoded.len()));
        write_to_path(&path, config, |writer| {
            write_tree_records(records, writer, config)
        })?;
        debug!(tree = index, nodes = records.len(), "Forest tree written");
        paths.push(path);
    }

    info!("Exported {} trees to {}", paths.len(), dir.display());
    Ok(paths)
}

/// Decode every `*.csv` tree table in `dir`, in alphabetical order
pub fn read_forest(dir: &Path) -> Result<Vec<Vec<TreeNodeRecord>>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_table(&path) {
            files.push(path);
        }
    }
    files.sort();

    files
        .iter()
        .map(|path| -> Result<Vec<TreeNodeRecord>> {
            read_tree(std::fs::File::open(path)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn leaves(count: usize) -> Vec<TreeArrays> {
        (0..count)
            .map(|_| {
                let mut tree = TreeArrays::new();
                tree.push_leaf(vec![1.0, 0.0]);
                tree
            })
            .collect()
    }

    fn stump(feature: i64) -> TreeArrays {
        let mut tree = TreeArrays::new();
        tree.push_split(feature, 1.5, 1, 2, vec![3.0, 3.0]);
        tree.push_leaf(vec![3.0, 0.0]);
        tree.push_leaf(vec![0.0, 3.0]);
        tree
    }

    #[test]
    fn test_file_names_sort_by_index() {
        assert_eq!(tree_file_name(0, 3), "tree_0000.csv");
        assert_eq!(tree_file_name(12, 100), "tree_0012.csv");
        assert_eq!(tree_file_name(7, 20_000), "tree_00007.csv");

        let mut names: Vec<_> = (0..12).map(|i| tree_file_name(i, 12)).collect();
        let ordered = names.clone();
        names.sort();
        assert_eq!(names, ordered);
    }

    #[test]
    fn test_forest_round_trip() {
        let dir = tempdir().unwrap();
        let trees = vec![stump(0), stump(1), stump(2)];

        let paths =
            export_forest(&trees, &["a", "b"], dir.path(), &ExportConfig::default()).unwrap();
        assert_eq!(paths.len(), 3);

        let decoded = read_forest(dir.path()).unwrap();
        assert_eq!(decoded.len(), 3);
        for (k, records) in decoded.iter().enumerate() {
            assert_eq!(records.len(), 3);
            assert_eq!(records[0].feature_id, k as i64);
            assert_eq!(records[2].class, "b");
        }
    }

    #[test]
    fn test_invalid_tree_writes_no_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("forest");
        let mut broken = stump(0);
        broken.children_left[0] = 9;

        let err = export_forest(&[stump(0), broken], &["a", "b"], &out, &ExportConfig::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidTree(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_reexport_replaces_previous_trees() {
        let dir = tempdir().unwrap();
        let config = ExportConfig::default();

        export_forest(&leaves(5), &["a", "b"], dir.path(), &config).unwrap();
        let paths = export_forest(&leaves(2), &["a", "b"], dir.path(), &config).unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(read_forest(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_foreign_table_blocks_export() {
        let dir = tempdir().unwrap();
        let config = ExportConfig::default();
        export_forest(&leaves(3), &["a", "b"], dir.path(), &config).unwrap();
        std::fs::write(dir.path().join("notes.csv"), "x\n").unwrap();
        std::fs::write(dir.path().join("README"), "keep").unwrap();

        let err = export_forest(&leaves(1), &["a", "b"], dir.path(), &config).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(dir.path().join("tree_0002.csv").exists());
        assert!(dir.path().join("README").exists());
    }

    #[test]
    fn test_unchecked_links_warned_once_per_forest() {
        let dir = tempdir().unwrap();
        let config = ExportConfig {
            validate_links: false,
            ..ExportConfig::default()
        };

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            export_forest(&leaves(4), &["a", "b"], dir.path(), &config)
        })
        .unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("Tree link validation disabled").count(), 1);
    }
}
