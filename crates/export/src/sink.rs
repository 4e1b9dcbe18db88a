//! File sinks
//!
//! Every path-based export goes through [`write_to_path`], which owns the
//! file handle for the duration of one encoder call and flushes it before
//! returning.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::ExportConfig;
use crate::errors::{ExportError, Result};

/// Run `encode` against a buffered writer for `path`.
///
/// Without `atomic_write` the file is truncated up front and a failing
/// encoder leaves whatever was flushed so far. With `atomic_write` the
/// output is staged next to `path` and renamed into place only on success.
pub fn write_to_path<T, F>(path: &Path, config: &ExportConfig, encode: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    if config.atomic_write {
        write_atomic(path, encode)
    } else {
        let mut writer = BufWriter::new(File::create(path)?);
        let value = encode(&mut writer)?;
        writer.flush()?;
        debug!("Wrote {}", path.display());
        Ok(value)
    }
}

fn write_atomic<T, F>(path: &Path, encode: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)?;
    let value = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let value = encode(&mut writer)?;
        writer.flush()?;
        value
    };

    staged
        .persist(path)
        .map_err(|err| ExportError::Io(err.error))?;
    debug!("Atomically wrote {}", path.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn failing(writer: &mut dyn Write) -> Result<()> {
        writer.write_all(b"partial\n")?;
        writer.flush()?;
        Err(ExportError::ShapeMismatch("boom".to_string()))
    }

    #[test]
    fn test_plain_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let value = write_to_path(&path, &ExportConfig::default(), |w| {
            w.write_all(b"a,b\n")?;
            Ok(42)
        })
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }

    #[test]
    fn test_plain_failure_keeps_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        assert!(write_to_path(&path, &ExportConfig::default(), failing).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "partial\n");
    }

    #[test]
    fn test_atomic_failure_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old\n").unwrap();

        let config = ExportConfig {
            atomic_write: true,
            ..ExportConfig::default()
        };
        assert!(write_to_path(&path, &config, failing).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\n");

        write_to_path(&path, &config, |w| Ok(w.write_all(b"new\n")?)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_to_path(&path, &ExportConfig::default(), |_| Ok(())).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
