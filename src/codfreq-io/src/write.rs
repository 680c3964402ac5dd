use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::OutputError;

/// Write a report file atomically: the content lands in a temporary file in
/// the destination directory and is renamed over `path` only on success, so
/// readers never observe a half-written artifact.
pub fn atomic_write<F>(path: &Path, write_content: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), OutputError>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_content(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path)
        .map(|_| ())
        .map_err(|source| OutputError::Persist { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.csv");
        atomic_write(&target, |writer| {
            writer.write_all(b"gene,count\n")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "gene,count\n");
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.csv");
        let result = atomic_write(&target, |_| {
            Err(OutputError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
        });
        assert!(result.is_err());
        assert!(!target.exists());
    }
}
