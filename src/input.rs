//! Input discovery and decompression.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Lists the plain files in `dir`, optionally keeping only those whose name
/// starts with `prefix`. Subdirectories are skipped. The result is sorted so
/// runs are deterministic regardless of directory iteration order.
pub fn list_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !prefix.is_empty() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(prefix) {
                continue;
            }
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Opens a dump file for line-by-line reading, transparently decompressing
/// `.gz` files. Anything else is read as plain text.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let is_gz = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn list_files_sorted_and_filtered() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("part-b.nq"), "")?;
        fs::write(dir.path().join("part-a.nq"), "")?;
        fs::write(dir.path().join("other.nq"), "")?;
        fs::create_dir(dir.path().join("part-subdir"))?;

        let all = list_files(dir.path(), "")?;
        assert_eq!(all.len(), 3);

        let parts = list_files(dir.path(), "part-")?;
        let names: Vec<_> = parts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["part-a.nq", "part-b.nq"]);
        Ok(())
    }

    #[test]
    fn open_reader_plain() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("plain.nq");
        fs::write(&path, "line one\nline two\n")?;

        let reader = open_reader(&path)?;
        let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
        assert_eq!(lines, vec!["line one", "line two"]);
        Ok(())
    }

    #[test]
    fn open_reader_gzip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data.nq.gz");
        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::fast());
        encoder.write_all(b"compressed line\n")?;
        encoder.finish()?;

        let reader = open_reader(&path)?;
        let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
        assert_eq!(lines, vec!["compressed line"]);
        Ok(())
    }
}
