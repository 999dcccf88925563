//! Per-class subset export: splits a quad corpus into one compressed file
//! per configured class.

use crate::engine::FileProcessor;
use crate::grouper::group_entities;
use crate::input::open_reader;
use crate::model::Entity;
use crate::writer::AsyncEntityWriter;
use anyhow::{bail, Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub struct SubsetConfig {
    pub output_dir: PathBuf,
    /// Class filter file: one `<class><sep><output base name>` line per
    /// subset to create.
    pub class_file: PathBuf,
    pub separator: String,
}

/// The subset path's batch processor. Setup opens one async writer per
/// configured class (fatal on any error); workers classify each URL's
/// entity batch and fan it out; teardown closes and joins every writer.
pub struct SubsetProcessor {
    config: SubsetConfig,
    writers: FxHashMap<String, AsyncEntityWriter>,
    lines_ok: AtomicU64,
    lines_failed: AtomicU64,
    entities_written: AtomicU64,
}

impl SubsetProcessor {
    pub fn new(config: SubsetConfig) -> Self {
        SubsetProcessor {
            config,
            writers: FxHashMap::default(),
            lines_ok: AtomicU64::new(0),
            lines_failed: AtomicU64::new(0),
            entities_written: AtomicU64::new(0),
        }
    }

    pub fn lines_ok(&self) -> u64 {
        self.lines_ok.load(Ordering::Relaxed)
    }

    pub fn lines_failed(&self) -> u64 {
        self.lines_failed.load(Ordering::Relaxed)
    }

    pub fn entities_written(&self) -> u64 {
        self.entities_written.load(Ordering::Relaxed)
    }

    /// Fans one URL's batch out to every configured class appearing among
    /// the batch's entity types. The whole batch goes to each matched
    /// writer: when a class appears on a URL, every entity of that URL
    /// belongs to its subset, so entities can appear in several output
    /// files. That duplication is deliberate.
    fn process_batch(&self, batch: &[Entity]) {
        let mut matched: FxHashSet<&str> = FxHashSet::default();
        for entity in batch {
            if let Some(class) = entity.type_iri() {
                if self.writers.contains_key(class) {
                    matched.insert(class);
                }
            }
        }
        for class in matched {
            let writer = &self.writers[class];
            if let Err(e) = writer.append_all(batch) {
                warn!(class, error = %e, "Failed to enqueue batch");
                continue;
            }
            self.entities_written
                .fetch_add(batch.len() as u64, Ordering::Relaxed);
        }
    }
}

impl FileProcessor for SubsetProcessor {
    /// Reads the class filter file and opens every output writer. Any
    /// failure here aborts the run before a single input file is touched.
    fn setup(&mut self) -> Result<()> {
        let file = File::open(&self.config.class_file).with_context(|| {
            format!(
                "Failed to read class filter file: {}",
                self.config.class_file.display()
            )
        })?;

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (class, base_name) = match line.split_once(&self.config.separator) {
                Some((class, base_name)) if !class.is_empty() && !base_name.is_empty() => {
                    (class.to_string(), base_name)
                }
                _ => bail!(
                    "Malformed class filter line {}: {:?}",
                    idx + 1,
                    line
                ),
            };
            let path = self.config.output_dir.join(format!("{}.gz", base_name));
            let mut writer = AsyncEntityWriter::new(path);
            writer.open()?;
            self.writers.insert(class, writer);
        }

        if self.writers.is_empty() {
            bail!(
                "Class filter file is empty: {}",
                self.config.class_file.display()
            );
        }
        info!(classes = self.writers.len(), "Subset writers opened");
        Ok(())
    }

    fn process(&self, path: &Path) -> Result<()> {
        debug!(file = %path.display(), "Splitting into subsets");
        let reader = open_reader(path)?;
        let group_stats = group_entities(reader, false, |_url, batch| {
            self.process_batch(&batch);
        })?;
        self.lines_ok.fetch_add(group_stats.lines_ok, Ordering::Relaxed);
        self.lines_failed
            .fetch_add(group_stats.lines_failed, Ordering::Relaxed);
        Ok(())
    }

    /// Closes every writer, then joins each consumer so the gzip streams
    /// are complete before the run is declared done.
    fn teardown(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.close();
        }
        for writer in self.writers.values_mut() {
            writer.join();
        }
        info!(
            entities = self.entities_written(),
            "Subset export complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use flate2::read::GzDecoder;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn write_filter_file(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("classes.tsv");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn read_gz(path: &Path) -> String {
        let mut out = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    fn quad_line(subject: &str, predicate: &str, object: &str, graph: &str) -> String {
        format!("<{}> <{}> <{}> <{}> .", subject, predicate, object, graph)
    }

    #[test]
    fn setup_fails_on_missing_filter_file() {
        let dir = TempDir::new().unwrap();
        let mut processor = SubsetProcessor::new(SubsetConfig {
            output_dir: dir.path().to_path_buf(),
            class_file: dir.path().join("nope.tsv"),
            separator: "\t".to_string(),
        });
        assert!(processor.setup().is_err());
    }

    #[test]
    fn setup_fails_on_malformed_line() {
        let dir = TempDir::new().unwrap();
        let class_file = write_filter_file(dir.path(), &["no-separator-here"]);
        let mut processor = SubsetProcessor::new(SubsetConfig {
            output_dir: dir.path().to_path_buf(),
            class_file,
            separator: "\t".to_string(),
        });
        assert!(processor.setup().is_err());
    }

    #[test]
    fn entity_matching_two_classes_lands_in_both_files() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let class_file = write_filter_file(
            dir.path(),
            &[
                "http://schema.org/Product\tproducts",
                "http://schema.org/Offer\toffers",
            ],
        );

        // one URL carrying a Product entity and an Offer entity: the whole
        // batch goes to both subsets
        let input_path = dir.path().join("input.nq");
        let mut input = File::create(&input_path)?;
        writeln!(
            input,
            "{}",
            quad_line(
                "http://e.com/p",
                config::RDF_TYPE,
                "http://schema.org/Product",
                "http://e.com/page"
            )
        )?;
        writeln!(
            input,
            "{}",
            quad_line(
                "http://e.com/o",
                config::RDF_TYPE,
                "http://schema.org/Offer",
                "http://e.com/page"
            )
        )?;

        let mut processor = SubsetProcessor::new(SubsetConfig {
            output_dir: dir.path().to_path_buf(),
            class_file,
            separator: "\t".to_string(),
        });
        processor.setup()?;
        processor.process(&input_path)?;
        processor.teardown()?;

        let products = read_gz(&dir.path().join("products.gz"));
        let offers = read_gz(&dir.path().join("offers.gz"));
        assert_eq!(products, offers);
        assert_eq!(products.lines().count(), 2);
        assert!(products.contains("<http://e.com/p>"));
        assert!(products.contains("<http://e.com/o>"));
        Ok(())
    }

    #[test]
    fn unmatched_entities_are_dropped() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let class_file =
            write_filter_file(dir.path(), &["http://schema.org/Product\tproducts"]);

        let input_path = dir.path().join("input.nq");
        let mut input = File::create(&input_path)?;
        writeln!(
            input,
            "{}",
            quad_line(
                "http://e.com/r",
                config::RDF_TYPE,
                "http://schema.org/Review",
                "http://e.com/page"
            )
        )?;

        let mut processor = SubsetProcessor::new(SubsetConfig {
            output_dir: dir.path().to_path_buf(),
            class_file,
            separator: "\t".to_string(),
        });
        processor.setup()?;
        processor.process(&input_path)?;
        processor.teardown()?;

        assert_eq!(read_gz(&dir.path().join("products.gz")), "");
        assert_eq!(processor.entities_written(), 0);
        Ok(())
    }

    #[test]
    fn custom_separator() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let class_file =
            write_filter_file(dir.path(), &["http://schema.org/Product;products"]);

        let mut processor = SubsetProcessor::new(SubsetConfig {
            output_dir: dir.path().to_path_buf(),
            class_file,
            separator: ";".to_string(),
        });
        processor.setup()?;
        processor.teardown()?;

        assert!(dir.path().join("products.gz").exists());
        Ok(())
    }

    #[test]
    fn entities_preserve_source_lines() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let class_file =
            write_filter_file(dir.path(), &["http://schema.org/Product\tproducts"]);

        let lines = [
            quad_line(
                "http://e.com/p",
                config::RDF_TYPE,
                "http://schema.org/Product",
                "http://e.com/page"
            ),
            "<http://e.com/p> <http://schema.org/name> \"Widget\"@en <http://e.com/page> ."
                .to_string(),
        ];
        let input_path = dir.path().join("input.nq");
        std::fs::write(&input_path, format!("{}\n{}\n", lines[0], lines[1]))?;

        let mut processor = SubsetProcessor::new(SubsetConfig {
            output_dir: dir.path().to_path_buf(),
            class_file,
            separator: "\t".to_string(),
        });
        processor.setup()?;
        processor.process(&input_path)?;
        processor.teardown()?;

        let output = read_gz(&dir.path().join("products.gz"));
        assert_eq!(output, format!("{}\n{}\n", lines[0], lines[1]));
        Ok(())
    }
}
