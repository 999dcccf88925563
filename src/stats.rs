//! Deployment statistics over a quad corpus: vocabularies, classes, and
//! properties by entity count, URL count, and distinct pay-level domains.
//!
//! Workers aggregate into file-local maps and merge into the global tables
//! once per finished file, so lock contention scales with the number of
//! files, not the number of lines.

use crate::config::OUTPUT_BUF_SIZE;
use crate::domain::pay_level_domain;
use crate::engine::FileProcessor;
use crate::grouper::group_entities;
use crate::input::open_reader;
use crate::model::Entity;
use crate::vocab;
use anyhow::{Context, Result};
use dashmap::DashSet;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Per-key rollup: distinct-entity touches summed over URLs, URLs the key
/// appeared on, and the distinct pay-level domains behind those URLs.
///
/// `domains.len() <= url_count` always holds: each URL contributes exactly
/// one url_count increment and at most one new domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatAggregate {
    pub entity_count: u64,
    pub url_count: u64,
    pub domains: FxHashSet<String>,
}

impl StatAggregate {
    /// Absorbs another aggregate. Counts sum, domain sets union; the
    /// operation is associative and commutative with the empty aggregate as
    /// identity, so merge order across files does not matter.
    pub fn merge(&mut self, other: StatAggregate) {
        self.entity_count += other.entity_count;
        self.url_count += other.url_count;
        self.domains.extend(other.domains);
    }
}

pub type StatTable = FxHashMap<String, StatAggregate>;

/// Merges a file-local table into a global one.
pub fn merge_tables(global: &mut StatTable, local: StatTable) {
    for (key, aggregate) in local {
        match global.get_mut(&key) {
            Some(existing) => existing.merge(aggregate),
            None => {
                global.insert(key, aggregate);
            }
        }
    }
}

/// Decides whether a predicate declares an entity's class.
pub enum TypeMatcher {
    Exact(FxHashSet<String>),
    Patterns(Vec<Regex>),
}

impl TypeMatcher {
    pub fn exact<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeMatcher::Exact(predicates.into_iter().map(Into::into).collect())
    }

    pub fn regex<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .with_context(|| format!("Invalid type-predicate pattern: {}", p.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TypeMatcher::Patterns(compiled))
    }

    pub fn matches(&self, predicate: &str) -> bool {
        match self {
            TypeMatcher::Exact(set) => set.contains(predicate),
            TypeMatcher::Patterns(patterns) => patterns.iter().any(|p| p.is_match(predicate)),
        }
    }
}

pub struct StatsConfig {
    pub output_dir: PathBuf,
    /// Filename prefix of the processed files; prepended to the output file
    /// names when non-empty so parallel runs over different slices do not
    /// clobber each other.
    pub file_prefix: String,
    pub matcher: TypeMatcher,
    /// Predicates that do not mark a subject as untyped.
    pub untyped_exceptions: FxHashSet<String>,
}

/// The statistics path's batch processor: one instance shared across all
/// workers, with the three global tables behind per-table mutexes.
pub struct QuadStatsProcessor {
    config: StatsConfig,
    vocab_stats: Mutex<StatTable>,
    class_stats: Mutex<StatTable>,
    prop_stats: Mutex<StatTable>,
    lines_ok: AtomicU64,
    lines_failed: AtomicU64,
    untyped_subjects: DashSet<String>,
    typed_entities: AtomicU64,
}

impl QuadStatsProcessor {
    pub fn new(config: StatsConfig) -> Self {
        QuadStatsProcessor {
            config,
            vocab_stats: Mutex::new(StatTable::default()),
            class_stats: Mutex::new(StatTable::default()),
            prop_stats: Mutex::new(StatTable::default()),
            lines_ok: AtomicU64::new(0),
            lines_failed: AtomicU64::new(0),
            untyped_subjects: DashSet::new(),
            typed_entities: AtomicU64::new(0),
        }
    }

    pub fn lines_ok(&self) -> u64 {
        self.lines_ok.load(Ordering::Relaxed)
    }

    pub fn lines_failed(&self) -> u64 {
        self.lines_failed.load(Ordering::Relaxed)
    }

    pub fn untyped_subject_count(&self) -> usize {
        self.untyped_subjects.len()
    }

    /// Total typed entities: the sum of entity counts over the class table.
    /// Populated during teardown.
    pub fn typed_entity_total(&self) -> u64 {
        self.typed_entities.load(Ordering::Relaxed)
    }

    /// Aggregates one URL's entity batch into the file-local tables.
    ///
    /// Pass A resolves each subject's class from the typing quads; pass B
    /// attributes every quad to a property key and a vocabulary. A URL whose
    /// domain cannot be resolved is dropped entirely.
    fn process_url_batch(
        &self,
        url: &str,
        batch: &[Entity],
        vocab_local: &mut StatTable,
        class_local: &mut StatTable,
        prop_local: &mut StatTable,
    ) {
        let domain = match pay_level_domain(url) {
            Some(d) => d,
            None => {
                debug!(url, "No pay-level domain, dropping URL from aggregation");
                return;
            }
        };

        let mut vocab_entities: FxHashMap<String, FxHashSet<&str>> = FxHashMap::default();
        let mut class_entities: FxHashMap<String, FxHashSet<&str>> = FxHashMap::default();
        let mut prop_entities: FxHashMap<String, FxHashSet<&str>> = FxHashMap::default();
        let mut subject_to_class: FxHashMap<&str, &str> = FxHashMap::default();

        // pass A: typing quads establish each subject's class
        for entity in batch {
            for quad in entity.quads() {
                if self.config.matcher.matches(&quad.predicate) {
                    let class = quad.value.value();
                    let subject = quad.subject.value();
                    class_entities
                        .entry(class.to_string())
                        .or_default()
                        .insert(subject);
                    subject_to_class.insert(subject, class);
                }
            }
        }

        // pass B: property keys and vocabularies
        for entity in batch {
            for quad in entity.quads() {
                let subject = quad.subject.value();
                let vocab_iri = if self.config.matcher.matches(&quad.predicate) {
                    // a typing quad contributes the class's vocabulary
                    vocab::namespace(quad.value.value()).to_string()
                } else {
                    let key = match subject_to_class.get(subject) {
                        // qualify with the class unless the predicate already
                        // embeds it; plain substring containment, so a
                        // coincidental match keeps the raw predicate
                        Some(class) if !quad.predicate.contains(*class) => {
                            format!("{}/{}", class, vocab::local_name(&quad.predicate))
                        }
                        Some(_) => quad.predicate.clone(),
                        None => {
                            if !self.config.untyped_exceptions.contains(&quad.predicate) {
                                self.untyped_subjects.insert(subject.to_string());
                            }
                            quad.predicate.clone()
                        }
                    };
                    prop_entities.entry(key).or_default().insert(subject);
                    vocab::namespace(&quad.predicate).to_string()
                };
                vocab_entities.entry(vocab_iri).or_default().insert(subject);
            }
        }

        roll_up(vocab_local, vocab_entities, &domain);
        roll_up(class_local, class_entities, &domain);
        roll_up(prop_local, prop_entities, &domain);
    }

    fn write_stats_file(&self, name: &str, key_column: &str, table: &StatTable) -> Result<()> {
        let mut out = self.create_output(name)?;
        writeln!(out, "{}\tnumEntities\tnumUrls\tnumDomains", key_column)?;
        for (key, aggregate) in sorted_by_domains(table) {
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                key,
                aggregate.entity_count,
                aggregate.url_count,
                aggregate.domains.len()
            )?;
        }
        out.into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush {}: {}", name, e))?
            .finish()
            .with_context(|| format!("Failed to finish gzip stream for {}", name))?;
        Ok(())
    }

    fn write_class_domains_file(&self, name: &str, table: &StatTable) -> Result<()> {
        let mut out = self.create_output(name)?;
        for (class, aggregate) in sorted_by_domains(table) {
            out.write_all(class.as_bytes())?;
            for domain in &aggregate.domains {
                write!(out, "\t{}", domain)?;
            }
            writeln!(out)?;
        }
        out.into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush {}: {}", name, e))?
            .finish()
            .with_context(|| format!("Failed to finish gzip stream for {}", name))?;
        Ok(())
    }

    fn create_output(&self, name: &str) -> Result<BufWriter<GzEncoder<File>>> {
        let file_name = if self.config.file_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.config.file_prefix, name)
        };
        let path = self.config.output_dir.join(file_name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(BufWriter::with_capacity(
            OUTPUT_BUF_SIZE,
            GzEncoder::new(file, Compression::default()),
        ))
    }
}

impl FileProcessor for QuadStatsProcessor {
    fn process(&self, path: &Path) -> Result<()> {
        debug!(file = %path.display(), "Aggregating statistics");
        let reader = open_reader(path)?;

        let mut vocab_local = StatTable::default();
        let mut class_local = StatTable::default();
        let mut prop_local = StatTable::default();

        let group_stats = group_entities(reader, true, |url, batch| {
            self.process_url_batch(url, &batch, &mut vocab_local, &mut class_local, &mut prop_local);
        })?;

        // single merge per file and table
        merge_tables(&mut self.vocab_stats.lock().unwrap(), vocab_local);
        merge_tables(&mut self.class_stats.lock().unwrap(), class_local);
        merge_tables(&mut self.prop_stats.lock().unwrap(), prop_local);
        self.lines_ok.fetch_add(group_stats.lines_ok, Ordering::Relaxed);
        self.lines_failed
            .fetch_add(group_stats.lines_failed, Ordering::Relaxed);
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        let vocab_stats = self.vocab_stats.lock().unwrap();
        let class_stats = self.class_stats.lock().unwrap();
        let prop_stats = self.prop_stats.lock().unwrap();

        self.write_stats_file("vocab.stats.gz", "vocab", &vocab_stats)?;
        self.write_stats_file("class.stats.gz", "class", &class_stats)?;
        self.write_stats_file("prop.stats.gz", "prop", &prop_stats)?;
        self.write_class_domains_file("class.domains.gz", &class_stats)?;

        let typed: u64 = class_stats.values().map(|a| a.entity_count).sum();
        self.typed_entities.store(typed, Ordering::Relaxed);

        info!(
            vocabularies = vocab_stats.len(),
            classes = class_stats.len(),
            properties = prop_stats.len(),
            typed_entities = typed,
            "Statistics written"
        );
        Ok(())
    }
}

/// Adds one URL's per-key entity sets to a local table.
fn roll_up(table: &mut StatTable, entities: FxHashMap<String, FxHashSet<&str>>, domain: &str) {
    for (key, subjects) in entities {
        let aggregate = table.entry(key).or_default();
        aggregate.entity_count += subjects.len() as u64;
        aggregate.url_count += 1;
        if !aggregate.domains.contains(domain) {
            aggregate.domains.insert(domain.to_string());
        }
    }
}

/// Table rows sorted descending by distinct-domain count; ties unordered.
fn sorted_by_domains(table: &StatTable) -> Vec<(&String, &StatAggregate)> {
    let mut rows: Vec<_> = table.iter().collect();
    rows.sort_by(|a, b| b.1.domains.len().cmp(&a.1.domains.len()));
    rows
}
