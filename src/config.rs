use std::time::Duration;

/// The standard RDF typing predicate.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// The HTML microdata typing predicate emitted by the extraction pipeline.
pub const MICRODATA_TYPE: &str = "http://www.w3.org/1999/xhtml/microdata#type";

/// Predicates that declare an entity's class when classifying for subset export.
pub const TYPE_PREDICATES: &[&str] = &[RDF_TYPE, MICRODATA_TYPE];

/// Predicates that never mark a subject as "untyped" even when no class was
/// resolved for it. The microdata `item` predicate links a page to its items
/// and carries no class information.
pub const DEFAULT_UNTYPED_EXCEPTIONS: &[&str] = &["http://www.w3.org/1999/xhtml/microdata#item"];

/// Owned copy of [`DEFAULT_UNTYPED_EXCEPTIONS`] for CLI defaults.
pub fn default_untyped_exceptions() -> Vec<String> {
    DEFAULT_UNTYPED_EXCEPTIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Default column separator for the class filter file.
pub const DEFAULT_FILTER_SEPARATOR: &str = "\t";

/// How often the async writer's consumer re-checks its stop flag while idle.
pub const WRITER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Buffer size for gzip output streams.
pub const OUTPUT_BUF_SIZE: usize = 128 * 1024;
