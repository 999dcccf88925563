//! Quadprof: RDF-quad dump profiling and subset export
//!
//! This crate processes the quad dumps produced by a web-scale structured
//! data extraction pipeline. It ships two tools over the same engine:
//!
//! 1. **Stats** -- Aggregate vocabulary, class, and property usage by entity
//!    count, source-URL count, and distinct pay-level-domain count
//! 2. **Subset** -- Split the dump into one compressed file per configured
//!    class, fanning entities out to every class they match
//!
//! # Architecture
//!
//! Both tools are built on the same concurrent pieces:
//!
//! - **Parallel batch engine** -- A fixed-size worker pool drains the file
//!   list with ordered setup/teardown hooks; each worker owns one file
//!   end-to-end and per-file failures never stop siblings
//! - **Single-pass grouping** -- Quad streams are grouped into per-subject
//!   entities and per-URL batches in one forward pass, trusting the dump's
//!   contiguity ordering
//! - **Thread-local aggregation** -- Statistics accumulate in file-local
//!   maps and merge into the global tables once per finished file, so lock
//!   contention scales with file count rather than line count
//! - **Async fan-out writing** -- Subset output goes through per-class
//!   background writer threads fed by unbounded queues, keeping producers
//!   off the I/O path
//!
//! # Key Modules
//!
//! - [`engine`] -- Worker pool with setup/process/teardown lifecycle
//! - [`grouper`] -- Quad stream to entity-batch grouping
//! - [`stats`] -- Statistics aggregation, merging, and serialization
//! - [`subset`] -- Per-class subset export
//! - [`writer`] -- Asynchronous gzip entity writer
//! - [`parser`] -- Quad line tokenization and cleanup
//! - [`model`] -- Core data types (Term, Quad, Entity)
//! - [`domain`] / [`vocab`] -- Pay-level-domain and vocabulary resolution
//! - [`input`] -- Input listing and decompression
//! - [`config`] -- Constants and well-known predicates
//!
//! # Example Usage
//!
//! ```bash
//! # Vocabulary/class/property statistics over a dump directory
//! quadprof stats -i dumps/ -o stats/ -t 8 \
//!     --type-properties http://www.w3.org/1999/02/22-rdf-syntax-ns#type
//!
//! # Split the dump into per-class subsets
//! quadprof subset -i dumps/ -o subsets/ -t 8 --class-file classes.tsv
//! ```

pub mod config;
pub mod domain;
pub mod engine;
pub mod grouper;
pub mod input;
pub mod model;
pub mod parser;
pub mod stats;
pub mod subset;
pub mod vocab;
pub mod writer;
