//! Single-pass grouping of a quad stream into entities and per-URL batches.

use crate::model::{Entity, Quad, Term};
use crate::parser::{clean_line, parse_quad_line};
use anyhow::Result;
use std::io::BufRead;

/// Line-level accounting for one grouped file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub lines_ok: u64,
    pub lines_failed: u64,
}

/// Groups a raw quad line stream into per-URL batches of entities, calling
/// `sink(url, batch)` once per URL.
///
/// The caller guarantees that all quads of one graph are contiguous in the
/// stream and, within a graph, all quads of one subject are contiguous.
/// That contiguity is trusted, not checked: a stream violating it groups
/// incorrectly without any error. Lines that fail to parse are counted and
/// skipped; grouping state is unaffected.
///
/// When `clean` is set, every line runs through [`clean_line`] before
/// parsing (the stats path wants this; subset export writes lines back out
/// verbatim and does not).
pub fn group_entities<R, F>(reader: R, clean: bool, mut sink: F) -> Result<GroupStats>
where
    R: BufRead,
    F: FnMut(&str, Vec<Entity>),
{
    let mut stats = GroupStats::default();
    let mut current_graph: Option<String> = None;
    let mut current_subject: Option<Term> = None;
    let mut quad_group: Vec<Quad> = Vec::new();
    let mut batch: Vec<Entity> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let quad = if clean {
            parse_quad_line(&clean_line(&line))
        } else {
            parse_quad_line(&line)
        };
        let quad = match quad {
            Ok(q) => q,
            Err(_) => {
                stats.lines_failed += 1;
                continue;
            }
        };
        stats.lines_ok += 1;

        let same_graph = current_graph.as_deref() == Some(quad.graph.as_str());
        if same_graph {
            if current_subject.as_ref() == Some(&quad.subject) {
                quad_group.push(quad);
            } else {
                flush_group(&mut quad_group, &mut batch);
                current_subject = Some(quad.subject.clone());
                quad_group.push(quad);
            }
        } else {
            flush_group(&mut quad_group, &mut batch);
            if !batch.is_empty() {
                // previous URL is complete
                let url = current_graph.take().unwrap_or_default();
                sink(&url, std::mem::take(&mut batch));
            }
            current_graph = Some(quad.graph.clone());
            current_subject = Some(quad.subject.clone());
            quad_group.push(quad);
        }
    }

    // trailing flush: the stream has no terminating marker
    flush_group(&mut quad_group, &mut batch);
    if !batch.is_empty() {
        let url = current_graph.take().unwrap_or_default();
        sink(&url, batch);
    }

    Ok(stats)
}

fn flush_group(quad_group: &mut Vec<Quad>, batch: &mut Vec<Entity>) {
    if !quad_group.is_empty() {
        batch.push(Entity::from_quads(std::mem::take(quad_group)));
    }
}
