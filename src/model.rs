use crate::config;
use std::fmt;

/// A single RDF term: the subject, object, or graph position of a quad.
///
/// Literal values keep their escape sequences exactly as read so that
/// serializing an entity back out reproduces the input bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal {
        value: String,
        lang: Option<String>,
        datatype: Option<String>,
    },
}

impl Term {
    /// The bare value of the term, without angle brackets, quotes, or the
    /// blank-node prefix. This is the identity used for grouping and for
    /// statistics keys.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::BlankNode(label) => label,
            Term::Literal { value, .. } => value,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal {
                value,
                lang,
                datatype,
            } => {
                write!(f, "\"{}\"", value)?;
                if let Some(lang) = lang {
                    write!(f, "@{}", lang)?;
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)?;
                }
                Ok(())
            }
        }
    }
}

/// One parsed quad line: `<subject> <predicate> <object> <graph> .`
///
/// `graph` is the URL of the page the quad was extracted from. The predicate
/// is always an IRI, so it is kept as a plain string.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub subject: Term,
    pub predicate: String,
    pub value: Term,
    pub graph: String,
}

impl Quad {
    /// Serializes the quad back to its source line format.
    pub fn to_line(&self) -> String {
        format!(
            "{} <{}> {} <{}> .",
            self.subject, self.predicate, self.value, self.graph
        )
    }
}

/// All quads sharing one `(graph, subject)` pair: one described item on one
/// page. Built by the grouper, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    quads: Vec<Quad>,
}

impl Entity {
    /// Builds an entity from the quads of one subject. Callers must pass at
    /// least one quad; the grouper never flushes an empty group.
    pub fn from_quads(quads: Vec<Quad>) -> Self {
        debug_assert!(!quads.is_empty());
        Entity { quads }
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn graph(&self) -> &str {
        &self.quads[0].graph
    }

    pub fn subject(&self) -> &Term {
        &self.quads[0].subject
    }

    /// The entity's class IRI, taken from the first quad whose predicate is
    /// one of the well-known type predicates. `None` for untyped entities.
    pub fn type_iri(&self) -> Option<&str> {
        self.quads
            .iter()
            .find(|q| config::TYPE_PREDICATES.contains(&q.predicate.as_str()) && q.value.is_iri())
            .map(|q| q.value.value())
    }

    /// Serializes the entity back to newline-terminated quad lines.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for quad in &self.quads {
            out.push_str(&quad.to_line());
            out.push('\n');
        }
        out
    }
}
