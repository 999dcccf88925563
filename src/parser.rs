use crate::model::{Quad, Term};
use std::fmt;

/// Why a quad line failed to parse. Parse failures are counted and skipped by
/// callers; they never abort a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    EmptyLine,
    MissingTerm,
    UnterminatedIri,
    UnterminatedLiteral,
    BadSubject,
    BadPredicate,
    BadGraph,
    MissingTerminator,
    TrailingGarbage,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::EmptyLine => "empty line",
            ParseError::MissingTerm => "expected a term",
            ParseError::UnterminatedIri => "unterminated IRI",
            ParseError::UnterminatedLiteral => "unterminated literal",
            ParseError::BadSubject => "subject must be an IRI or blank node",
            ParseError::BadPredicate => "predicate must be an IRI",
            ParseError::BadGraph => "graph must be an IRI",
            ParseError::MissingTerminator => "missing trailing '.'",
            ParseError::TrailingGarbage => "unexpected content after terminator",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Region-suffixed language tags the upstream extractor emits but the quad
/// grammar does not accept. Rewritten to their base tag before parsing.
const LANG_TAG_REWRITES: &[(&str, &str)] = &[
    ("@en_US", "@en"),
    ("@en_GB", "@en"),
    ("@de_DE", "@de"),
    ("@pt_br", "@pt"),
    ("@pt_BR", "@pt"),
    ("@fr_CA", "@fr"),
    ("@fr_BE", "@fr"),
    ("@da_DK", "@da"),
    ("@tr_TR", "@tr"),
];

/// Normalizes a raw dump line before parsing: strips non-ASCII bytes and
/// rewrites region-suffixed language tags. Mirrors what the extraction
/// pipeline's own consumers do; without it a noticeable share of otherwise
/// valid lines fails to parse.
pub fn clean_line(line: &str) -> String {
    let mut cleaned: String = line.chars().filter(|c| c.is_ascii()).collect();
    for (from, to) in LANG_TAG_REWRITES {
        if cleaned.contains(from) {
            cleaned = cleaned.replace(from, to);
        }
    }
    cleaned
}

/// Parses one `<subject> <predicate> <object> <graph> .` line.
pub fn parse_quad_line(line: &str) -> Result<Quad, ParseError> {
    let rest = line.trim();
    if rest.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let (subject, rest) = parse_term(rest)?;
    if matches!(subject, Term::Literal { .. }) {
        return Err(ParseError::BadSubject);
    }

    let (predicate, rest) = parse_term(rest)?;
    let predicate = match predicate {
        Term::Iri(iri) => iri,
        _ => return Err(ParseError::BadPredicate),
    };

    let (value, rest) = parse_term(rest)?;

    let (graph, rest) = parse_term(rest)?;
    let graph = match graph {
        Term::Iri(iri) => iri,
        _ => return Err(ParseError::BadGraph),
    };

    let rest = rest.trim_start();
    let rest = rest.strip_prefix('.').ok_or(ParseError::MissingTerminator)?;
    if !rest.trim().is_empty() {
        return Err(ParseError::TrailingGarbage);
    }

    Ok(Quad {
        subject,
        predicate,
        value,
        graph,
    })
}

/// Reads one term off the front of `input`, returning it and the remainder.
fn parse_term(input: &str) -> Result<(Term, &str), ParseError> {
    let input = input.trim_start();
    let mut chars = input.chars();
    match chars.next() {
        Some('<') => {
            let end = input.find('>').ok_or(ParseError::UnterminatedIri)?;
            Ok((Term::Iri(input[1..end].to_string()), &input[end + 1..]))
        }
        Some('_') => {
            let body = input.strip_prefix("_:").ok_or(ParseError::MissingTerm)?;
            let end = body
                .find(|c: char| c.is_whitespace())
                .unwrap_or(body.len());
            if end == 0 {
                return Err(ParseError::MissingTerm);
            }
            Ok((Term::BlankNode(body[..end].to_string()), &body[end..]))
        }
        Some('"') => parse_literal(input),
        Some(_) | None => Err(ParseError::MissingTerm),
    }
}

/// Parses a quoted literal with optional `@lang` tag or `^^<datatype>`
/// suffix. Escape sequences are kept verbatim so serialization round-trips.
fn parse_literal(input: &str) -> Result<(Term, &str), ParseError> {
    let body = &input[1..];
    let mut end = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            end = Some(i);
            break;
        }
    }
    let end = end.ok_or(ParseError::UnterminatedLiteral)?;
    let value = body[..end].to_string();
    let rest = &body[end + 1..];

    if let Some(tag_rest) = rest.strip_prefix('@') {
        let tag_end = tag_rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(tag_rest.len());
        if tag_end == 0 {
            return Err(ParseError::UnterminatedLiteral);
        }
        let lang = tag_rest[..tag_end].to_string();
        Ok((
            Term::Literal {
                value,
                lang: Some(lang),
                datatype: None,
            },
            &tag_rest[tag_end..],
        ))
    } else if let Some(dt_rest) = rest.strip_prefix("^^<") {
        let dt_end = dt_rest.find('>').ok_or(ParseError::UnterminatedIri)?;
        let datatype = dt_rest[..dt_end].to_string();
        Ok((
            Term::Literal {
                value,
                lang: None,
                datatype: Some(datatype),
            },
            &dt_rest[dt_end + 1..],
        ))
    } else {
        Ok((
            Term::Literal {
                value,
                lang: None,
                datatype: None,
            },
            rest,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_iri_object() {
        let q = parse_quad_line(
            "<http://a.com/x> <http://schema.org/url> <http://a.com/y> <http://a.com/page> .",
        )
        .unwrap();
        assert_eq!(q.subject, Term::Iri("http://a.com/x".to_string()));
        assert_eq!(q.predicate, "http://schema.org/url");
        assert_eq!(q.value, Term::Iri("http://a.com/y".to_string()));
        assert_eq!(q.graph, "http://a.com/page");
    }

    #[test]
    fn parse_blank_node_subject() {
        let q = parse_quad_line(
            "_:nb0 <http://schema.org/name> \"Widget\" <http://a.com/page> .",
        )
        .unwrap();
        assert_eq!(q.subject, Term::BlankNode("nb0".to_string()));
        assert_eq!(
            q.value,
            Term::Literal {
                value: "Widget".to_string(),
                lang: None,
                datatype: None,
            }
        );
    }

    #[test]
    fn parse_literal_with_lang() {
        let q = parse_quad_line(
            "<http://a.com/x> <http://schema.org/name> \"chaise\"@fr <http://a.com/page> .",
        )
        .unwrap();
        match q.value {
            Term::Literal { value, lang, .. } => {
                assert_eq!(value, "chaise");
                assert_eq!(lang.as_deref(), Some("fr"));
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn parse_literal_with_datatype() {
        let q = parse_quad_line(
            "<http://a.com/x> <http://schema.org/price> \"9.99\"^^<http://www.w3.org/2001/XMLSchema#decimal> <http://a.com/page> .",
        )
        .unwrap();
        match q.value {
            Term::Literal {
                value, datatype, ..
            } => {
                assert_eq!(value, "9.99");
                assert_eq!(
                    datatype.as_deref(),
                    Some("http://www.w3.org/2001/XMLSchema#decimal")
                );
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn parse_literal_with_escaped_quote() {
        let q = parse_quad_line(
            r#"<http://a.com/x> <http://schema.org/name> "say \"hi\"" <http://a.com/page> ."#,
        )
        .unwrap();
        match q.value {
            Term::Literal { value, .. } => assert_eq!(value, r#"say \"hi\""#),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn roundtrip_through_to_line() {
        let line =
            "<http://a.com/x> <http://schema.org/name> \"Widget\"@en <http://a.com/page> .";
        let q = parse_quad_line(line).unwrap();
        assert_eq!(q.to_line(), line);
    }

    #[test]
    fn reject_missing_terminator() {
        let err = parse_quad_line(
            "<http://a.com/x> <http://schema.org/url> <http://a.com/y> <http://a.com/page>",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::MissingTerminator);
    }

    #[test]
    fn reject_literal_subject() {
        let err = parse_quad_line(
            "\"oops\" <http://schema.org/url> <http://a.com/y> <http://a.com/page> .",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::BadSubject);
    }

    #[test]
    fn reject_literal_graph() {
        let err = parse_quad_line(
            "<http://a.com/x> <http://schema.org/name> \"a\" \"not a graph\" .",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::BadGraph);
    }

    #[test]
    fn reject_empty_line() {
        assert_eq!(parse_quad_line("   ").unwrap_err(), ParseError::EmptyLine);
    }

    #[test]
    fn reject_truncated_line() {
        let err = parse_quad_line("<http://a.com/x> <http://schema.org/url>").unwrap_err();
        assert_eq!(err, ParseError::MissingTerm);
    }

    #[test]
    fn clean_line_strips_non_ascii() {
        assert_eq!(clean_line("abc\u{4e2d}def"), "abcdef");
    }

    #[test]
    fn clean_line_rewrites_region_lang_tags() {
        let line = "<http://a.com/x> <http://schema.org/name> \"hi\"@en_US <http://a.com/page> .";
        let cleaned = clean_line(line);
        assert!(cleaned.contains("\"hi\"@en "));
        let q = parse_quad_line(&cleaned).unwrap();
        match q.value {
            Term::Literal { lang, .. } => assert_eq!(lang.as_deref(), Some("en")),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn clean_line_leaves_plain_lines_alone() {
        let line = "<http://a.com/x> <http://schema.org/url> <http://a.com/y> <http://a.com/page> .";
        assert_eq!(clean_line(line), line);
    }
}
