//! Vocabulary namespace and local-name helpers for predicate and class IRIs.

/// The namespace portion of an IRI: everything up to and including the last
/// `#`, or failing that the last `/`. An IRI with neither is its own
/// namespace.
pub fn namespace(iri: &str) -> &str {
    if let Some(pos) = iri.rfind('#') {
        return &iri[..=pos];
    }
    if let Some(pos) = iri.rfind('/') {
        return &iri[..=pos];
    }
    iri
}

/// The part of an IRI after the last `/`. Used when qualifying a property
/// with its subject's class; matches the upstream convention of splitting on
/// slashes only, so hash-namespaced predicates keep their fragment intact.
pub fn local_name(iri: &str) -> &str {
    match iri.rfind('/') {
        Some(pos) => &iri[pos + 1..],
        None => iri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_hash() {
        assert_eq!(
            namespace("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        );
    }

    #[test]
    fn namespace_slash() {
        assert_eq!(namespace("http://schema.org/Product"), "http://schema.org/");
    }

    #[test]
    fn namespace_prefers_hash_over_slash() {
        assert_eq!(
            namespace("http://example.com/vocab#Thing"),
            "http://example.com/vocab#"
        );
    }

    #[test]
    fn namespace_without_separator() {
        assert_eq!(namespace("urn:x"), "urn:x");
    }

    #[test]
    fn local_name_after_slash() {
        assert_eq!(local_name("http://schema.org/name"), "name");
    }

    #[test]
    fn local_name_keeps_fragment() {
        assert_eq!(
            local_name("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            "22-rdf-syntax-ns#type"
        );
    }
}
