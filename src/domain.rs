//! Pay-level-domain extraction from page URLs.
//!
//! A pay-level domain is the registrable domain under a public suffix
//! (`shop.example.co.uk` -> `example.co.uk`). The table below covers the
//! multi-label suffixes that actually show up in web-crawl corpora; anything
//! else falls back to the last two labels.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Multi-label public suffixes. A host ending in one of these keeps three
/// labels instead of two.
static SECOND_LEVEL_SUFFIXES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk", "com.au", "net.au", "org.au",
        "co.jp", "ne.jp", "or.jp", "co.nz", "net.nz", "org.nz", "com.br", "net.br", "org.br",
        "co.za", "com.mx", "com.ar", "com.cn", "com.tw", "co.in", "co.kr", "com.sg", "com.tr",
        "com.hk", "com.my", "co.th", "com.vn", "com.ua", "co.il", "com.pl", "net.pl", "org.pl",
    ]
    .into_iter()
    .collect()
});

/// Resolves the pay-level domain of a whole URL. Returns `None` when the URL
/// has no usable host; callers drop the URL from aggregation in that case.
pub fn pay_level_domain(url: &str) -> Option<String> {
    let host = host_of(url)?;
    let host = host.to_ascii_lowercase();

    if host.is_empty() || host.parse::<std::net::Ipv4Addr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return None;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if SECOND_LEVEL_SUFFIXES.contains(last_two.as_str()) {
        if labels.len() < 3 {
            // the host *is* a public suffix
            return None;
        }
        return Some(labels[labels.len() - 3..].join("."));
    }
    Some(last_two)
}

/// The host portion of a URL: after the scheme and userinfo, before any
/// port, path, query, or fragment.
fn host_of(url: &str) -> Option<&str> {
    let rest = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url,
    };
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .filter(|s| !s.is_empty())?;
    let host = match authority.rfind('@') {
        Some(pos) => &authority[pos + 1..],
        None => authority,
    };
    let host = match host.find(':') {
        Some(pos) => &host[..pos],
        None => host,
    };
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_host() {
        assert_eq!(
            pay_level_domain("http://example.com/page"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn subdomain_is_stripped() {
        assert_eq!(
            pay_level_domain("https://shop.catalog.example.com/p/1"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn second_level_suffix_keeps_three_labels() {
        assert_eq!(
            pay_level_domain("http://www.example.co.uk/about"),
            Some("example.co.uk".to_string())
        );
    }

    #[test]
    fn port_and_query_ignored() {
        assert_eq!(
            pay_level_domain("http://example.com:8080/x?y=z#frag"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn userinfo_ignored() {
        assert_eq!(
            pay_level_domain("http://user:pw@example.com/"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn case_is_normalized() {
        assert_eq!(
            pay_level_domain("http://WWW.Example.COM/"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn bare_tld_rejected() {
        assert_eq!(pay_level_domain("http://com/"), None);
        assert_eq!(pay_level_domain("http://co.uk/"), None);
    }

    #[test]
    fn ipv4_rejected() {
        assert_eq!(pay_level_domain("http://192.168.0.1/page"), None);
    }

    #[test]
    fn garbage_rejected() {
        assert_eq!(pay_level_domain(""), None);
        assert_eq!(pay_level_domain("http://"), None);
        assert_eq!(pay_level_domain("not a url at all"), None);
    }

    #[test]
    fn empty_label_rejected() {
        assert_eq!(pay_level_domain("http://example..com/"), None);
    }
}
