//! Symbolic query grammar: `<kind>:<target>[:<start>-<end>]`.

use std::fmt;

/// The four supported retrieval kinds. Anything else resolves to the
/// deterministic not-found snippet rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// `file:<name>` with an optional 1-based line range suffix.
    File {
        name: String,
        range: Option<(usize, usize)>,
    },
    /// `function-lookup:<name>`: a `fn` definition.
    FunctionLookup { name: String },
    /// `type-lookup:<name>`: a struct/enum/trait definition.
    TypeLookup { name: String },
    /// `keyword-search:<term>`: up to 3 matching lines with context.
    KeywordSearch { term: String },
    /// Unrecognized kind, preserved verbatim for the placeholder.
    Unknown { raw: String },
}

impl Query {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("file:") {
            let (name, range) = split_range(rest);
            return Query::File {
                name: name.to_string(),
                range,
            };
        }
        if let Some(name) = raw.strip_prefix("function-lookup:") {
            return Query::FunctionLookup {
                name: name.trim().to_string(),
            };
        }
        if let Some(name) = raw.strip_prefix("type-lookup:") {
            return Query::TypeLookup {
                name: name.trim().to_string(),
            };
        }
        if let Some(term) = raw.strip_prefix("keyword-search:") {
            return Query::KeywordSearch {
                term: term.trim().to_string(),
            };
        }
        Query::Unknown {
            raw: raw.to_string(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File {
                name,
                range: Some((s, e)),
            } => write!(f, "file:{name}:{s}-{e}"),
            Self::File { name, range: None } => write!(f, "file:{name}"),
            Self::FunctionLookup { name } => write!(f, "function-lookup:{name}"),
            Self::TypeLookup { name } => write!(f, "type-lookup:{name}"),
            Self::KeywordSearch { term } => write!(f, "keyword-search:{term}"),
            Self::Unknown { raw } => write!(f, "{raw}"),
        }
    }
}

/// Split `name[:start-end]`. A malformed range is treated as absent so
/// the file still resolves (same snippet as the rangeless query).
fn split_range(rest: &str) -> (&str, Option<(usize, usize)>) {
    if let Some((name, range_str)) = rest.rsplit_once(':') {
        if let Some((s, e)) = range_str.split_once('-') {
            if let (Ok(start), Ok(end)) = (s.trim().parse(), e.trim().parse()) {
                return (name, Some((start, end)));
            }
        }
    }
    (rest, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file() {
        assert_eq!(
            Query::parse("file:routing.rs"),
            Query::File {
                name: "routing.rs".into(),
                range: None
            }
        );
        assert_eq!(
            Query::parse("file:routing.rs:10-50"),
            Query::File {
                name: "routing.rs".into(),
                range: Some((10, 50))
            }
        );
    }

    #[test]
    fn test_parse_lookups() {
        assert_eq!(
            Query::parse("function-lookup:route_ticket"),
            Query::FunctionLookup {
                name: "route_ticket".into()
            }
        );
        assert_eq!(
            Query::parse("type-lookup:Ticket"),
            Query::TypeLookup {
                name: "Ticket".into()
            }
        );
        assert_eq!(
            Query::parse("keyword-search:escalation"),
            Query::KeywordSearch {
                term: "escalation".into()
            }
        );
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert_eq!(
            Query::parse("grep:foo"),
            Query::Unknown {
                raw: "grep:foo".into()
            }
        );
    }

    #[test]
    fn test_malformed_range_falls_back_to_whole_file() {
        assert_eq!(
            Query::parse("file:routing.rs:abc"),
            Query::File {
                name: "routing.rs:abc".into(),
                range: None
            }
        );
    }

    #[test]
    fn test_display_roundtrip() {
        for raw in [
            "file:routing.rs",
            "file:routing.rs:1-20",
            "function-lookup:score",
            "type-lookup:Rule",
            "keyword-search:audit",
        ] {
            assert_eq!(Query::parse(raw).to_string(), raw);
        }
    }
}
