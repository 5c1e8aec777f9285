//! URL values.
//!
//! A bookmark URL is either absolute text, or relative text plus a base URL it resolves against.
//! Bases can themselves be relative, forming a chain. The absolute form is only computed when
//! asked for, by walking the chain from its root.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

#[derive(Clone, Debug, PartialEq)]
pub enum Url {
    Absolute(String),
    Relative { base: Arc<Url>, relative: String },
}

impl Url {
    /// An absolute URL.
    pub fn new(text: impl Into<String>) -> Url {
        Url::Absolute(text.into())
    }

    /// A URL relative to `base`. Passing an `Arc` lets several URLs share one base, which is
    /// kept when encoding.
    pub fn with_base(base: impl Into<Arc<Url>>, relative: impl Into<String>) -> Url {
        Url::Relative {
            base: base.into(),
            relative: relative.into(),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Url::Relative { .. })
    }

    pub fn base(&self) -> Option<&Arc<Url>> {
        match self {
            Url::Absolute(_) => None,
            Url::Relative { base, .. } => Some(base),
        }
    }

    /// The text stored for this URL alone: the whole URL when absolute, otherwise the relative
    /// part.
    pub fn text(&self) -> &str {
        match self {
            Url::Absolute(text) => text,
            Url::Relative { relative, .. } => relative,
        }
    }

    /// Number of URLs in the chain, this one included.
    pub fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut cur = self;
        while let Url::Relative { base, .. } = cur {
            len += 1;
            cur = base;
        }
        len
    }

    /// Resolve the chain into absolute URL text.
    pub fn absolute(&self) -> String {
        let mut chain = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Url::Absolute(text) => {
                    chain.push(text.as_str());
                    break;
                }
                Url::Relative { base, relative } => {
                    chain.push(relative.as_str());
                    cur = base;
                }
            }
        }
        let mut parts = chain.into_iter().rev();
        let root = parts.next().unwrap_or_default().to_string();
        parts.fold(root, |base, rel| resolve_reference(&base, rel))
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.absolute())
    }
}

impl From<&str> for Url {
    fn from(text: &str) -> Url {
        Url::new(text)
    }
}

impl From<String> for Url {
    fn from(text: String) -> Url {
        Url::new(text)
    }
}

struct Parts<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(([^:/?#]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?$")
            .expect("URI reference pattern is valid")
    })
}

fn split(text: &str) -> Parts {
    // Every string matches: all groups but the path are optional, and the path takes anything
    // before '?' or '#'.
    match uri_pattern().captures(text) {
        Some(caps) => Parts {
            scheme: caps.get(2).map(|m| m.as_str()),
            authority: caps.get(4).map(|m| m.as_str()),
            path: caps.get(5).map_or("", |m| m.as_str()),
            query: caps.get(7).map(|m| m.as_str()),
            fragment: caps.get(9).map(|m| m.as_str()),
        },
        None => Parts {
            scheme: None,
            authority: None,
            path: text,
            query: None,
            fragment: None,
        },
    }
}

/// Resolve a URI reference against a base URI.
pub fn resolve_reference(base: &str, reference: &str) -> String {
    let b = split(base);
    let r = split(reference);

    let (scheme, authority, path, query) = if r.scheme.is_some() {
        (r.scheme, r.authority, remove_dot_segments(r.path), r.query)
    } else if r.authority.is_some() {
        (b.scheme, r.authority, remove_dot_segments(r.path), r.query)
    } else if r.path.is_empty() {
        (b.scheme, b.authority, b.path.to_string(), r.query.or(b.query))
    } else if r.path.starts_with('/') {
        (b.scheme, b.authority, remove_dot_segments(r.path), r.query)
    } else {
        let merged = merge(&b, r.path);
        (b.scheme, b.authority, remove_dot_segments(&merged), r.query)
    };

    let mut out = String::with_capacity(base.len() + reference.len());
    if let Some(scheme) = scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(authority) = authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(&path);
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = r.fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn merge(base: &Parts, path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        format!("/{}", path)
    } else {
        match base.path.rfind('/') {
            Some(i) => format!("{}{}", &base.path[..=i], path),
            None => path.to_string(),
        }
    }
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(i) => output.truncate(i),
        None => output.clear(),
    }
}

fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());
    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }
    output
}

#[cfg(test)]
mod test {
    use super::*;

    const BASE: &str = "http://a/b/c/d;p?q";

    #[test]
    fn normal_examples() {
        let cases = [
            ("g:h", "g:h"),
            ("g", "http://a/b/c/g"),
            ("./g", "http://a/b/c/g"),
            ("g/", "http://a/b/c/g/"),
            ("/g", "http://a/g"),
            ("//g", "http://g"),
            ("?y", "http://a/b/c/d;p?y"),
            ("g?y", "http://a/b/c/g?y"),
            ("#s", "http://a/b/c/d;p?q#s"),
            ("g#s", "http://a/b/c/g#s"),
            (";x", "http://a/b/c/;x"),
            ("", "http://a/b/c/d;p?q"),
            (".", "http://a/b/c/"),
            ("./", "http://a/b/c/"),
            ("..", "http://a/b/"),
            ("../g", "http://a/b/g"),
            ("../..", "http://a/"),
            ("../../g", "http://a/g"),
        ];
        for (reference, expected) in cases {
            assert_eq!(resolve_reference(BASE, reference), expected, "{}", reference);
        }
    }

    #[test]
    fn abnormal_examples() {
        let cases = [
            ("../../../g", "http://a/g"),
            ("/./g", "http://a/g"),
            ("/../g", "http://a/g"),
            ("g.", "http://a/b/c/g."),
            ("..g", "http://a/b/c/..g"),
            ("./g/.", "http://a/b/c/g/"),
            ("g/./h", "http://a/b/c/g/h"),
            ("g/../h", "http://a/b/c/h"),
            ("g;x=1/../y", "http://a/b/c/y"),
        ];
        for (reference, expected) in cases {
            assert_eq!(resolve_reference(BASE, reference), expected, "{}", reference);
        }
    }

    #[test]
    fn empty_authority_base() {
        // file: URLs keep an empty authority, which has to survive resolution
        let base = "file:///Users/bob/";
        let cases = [
            ("", "file:///Users/bob/"),
            (".", "file:///Users/bob/"),
            ("..", "file:///Users/"),
            ("./g/../h", "file:///Users/bob/h"),
            ("../../../../x", "file:///x"),
            ("/etc", "file:///etc"),
            ("?q", "file:///Users/bob/?q"),
            ("#f", "file:///Users/bob/#f"),
            ("g;x?y#s", "file:///Users/bob/g;x?y#s"),
            ("//host/p", "file://host/p"),
            ("http://other/x", "http://other/x"),
        ];
        for (reference, expected) in cases {
            assert_eq!(resolve_reference(base, reference), expected, "{}", reference);
        }
    }

    #[test]
    fn empty_base_path() {
        assert_eq!(
            resolve_reference("https://www.reddit.com", "r/"),
            "https://www.reddit.com/r/"
        );
    }

    #[test]
    fn chain() {
        let root = Url::new("https://www.reddit.com");
        let mid = Url::with_base(root, "r/");
        let leaf = Url::with_base(mid.clone(), "ProgrammerHumor/");
        assert_eq!(leaf.chain_len(), 3);
        assert_eq!(
            leaf.absolute(),
            "https://www.reddit.com/r/ProgrammerHumor/"
        );
        assert_eq!(leaf.absolute(), leaf.absolute());
        assert_eq!(
            leaf.absolute(),
            resolve_reference(&mid.absolute(), leaf.text())
        );
        assert_eq!(leaf.text(), "ProgrammerHumor/");
    }

    #[test]
    fn file_urls() {
        let volume = Url::new("file:///System/Volumes/Data/");
        let home = Url::with_base(volume, "Users/bob/");
        let file = Url::with_base(home, "../alice/notes.txt");
        assert_eq!(
            file.absolute(),
            "file:///System/Volumes/Data/Users/alice/notes.txt"
        );
    }
}
