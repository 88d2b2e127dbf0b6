//! Directory-listing pages and the tree they describe.
//!
//! Parsing turns an auto-generated "index of" page into flat [`Entry`] values.
//! Traversal code works on [`ListingNode`] trees so matching rules can be
//! tested without any markup or network.

use regex::Regex;
use std::sync::OnceLock;

/// One child reference from a listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

impl Entry {
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }

    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }
}

/// Entries parsed from one fetch of a registry location.
///
/// Entries keep page order and are not deduplicated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<Entry>,
}

impl Listing {
    #[must_use]
    pub const fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Parse the anchors of an HTML directory index
    #[must_use]
    pub fn parse_html(body: &str) -> Self {
        let entries = href_pattern()
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .filter_map(|href| parse_href(href.as_str()))
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn directories(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_dir)
    }

    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_dir)
    }
}

/// A node in a registry tree: a name, a directory flag, and children.
///
/// Children are only populated for directories that were actually fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingNode {
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<ListingNode>,
}

impl ListingNode {
    /// Directory node whose children are the (unfetched) entries of `listing`
    #[must_use]
    pub fn from_listing(name: impl Into<String>, listing: &Listing) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            children: listing.entries.iter().map(Self::from).collect(),
        }
    }

    #[must_use]
    pub fn dir(name: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            children,
        }
    }

    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            children: Vec::new(),
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter(|c| !c.is_dir)
    }

    pub fn directories(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter(|c| c.is_dir)
    }
}

impl From<&Entry> for ListingNode {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            is_dir: entry.is_dir,
            children: Vec::new(),
        }
    }
}

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#)
            .expect("href pattern is a valid regex")
    })
}

/// Turn one raw `href` into an immediate-child entry, or `None` for
/// navigation, sort links and anything that is not a direct child.
fn parse_href(raw: &str) -> Option<Entry> {
    let href = raw.trim().replace("&amp;", "&");
    let href = href.strip_prefix("./").unwrap_or(&href);

    if href.is_empty()
        || href.starts_with('?')
        || href.starts_with('#')
        || href.starts_with('/')
        || href.contains("://")
    {
        return None;
    }

    let is_dir = href.ends_with('/');
    let name = href.trim_end_matches('/');

    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return None;
    }

    Some(Entry {
        name: name.to_string(),
        is_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const APACHE_INDEX: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">
<html>
 <head><title>Index of /vault/ganglia_reg</title></head>
 <body>
<h1>Index of /vault/ganglia_reg</h1>
<table>
<tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
<tr><td><a href="/vault/">Parent Directory</a></td></tr>
<tr><td><a href="1.2/">1.2/</a></td><td>2024-05-01 10:00</td></tr>
<tr><td><a href="2.0/">2.0/</a></td><td>2024-06-01 10:00</td></tr>
<tr><td><a href="latest/">latest/</a></td><td>2024-07-01 10:00</td></tr>
<tr><td><a href="versions.txt">versions.txt</a></td><td>2024-07-01 10:00</td></tr>
</table>
</body></html>"#;

    const NGINX_INDEX: &str = r#"<html>
<head><title>Index of /latest/</title></head>
<body>
<h1>Index of /latest/</h1><hr><pre><a href="../">../</a>
<a href="ganglia-2.0.tar">ganglia-2.0.tar</a>                                    01-Jul-2024 10:00     1048576
<a href="readme.txt">readme.txt</a>                                         01-Jul-2024 10:00         120
<a href="extra/">extra/</a>                                             01-Jul-2024 10:00           -
</pre><hr></body>
</html>"#;

    #[test]
    fn test_parse_apache_index() {
        let listing = Listing::parse_html(APACHE_INDEX);
        assert_eq!(
            listing.entries,
            vec![
                Entry::dir("1.2"),
                Entry::dir("2.0"),
                Entry::dir("latest"),
                Entry::file("versions.txt"),
            ]
        );
    }

    #[test]
    fn test_parse_nginx_index() {
        let listing = Listing::parse_html(NGINX_INDEX);
        let files: Vec<&str> = listing.files().map(|e| e.name.as_str()).collect();
        let dirs: Vec<&str> = listing.directories().map(|e| e.name.as_str()).collect();
        assert_eq!(files, vec!["ganglia-2.0.tar", "readme.txt"]);
        assert_eq!(dirs, vec!["extra"]);
    }

    #[test]
    fn test_navigation_refs_discarded() {
        for href in ["../", "./", ".", "..", "/", "?C=S;O=A", "#top", "https://other/x/"] {
            assert_eq!(parse_href(href), None, "{href} should be discarded");
        }
    }

    #[test]
    fn test_leading_dot_slash_stripped() {
        assert_eq!(parse_href("./nginx:1.25"), Some(Entry::file("nginx:1.25")));
        assert_eq!(parse_href("./sub/"), Some(Entry::dir("sub")));
    }

    #[test]
    fn test_case_and_duplicates_preserved() {
        let body = r#"<a href="Image.TAR">a</a><a href='image.tar'>b</a><a href="image.tar">c</a>"#;
        let listing = Listing::parse_html(body);
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Image.TAR", "image.tar", "image.tar"]);
    }

    #[test]
    fn test_nested_paths_are_not_children() {
        assert_eq!(parse_href("a/b/"), None);
        assert_eq!(parse_href("a/b.tar"), None);
    }

    #[test]
    fn test_tree_from_listing() {
        let listing = Listing::parse_html(NGINX_INDEX);
        let node = ListingNode::from_listing("latest", &listing);
        assert!(node.is_dir);
        assert_eq!(node.files().count(), 2);
        assert_eq!(node.directories().count(), 1);
        assert!(node.directories().all(|d| d.children.is_empty()));
    }

    #[test]
    fn test_empty_body() {
        assert!(Listing::parse_html("").is_empty());
        assert!(Listing::parse_html("<html><body>nothing</body></html>").is_empty());
    }
}
