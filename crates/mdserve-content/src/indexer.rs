//! Synthesized directory listings.
//!
//! When an indexed directory has no explicit index file, a markdown
//! listing page is built from the location tree and rendered through the
//! engine like any other document.

use crate::tree::LocationNode;

/// Build the synthetic markdown listing for a directory node.
///
/// Links are absolute external URLs built from the live request's scheme
/// and host so listings work under any mounted prefix or reverse-proxy
/// scheme. `route` is the request's URL path, used for the parent link.
#[must_use]
pub fn build_listing(node: &LocationNode, scheme: &str, host: &str, route: &str) -> String {
    let mut links = Vec::with_capacity(node.children.len() + 1);
    if !node.is_root {
        let parent = url_dirname(route);
        links.push(format!("- [..]({scheme}://{host}{parent})"));
    }
    for child in &node.children {
        links.push(format!(
            "- [{}]({scheme}://{host}{})",
            child.name, child.relative_path
        ));
    }
    format!("# {}\r\n\r\n## Index\r\n\r\n{}", node.name, links.join("\r\n"))
}

/// Parent directory of a URL path.
fn url_dirname(route: &str) -> &str {
    let trimmed = route.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &trimmed[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn node(name: &str, is_root: bool, children: Vec<LocationNode>) -> LocationNode {
        LocationNode {
            name: name.to_owned(),
            is_root,
            path: PathBuf::from(format!("/content/{name}")),
            relative_path: format!("/{name}"),
            children,
        }
    }

    #[test]
    fn test_url_dirname() {
        assert_eq!(url_dirname("/a/b"), "/a");
        assert_eq!(url_dirname("/a/b/"), "/a");
        assert_eq!(url_dirname("/a"), "/");
        assert_eq!(url_dirname("/"), "/");
    }

    #[test]
    fn test_listing_for_nested_directory() {
        let dir = node(
            "docs",
            false,
            vec![node("guide.md", false, Vec::new()), node("inner", false, Vec::new())],
        );
        let listing = build_listing(&dir, "https", "example.com", "/docs");

        assert!(listing.starts_with("# docs\r\n\r\n## Index\r\n\r\n"));
        assert!(listing.contains("- [..](https://example.com/)"));
        assert!(listing.contains("- [guide.md](https://example.com/guide.md)"));
        assert!(listing.contains("- [inner](https://example.com/inner)"));
    }

    #[test]
    fn test_root_listing_has_no_parent_link() {
        let root = node("content", true, vec![node("a.md", false, Vec::new())]);
        let listing = build_listing(&root, "http", "localhost:8080", "/");

        assert!(!listing.contains("[..]"));
        assert!(listing.contains("- [a.md](http://localhost:8080/a.md)"));
    }

    #[test]
    fn test_empty_directory_listing() {
        let dir = node("empty", false, Vec::new());
        let listing = build_listing(&dir, "http", "h", "/empty");
        assert!(listing.contains("## Index"));
        assert!(listing.contains("- [..](http://h/)"));
    }
}
