//! Request-path resolution state machine.

use std::path::{Component, Path, PathBuf};

use mdserve_renderer::MarkdownEngine;

use crate::indexer::build_listing;
use crate::meta::{LocationMeta, load_meta};
use crate::mime::content_type_for;
use crate::template::PageTemplate;
use crate::tree::LocationNode;

/// A request path resolved against the content root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntity {
    /// Content type derived from the path extension.
    pub content_type: String,
    /// Absolute filesystem location.
    pub location: PathBuf,
    /// URL route below the prefix, with leading slash.
    pub route: String,
}

/// Live request properties the indexer needs for absolute links.
#[derive(Clone, Copy, Debug)]
pub struct RequestContext<'a> {
    /// Request scheme (`http` or `https`).
    pub scheme: &'a str,
    /// Request host, including any port.
    pub host: &'a str,
}

/// Outcome of resolving a request path.
///
/// Expected branches are values here; resolution only errors when the
/// directory indexer cannot find its node in the location tree.
#[derive(Debug)]
pub enum Resolution {
    /// Serve the file's bytes from disk with the given content type.
    Raw {
        /// File to stream.
        location: PathBuf,
        /// Response content type.
        content_type: String,
        /// Optional `Content-Disposition` value.
        disposition: Option<String>,
    },
    /// Serve bytes produced by the custom file-serving hook.
    Body {
        /// Response body.
        bytes: Vec<u8>,
        /// Response content type.
        content_type: String,
        /// Optional `Content-Disposition` value.
        disposition: Option<String>,
    },
    /// Serve a rendered HTML page.
    Page {
        /// Complete page HTML with the template applied.
        html: String,
        /// Optional `Content-Disposition` value.
        disposition: Option<String>,
    },
    /// Nothing servable at this path.
    NotFound,
}

/// Error escalated to an internal server error.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A directory being indexed has no node in the location tree.
    #[error("location missing from tree: {}", .0.display())]
    TreeLookup(PathBuf),
}

/// Rewrites the resolved entity before metadata lookup.
pub type LocationHook = dyn Fn(FileEntity) -> FileEntity + Send + Sync;

/// Produces the response body for a file, bypassing the engine entirely.
pub type FileHook = dyn Fn(&FileEntity) -> Vec<u8> + Send + Sync;

/// Resolver configuration.
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Content root directory.
    pub root: PathBuf,
    /// URL prefix stripped from request paths (empty for the site root).
    pub prefix: String,
    /// Metadata sidecar extension; requests for it are never servable.
    pub meta_ext: String,
    /// Disable the default indexing policy for directories without an
    /// explicit `indexed` override.
    pub disable_default_indexing: bool,
}

impl ResolverConfig {
    /// Configuration with defaults for a content root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: String::new(),
            meta_ext: ".meta".to_owned(),
            disable_default_indexing: false,
        }
    }

    /// Set the URL prefix (normalized to a leading slash, no trailing).
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        self.prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    /// Set the metadata sidecar extension.
    #[must_use]
    pub fn with_meta_ext(mut self, meta_ext: impl Into<String>) -> Self {
        self.meta_ext = meta_ext.into();
        self
    }

    /// Disable indexing for directories without an explicit override.
    #[must_use]
    pub fn with_default_indexing_disabled(mut self, disabled: bool) -> Self {
        self.disable_default_indexing = disabled;
        self
    }
}

/// Maps request paths to servable content.
///
/// Holds the engine, template and location tree built at startup; each
/// call performs its own filesystem checks and shares no mutable state
/// with concurrent calls.
pub struct ContentResolver {
    config: ResolverConfig,
    engine: MarkdownEngine,
    template: PageTemplate,
    tree: Option<LocationNode>,
    location_hook: Option<Box<LocationHook>>,
    file_hook: Option<Box<FileHook>>,
}

impl ContentResolver {
    /// Create a resolver over prebuilt collaborators.
    #[must_use]
    pub fn new(
        config: ResolverConfig,
        engine: MarkdownEngine,
        template: PageTemplate,
        tree: Option<LocationNode>,
    ) -> Self {
        Self {
            config,
            engine,
            template,
            tree,
            location_hook: None,
            file_hook: None,
        }
    }

    /// Install a location-rewrite hook, applied before metadata lookup.
    #[must_use]
    pub fn with_location_hook(
        mut self,
        hook: impl Fn(FileEntity) -> FileEntity + Send + Sync + 'static,
    ) -> Self {
        self.location_hook = Some(Box::new(hook));
        self
    }

    /// Install a custom file-serving hook, bypassing the engine for files.
    #[must_use]
    pub fn with_file_hook(
        mut self,
        hook: impl Fn(&FileEntity) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.file_hook = Some(Box::new(hook));
        self
    }

    /// Resolve a request path to a servable outcome.
    ///
    /// Filesystem and metadata failures on expected branches read as
    /// "absent" and terminate in [`Resolution::NotFound`]; only the
    /// indexer's tree lookup miss is an error.
    pub fn resolve(
        &self,
        request_path: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Resolution, ResolveError> {
        let route = self.strip_prefix(request_path);
        let ext = path_extension(&route);
        // The sidecar extension is never servable directly.
        if ext == self.config.meta_ext {
            return Ok(Resolution::NotFound);
        }

        let relative = route.trim_start_matches('/');
        if has_parent_components(relative) {
            return Ok(Resolution::NotFound);
        }

        let entity = FileEntity {
            content_type: content_type_for(&ext).to_owned(),
            location: self.config.root.join(relative),
            route,
        };
        let entity = match &self.location_hook {
            Some(hook) => hook(entity),
            None => entity,
        };

        let meta = load_meta(&entity.location, &self.config.meta_ext);
        if meta.hidden {
            tracing::debug!(route = %entity.route, "Hidden location requested");
            return Ok(Resolution::NotFound);
        }

        let Ok(stat) = std::fs::symlink_metadata(&entity.location) else {
            return Ok(Resolution::NotFound);
        };

        if stat.is_file() {
            return Ok(self.resolve_file(entity, &meta));
        }
        if stat.is_dir() {
            return self.resolve_directory(&entity, &meta, ctx);
        }
        // Symlinks, devices and anything else are not servable.
        Ok(Resolution::NotFound)
    }

    fn resolve_file(&self, entity: FileEntity, meta: &LocationMeta) -> Resolution {
        let disposition = meta.disposition_header();

        if let Some(hook) = &self.file_hook {
            let bytes = hook(&entity);
            return Resolution::Body {
                bytes,
                content_type: entity.content_type,
                disposition,
            };
        }

        if entity.location.extension().is_some_and(|e| e == "md") {
            let title = meta.title.clone().unwrap_or_else(|| {
                entity
                    .location
                    .file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
            });
            return self.render_page(&entity.location, &title, disposition);
        }

        Resolution::Raw {
            location: entity.location,
            content_type: entity.content_type,
            disposition,
        }
    }

    fn resolve_directory(
        &self,
        entity: &FileEntity,
        meta: &LocationMeta,
        ctx: &RequestContext<'_>,
    ) -> Result<Resolution, ResolveError> {
        let index_html = entity.location.join("index.html");
        let index_md = entity.location.join("index.md");

        if index_html.is_file() {
            // Legacy convention: the disposition for the served HTML file
            // is keyed off the markdown-named sibling path.
            let index_meta = load_meta(&index_md, &self.config.meta_ext);
            return Ok(Resolution::Raw {
                location: index_html,
                content_type: "text/html".to_owned(),
                disposition: index_meta.disposition_header(),
            });
        }

        if index_md.is_file() {
            let index_meta = load_meta(&index_md, &self.config.meta_ext);
            let title = index_meta
                .title
                .clone()
                .unwrap_or_else(|| "Index".to_owned());
            return Ok(self.render_page(&index_md, &title, index_meta.disposition_header()));
        }

        let indexed = meta
            .indexed
            .unwrap_or(!self.config.disable_default_indexing);
        if !indexed {
            return Ok(Resolution::NotFound);
        }

        let node = self
            .tree
            .as_ref()
            .and_then(|tree| tree.find(&entity.location))
            .ok_or_else(|| ResolveError::TreeLookup(entity.location.clone()))?;
        let markdown = build_listing(node, ctx.scheme, ctx.host, &entity.route);
        let html = self.template.apply("Index", &self.engine.render(&markdown));
        Ok(Resolution::Page {
            html,
            disposition: None,
        })
    }

    fn render_page(&self, location: &Path, title: &str, disposition: Option<String>) -> Resolution {
        match std::fs::read_to_string(location) {
            Ok(content) => Resolution::Page {
                html: self.template.apply(title, &self.engine.render(&content)),
                disposition,
            },
            Err(error) => {
                tracing::warn!(location = %location.display(), %error, "Unreadable markdown source");
                Resolution::NotFound
            }
        }
    }

    /// Strip the configured prefix, keeping the leading slash.
    fn strip_prefix(&self, request_path: &str) -> String {
        let route = request_path
            .strip_prefix(&self.config.prefix)
            .unwrap_or(request_path);
        if route.starts_with('/') {
            route.to_owned()
        } else {
            format!("/{route}")
        }
    }
}

/// Extension of the final path segment, including the dot.
fn path_extension(route: &str) -> String {
    Path::new(route)
        .extension()
        .map_or_else(String::new, |ext| format!(".{}", ext.to_string_lossy()))
}

/// Reject routes that try to escape the content root.
fn has_parent_components(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdserve_renderer::EngineOptions;
    use pretty_assertions::assert_eq;

    use crate::tree::build_tree;

    const TEMPLATE: &str = "<title>%PAGE_TITLE%</title><main>%PAGE_CONTENT%</main>";

    fn ctx() -> RequestContext<'static> {
        RequestContext {
            scheme: "http",
            host: "example.com",
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("content");
            std::fs::create_dir_all(root.join("docs")).unwrap();
            std::fs::write(root.join("docs/guide.md"), "# Guide\n\nBody text.").unwrap();
            std::fs::write(root.join("report.pdf"), b"%PDF-1.4 fake").unwrap();
            Self { _dir: dir, root }
        }

        fn resolver(&self) -> ContentResolver {
            self.resolver_with(ResolverConfig::new(&self.root))
        }

        fn resolver_with(&self, config: ResolverConfig) -> ContentResolver {
            let tree = build_tree(&self.root, &config.prefix, &config.meta_ext);
            ContentResolver::new(
                config,
                MarkdownEngine::new(EngineOptions::default()),
                PageTemplate::from_string(TEMPLATE),
                tree,
            )
        }

        fn write(&self, rel: &str, content: &str) {
            std::fs::write(self.root.join(rel), content).unwrap();
        }
    }

    #[test]
    fn test_markdown_file_rendered_with_metadata_title() {
        let fx = Fixture::new();
        fx.write("docs/guide.md.meta", "title: Guide\n");

        let resolution = fx.resolver().resolve("/docs/guide.md", &ctx()).unwrap();
        let Resolution::Page { html, disposition } = resolution else {
            panic!("expected a rendered page");
        };
        assert!(html.contains("<title>Guide</title>"));
        assert!(html.contains(r#"<h1 class="md-heading">Guide</h1>"#));
        assert_eq!(disposition, None);
    }

    #[test]
    fn test_markdown_title_falls_back_to_base_name() {
        let fx = Fixture::new();
        let resolution = fx.resolver().resolve("/docs/guide.md", &ctx()).unwrap();
        let Resolution::Page { html, .. } = resolution else {
            panic!("expected a rendered page");
        };
        assert!(html.contains("<title>guide.md</title>"));
    }

    #[test]
    fn test_raw_file_with_attachment_disposition() {
        let fx = Fixture::new();
        fx.write(
            "report.pdf.meta",
            "file:\n  disposition: attachment\n  filename: report.pdf\n",
        );

        let resolution = fx.resolver().resolve("/report.pdf", &ctx()).unwrap();
        let Resolution::Raw {
            content_type,
            disposition,
            ..
        } = resolution
        else {
            panic!("expected raw file");
        };
        assert_eq!(content_type, "application/pdf");
        assert_eq!(
            disposition.as_deref(),
            Some("attachment; filename=\"report.pdf\"")
        );
    }

    #[test]
    fn test_hidden_file_is_not_found() {
        let fx = Fixture::new();
        fx.write("docs/guide.md.meta", "hidden: true\n");

        assert!(matches!(
            fx.resolver().resolve("/docs/guide.md", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_hidden_directory_wins_over_index_html() {
        let fx = Fixture::new();
        fx.write("docs/index.html", "<html>index</html>");
        fx.write("docs.meta", "hidden: true\n");

        assert!(matches!(
            fx.resolver().resolve("/docs", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_meta_extension_request_is_not_found() {
        let fx = Fixture::new();
        fx.write("docs/guide.md.meta", "title: Guide\n");

        assert!(matches!(
            fx.resolver().resolve("/docs/guide.md.meta", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.resolver().resolve("/nope.txt", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.resolver().resolve("/../secrets.txt", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_directory_with_index_html_served_raw() {
        let fx = Fixture::new();
        fx.write("docs/index.html", "<html>index</html>");

        let resolution = fx.resolver().resolve("/docs", &ctx()).unwrap();
        let Resolution::Raw {
            location,
            content_type,
            ..
        } = resolution
        else {
            panic!("expected raw index.html");
        };
        assert_eq!(location, fx.root.join("docs/index.html"));
        assert_eq!(content_type, "text/html");
    }

    #[test]
    fn test_index_html_disposition_keyed_off_index_md_path() {
        // The legacy convention: metadata attached to the markdown-named
        // path controls the disposition of the HTML file served raw.
        let fx = Fixture::new();
        fx.write("docs/index.html", "<html>index</html>");
        fx.write(
            "docs/index.md.meta",
            "file:\n  disposition: attachment\n  filename: index.html\n",
        );

        let resolution = fx.resolver().resolve("/docs", &ctx()).unwrap();
        let Resolution::Raw { disposition, .. } = resolution else {
            panic!("expected raw index.html");
        };
        assert_eq!(
            disposition.as_deref(),
            Some("attachment; filename=\"index.html\"")
        );
    }

    #[test]
    fn test_directory_with_index_md_rendered() {
        let fx = Fixture::new();
        fx.write("docs/index.md", "# Welcome");

        let resolution = fx.resolver().resolve("/docs", &ctx()).unwrap();
        let Resolution::Page { html, .. } = resolution else {
            panic!("expected rendered index.md");
        };
        assert!(html.contains("<title>Index</title>"));
        assert!(html.contains("Welcome"));
    }

    #[test]
    fn test_index_md_title_from_metadata() {
        let fx = Fixture::new();
        fx.write("docs/index.md", "# Welcome");
        fx.write("docs/index.md.meta", "title: Documentation\n");

        let resolution = fx.resolver().resolve("/docs", &ctx()).unwrap();
        let Resolution::Page { html, .. } = resolution else {
            panic!("expected rendered index.md");
        };
        assert!(html.contains("<title>Documentation</title>"));
    }

    #[test]
    fn test_unindexed_directory_is_not_found() {
        let fx = Fixture::new();
        fx.write("docs.meta", "indexed: false\n");

        assert!(matches!(
            fx.resolver().resolve("/docs", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_global_indexing_disabled_is_not_found() {
        let fx = Fixture::new();
        let config = ResolverConfig::new(&fx.root).with_default_indexing_disabled(true);

        assert!(matches!(
            fx.resolver_with(config).resolve("/docs", &ctx()).unwrap(),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_indexed_override_beats_global_disable() {
        let fx = Fixture::new();
        fx.write("docs.meta", "indexed: true\n");
        let config = ResolverConfig::new(&fx.root).with_default_indexing_disabled(true);

        let resolution = fx.resolver_with(config).resolve("/docs", &ctx()).unwrap();
        assert!(matches!(resolution, Resolution::Page { .. }));
    }

    #[test]
    fn test_directory_listing_links() {
        let fx = Fixture::new();
        let resolution = fx.resolver().resolve("/docs", &ctx()).unwrap();
        let Resolution::Page { html, .. } = resolution else {
            panic!("expected a listing page");
        };
        // Parent link for a non-root directory, plus one per child.
        assert!(html.contains(r#"<a href="http://example.com/">..</a>"#));
        assert!(html.contains(r#"<a href="http://example.com/docs/guide.md">guide.md</a>"#));
        assert!(html.contains(r#"<h2 class="md-heading">Index</h2>"#));
    }

    #[test]
    fn test_root_listing_has_no_parent_link() {
        let fx = Fixture::new();
        let resolution = fx.resolver().resolve("/", &ctx()).unwrap();
        let Resolution::Page { html, .. } = resolution else {
            panic!("expected a listing page");
        };
        assert!(!html.contains(">..</a>"));
        assert!(html.contains("docs"));
    }

    #[test]
    fn test_tree_lookup_miss_is_internal_error() {
        let fx = Fixture::new();
        let config = ResolverConfig::new(&fx.root);
        let resolver = ContentResolver::new(
            config,
            MarkdownEngine::new(EngineOptions::default()),
            PageTemplate::from_string(TEMPLATE),
            None,
        );

        assert!(matches!(
            resolver.resolve("/docs", &ctx()),
            Err(ResolveError::TreeLookup(_))
        ));
    }

    #[test]
    fn test_prefix_stripped_before_resolution() {
        let fx = Fixture::new();
        let config = ResolverConfig::new(&fx.root).with_prefix("/content");

        let resolution = fx
            .resolver_with(config)
            .resolve("/content/docs/guide.md", &ctx())
            .unwrap();
        assert!(matches!(resolution, Resolution::Page { .. }));
    }

    #[test]
    fn test_location_hook_rewrites_before_metadata() {
        let fx = Fixture::new();
        fx.write("docs/actual.md", "# Actual");
        let root = fx.root.clone();
        let resolver = fx.resolver().with_location_hook(move |mut entity| {
            entity.location = root.join("docs/actual.md");
            entity
        });

        let resolution = resolver.resolve("/docs/alias.md", &ctx()).unwrap();
        let Resolution::Page { html, .. } = resolution else {
            panic!("expected rewritten page");
        };
        assert!(html.contains("Actual"));
    }

    #[test]
    fn test_file_hook_bypasses_engine() {
        let fx = Fixture::new();
        let resolver = fx
            .resolver()
            .with_file_hook(|entity| entity.route.clone().into_bytes());

        let resolution = resolver.resolve("/docs/guide.md", &ctx()).unwrap();
        let Resolution::Body {
            bytes,
            content_type,
            ..
        } = resolution
        else {
            panic!("expected hook body");
        };
        assert_eq!(bytes, b"/docs/guide.md");
        assert_eq!(content_type, "text/markdown");
    }
}
