//! Content resolution for the mdserve server.
//!
//! Maps a request path onto the content root and decides how to serve it:
//! raw bytes, a rendered markdown page, a synthesized directory listing,
//! or not-found. Per-location metadata sidecar files override visibility,
//! titles, dispositions and indexing policy.
//!
//! # Architecture
//!
//! [`ContentResolver`] is the state machine at the center: it derives a
//! [`FileEntity`] from the request path, consults [`LocationMeta`] loaded
//! from YAML sidecars, and dispatches to raw serving, the markdown engine
//! or the directory indexer. All expected outcomes are [`Resolution`]
//! values; only a location-tree lookup miss during indexing is an error.
//!
//! The location tree and the engine's extension patterns are built once
//! at startup and threaded in explicitly — nothing here reads globals,
//! and resolution holds no mutable state across requests.

mod indexer;
mod meta;
mod mime;
mod resolver;
mod template;
mod tree;

pub use indexer::build_listing;
pub use meta::{FileAttachment, LocationMeta, load_meta};
pub use mime::content_type_for;
pub use resolver::{
    ContentResolver, FileEntity, RequestContext, ResolveError, Resolution, ResolverConfig,
};
pub use template::PageTemplate;
pub use tree::{LocationNode, build_tree};
