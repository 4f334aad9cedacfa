//! Per-location metadata via YAML sidecar files.
//!
//! Metadata lives next to the entity it describes, in a file named by
//! appending the configured metadata extension to the entity path
//! (`guide.md` → `guide.md.meta`, directory `docs/secret` →
//! `docs/secret.meta`). Loading never fails: a missing or malformed
//! sidecar yields the defaults, and `hidden` defaults to visible.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Metadata for a file or directory location.
///
/// One structure covers both entity kinds because visibility must be
/// checked before the filesystem kind is known: `hidden` applies to
/// everything, `file` only matters for files (and the index-file lookup),
/// `indexed` only for directories.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocationMeta {
    /// Page title override for rendered markdown.
    pub title: Option<String>,
    /// Hidden entities behave as not-found on every resolution path.
    pub hidden: bool,
    /// Directory indexing override; falls back to the resolver default.
    pub indexed: Option<bool>,
    /// File disposition settings.
    pub file: Option<FileAttachment>,
}

/// `Content-Disposition` settings attached to a file location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileAttachment {
    /// Disposition mode: `attachment`, `inline`, or any verbatim value.
    pub disposition: Option<String>,
    /// Download filename, honored for `attachment` dispositions.
    pub filename: Option<String>,
}

impl LocationMeta {
    /// Build the `Content-Disposition` header value, if any.
    ///
    /// `attachment` with a filename becomes
    /// `attachment; filename="..."`; any other configured disposition is
    /// passed through verbatim.
    #[must_use]
    pub fn disposition_header(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        let disposition = file.disposition.as_deref()?;
        match (disposition, &file.filename) {
            ("attachment", Some(filename)) => {
                Some(format!("attachment; filename=\"{filename}\""))
            }
            _ => Some(disposition.to_owned()),
        }
    }
}

/// Path of the metadata sidecar for a location.
fn sidecar_path(location: &Path, meta_ext: &str) -> PathBuf {
    let mut os = location.as_os_str().to_owned();
    os.push(meta_ext);
    PathBuf::from(os)
}

/// Load metadata for a location, defaulting on any failure.
///
/// Synchronous and infallible by contract: a missing sidecar, an
/// unreadable file or invalid YAML all yield [`LocationMeta::default`].
#[must_use]
pub fn load_meta(location: &Path, meta_ext: &str) -> LocationMeta {
    let sidecar = sidecar_path(location, meta_ext);
    let Ok(content) = std::fs::read_to_string(&sidecar) else {
        return LocationMeta::default();
    };
    match serde_yaml::from_str(&content) {
        Ok(meta) => meta,
        Err(error) => {
            tracing::debug!(sidecar = %sidecar.display(), %error, "Ignoring invalid metadata sidecar");
            LocationMeta::default()
        }
    }
}
