//! Page template with literal placeholder substitution.

use std::io;
use std::path::Path;

/// HTML page template with `%PAGE_TITLE%` and `%PAGE_CONTENT%`
/// placeholders.
#[derive(Clone, Debug)]
pub struct PageTemplate {
    template: String,
}

impl PageTemplate {
    /// Load the template from disk.
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self {
            template: std::fs::read_to_string(path)?,
        })
    }

    /// Build a template from an in-memory string.
    #[must_use]
    pub fn from_string(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute title and content into the template.
    ///
    /// Both replacements are literal: rendered HTML frequently contains
    /// `$` sequences (math markup) that must not be reinterpreted as
    /// replacement patterns.
    #[must_use]
    pub fn apply(&self, title: &str, content: &str) -> String {
        self.template
            .replace("%PAGE_TITLE%", title)
            .replace("%PAGE_CONTENT%", content)
    }
}
