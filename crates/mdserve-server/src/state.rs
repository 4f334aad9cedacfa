//! Application state.
//!
//! Shared state for all request handlers.

use mdserve_content::ContentResolver;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Content resolver mapping request paths to responses.
    pub(crate) resolver: ContentResolver,
    /// Scheme used when building absolute listing links.
    pub(crate) scheme: String,
}
