//! Extension-to-MIME lookup.

/// Derive a content type from a path extension (including the dot).
///
/// Unknown extensions default to the generic binary type.
#[must_use]
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        ".html" | ".htm" => "text/html",
        ".md" | ".markdown" => "text/markdown",
        ".txt" => "text/plain",
        ".css" => "text/css",
        ".csv" => "text/csv",
        ".js" | ".mjs" => "text/javascript",
        ".json" => "application/json",
        ".xml" => "application/xml",
        ".pdf" => "application/pdf",
        ".zip" => "application/zip",
        ".gz" => "application/gzip",
        ".tar" => "application/x-tar",
        ".wasm" => "application/wasm",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".svg" => "image/svg+xml",
        ".webp" => "image/webp",
        ".ico" => "image/x-icon",
        ".mp3" => "audio/mpeg",
        ".ogg" => "audio/ogg",
        ".wav" => "audio/wav",
        ".mp4" => "video/mp4",
        ".webm" => "video/webm",
        ".woff" => "font/woff",
        ".woff2" => "font/woff2",
        ".ttf" => "font/ttf",
        ".otf" => "font/otf",
        _ => "application/octet-stream",
    }
}
