//! Inline extension mechanism.
//!
//! Extensions claim spans of plain text by scan position. The engine asks
//! every registered extension for its earliest candidate index in the
//! remaining text; the extension with the smallest index wins, ties broken
//! by registration order. The winner's tokenizer is then re-applied
//! anchored at that position — if it declines, the remaining extensions
//! get a chance in registration order before the position falls through
//! to escaped plain text.

use crate::emoji::EmojiRecord;
use crate::escape::escape_html;

/// A token produced by an inline extension.
///
/// Tokens own the raw substring they matched so the scanner knows how far
/// to advance, and so unmatched input can be reconstructed exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineToken {
    /// The exact source text this token consumed.
    pub raw: String,
    /// Variant-specific payload.
    pub kind: TokenKind,
}

/// Payload of an [`InlineToken`].
///
/// This is a closed set: the engine ships exactly the extensions described
/// here, and render dispatch is a match over these variants.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// An emoji shortcode with its resolved record.
    Emoji {
        /// Shortcode name without the surrounding colons.
        name: String,
        /// Resolved record from the configured mapping.
        record: EmojiRecord,
    },
    /// A math span.
    Math {
        /// The trimmed expression text between the delimiters.
        text: String,
        /// Whether the span renders in display (block) mode.
        display: bool,
    },
}

/// An inline tokenizer/renderer extension.
///
/// Implementations must be re-entrant: the same extension instance is
/// consulted for every document rendered by the engine, concurrently.
pub trait InlineExtension: Send + Sync {
    /// Earliest index in `src` at which this extension might match.
    ///
    /// `None` means no candidate anywhere in the remaining input.
    fn start(&self, src: &str) -> Option<usize>;

    /// Attempt an anchored match at position 0 of `src`.
    ///
    /// `None` defers to the next extension or plain text.
    fn tokenize(&self, src: &str) -> Option<InlineToken>;

    /// Render a token previously produced by this extension's tokenizer.
    fn render(&self, token: &InlineToken, out: &mut String);
}

/// Render a plain text run, letting extensions claim spans.
///
/// Text not claimed by any extension is HTML-escaped and emitted verbatim.
pub(crate) fn render_text(text: &str, extensions: &[Box<dyn InlineExtension>], out: &mut String) {
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];

        // Earliest candidate index wins; ties broken by registration order.
        let mut claim: Option<(usize, usize)> = None;
        for (ext_idx, ext) in extensions.iter().enumerate() {
            if let Some(idx) = ext.start(rest) {
                match claim {
                    Some((best, _)) if idx >= best => {}
                    _ => claim = Some((idx, ext_idx)),
                }
            }
        }

        let Some((idx, winner)) = claim else {
            out.push_str(&escape_html(rest));
            return;
        };

        out.push_str(&escape_html(&rest[..idx]));
        let at = &rest[idx..];

        // Winner first, then the remaining extensions in registration order.
        let token = std::iter::once(winner)
            .chain((0..extensions.len()).filter(|&i| i != winner))
            .find_map(|i| {
                extensions[i]
                    .tokenize(at)
                    .map(|token| (i, token))
            });

        let consumed = match token {
            Some((ext_idx, token)) => {
                let len = token.raw.len();
                extensions[ext_idx].render(&token, out);
                len
            }
            None => {
                // No tokenizer claimed the position: emit one character as
                // plain text and keep scanning after it.
                let ch = at.chars().next().unwrap_or('\u{FFFD}');
                let mut buf = [0u8; 4];
                out.push_str(&escape_html(ch.encode_utf8(&mut buf)));
                ch.len_utf8()
            }
        };
        pos += idx + consumed;
    }
}
