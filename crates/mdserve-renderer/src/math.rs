//! Math span extension.
//!
//! Two cooperating pieces share the `$` delimiter conventions:
//!
//! - [`MathExtension`] handles inline spans: `$...$` renders inline,
//!   `$$...$$` on one line renders in display mode. The closing delimiter
//!   must be followed by whitespace, terminal punctuation (ASCII or the
//!   CJK set `？！。，：`) or end of input, which keeps currency-like
//!   text (`$5, $10`) out of math.
//! - [`BlockMathPreprocessor`] lifts multi-line `$$ ... $$` blocks out of
//!   the source before markdown parsing, replacing them with placeholders
//!   that are substituted with rendered markup after the document render.
//!   Fenced code blocks are left untouched.

use regex::Regex;

use crate::extension::{InlineExtension, InlineToken, TokenKind};
use crate::mathml::render_math;

/// Result of matching the inline rule at the start of a string.
struct InlineMatch<'a> {
    /// Total matched length in bytes, including both delimiters.
    raw_len: usize,
    /// Content between the delimiters, untrimmed.
    content: &'a str,
    /// True when the delimiter was `$$`.
    display: bool,
}

/// Characters allowed immediately after a closing delimiter.
fn closes_cleanly(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '?' | '!' | '.' | ',' | ':' | '？' | '！' | '。' | '，' | '：')
}

/// Match the inline math rule anchored at position 0.
///
/// The rule mirrors a lazy regex with backtracking: the earliest closing
/// delimiter whose trailing context and final content character are valid
/// wins; invalid closers become part of the content and the scan goes on.
fn match_inline(src: &str) -> Option<InlineMatch<'_>> {
    let bytes = src.as_bytes();
    let delim = bytes.iter().take_while(|&&b| b == b'$').count();
    // One or two dollars open a span; a longer run is never math.
    if delim == 0 || delim > 2 {
        return None;
    }

    let mut i = delim;
    // Byte offset just past the most recent escape pair, used to accept
    // content that *ends* with an escaped character.
    let mut last_escape_end = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => return None,
            b'\\' => {
                // An escape pair: the backslash is only valid content as
                // part of `\x`, and the escaped character may not be a
                // newline.
                let next = src[i + 1..].chars().next()?;
                if next == '\n' {
                    return None;
                }
                i += 1 + next.len_utf8();
                last_escape_end = i;
            }
            b'$' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'$').count();
                if run >= delim {
                    let content = &src[delim..i];
                    let after = src[i + delim..].chars().next();
                    let after_ok = after.is_none_or(closes_cleanly);
                    let content_ok = !content.is_empty()
                        && (last_escape_end == i
                            || content
                                .chars()
                                .next_back()
                                .is_some_and(|c| !matches!(c, '\\' | '\n' | '$')));
                    if after_ok && content_ok {
                        return Some(InlineMatch {
                            raw_len: i + delim,
                            content,
                            display: delim == 2,
                        });
                    }
                }
                // Not a valid closer here; the dollar joins the content.
                i += 1;
            }
            _ => {
                let ch = src[i..].chars().next()?;
                i += ch.len_utf8();
            }
        }
    }
    None
}

/// Inline extension recognizing `$...$` and `$$...$$` math spans.
pub struct MathExtension;

impl InlineExtension for MathExtension {
    fn start(&self, src: &str) -> Option<usize> {
        // Scan for `$` candidates at the window start or after a space.
        // Rejected candidates are skipped together with any trailing run
        // of dollars, and never reconsidered.
        let mut window = src;
        loop {
            let idx = window.find('$')?;
            let candidate_ok = idx == 0 || window.as_bytes()[idx - 1] == b' ';
            if candidate_ok && match_inline(&window[idx..]).is_some() {
                return Some(src.len() - window.len() + idx);
            }
            window = window[idx + 1..].trim_start_matches('$');
        }
    }

    fn tokenize(&self, src: &str) -> Option<InlineToken> {
        let matched = match_inline(src)?;
        Some(InlineToken {
            raw: src[..matched.raw_len].to_owned(),
            kind: TokenKind::Math {
                text: matched.content.trim().to_owned(),
                display: matched.display,
            },
        })
    }

    fn render(&self, token: &InlineToken, out: &mut String) {
        if let TokenKind::Math { text, display } = &token.kind {
            out.push_str(&render_math(text, *display));
        }
    }
}

/// Tracks fenced code block state during line-by-line scanning.
///
/// Fences open with three or more backticks or tildes; the closing fence
/// must use the same character and be at least as long.
#[derive(Debug, Default)]
struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    fn update(&mut self, line: &str) {
        let trimmed = line.trim_start();
        let Some(first) = trimmed.chars().next() else {
            return;
        };
        if first != '`' && first != '~' {
            return;
        }
        let run = trimmed.chars().take_while(|&c| c == first).count();
        match self.open {
            Some((ch, len)) if ch == first && run >= len => self.open = None,
            Some(_) => {}
            None if run >= 3 => self.open = Some((first, run)),
            None => {}
        }
    }
}

/// Preprocessor extracting `$$ ... $$` blocks before markdown parsing.
pub(crate) struct BlockMathPreprocessor {
    rule: Regex,
}

impl BlockMathPreprocessor {
    pub(crate) fn new() -> Self {
        Self {
            // Content is escape pairs or any non-backslash character,
            // non-greedy across lines.
            rule: Regex::new(r"(?s)^\$\$((?:\\.|[^\\])+?)\$\$")
                .expect("block math rule is a valid pattern"),
        }
    }

    /// Replace each block with a placeholder and return the rendered
    /// markup to substitute after the document render.
    pub(crate) fn extract(&self, source: &str) -> (String, Vec<String>) {
        let mut out = String::with_capacity(source.len());
        let mut blocks = Vec::new();
        let mut fence = FenceTracker::default();
        let mut pos = 0;
        let mut at_line_start = true;

        while pos < source.len() {
            if at_line_start && !fence.in_fence() && source[pos..].starts_with("$$") {
                if let Some(caps) = self.rule.captures(&source[pos..]) {
                    let whole = caps.get(0).expect("group 0 always present");
                    let text = caps.get(1).expect("content group always present").as_str();
                    out.push_str(&placeholder(blocks.len()));
                    blocks.push(render_math(text.trim(), true));
                    pos += whole.end();
                    at_line_start = false;
                    continue;
                }
            }

            let line_end = source[pos..]
                .find('\n')
                .map_or(source.len(), |i| pos + i + 1);
            let line = &source[pos..line_end];
            fence.update(line.trim_end_matches(['\n', '\r']));
            out.push_str(line);
            pos = line_end;
            at_line_start = true;
        }

        (out, blocks)
    }
}

/// Placeholder text substituted literally after rendering.
pub(crate) fn placeholder(index: usize) -> String {
    format!("{{{{MATH_BLOCK_{index}}}}}")
}
