//! Emoji shortcode extension.
//!
//! Recognizes `:name:` shortcodes against a closed name-to-record mapping
//! supplied at construction time. The mapping is compiled into a single
//! alternation regex with all names escaped, so shortcode names containing
//! regex metacharacters (`:+1:`) behave exactly like alphanumeric ones.

use std::collections::HashMap;
use std::fmt::Write;

use regex::Regex;

use crate::escape::escape_html;
use crate::extension::{InlineExtension, InlineToken, TokenKind};

/// Visual representation of an emoji shortcode.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(tag = "type", rename_all = "lowercase")
)]
pub enum EmojiRecord {
    /// A literal glyph emitted as-is.
    Char {
        /// The glyph (may be more than one code point).
        char: String,
    },
    /// An image, emitted as an `<img>` element.
    Img {
        /// Image URL.
        url: String,
        /// Alt text; the shortcode name is used when absent.
        #[cfg_attr(feature = "serde", serde(default))]
        alt: Option<String>,
    },
    /// An icon-font element, emitted as an empty `<i>` with a class.
    I {
        /// CSS class name for the icon font.
        class_name: String,
    },
}

/// Inline extension recognizing `:name:` emoji shortcodes.
pub struct EmojiExtension {
    emojis: HashMap<String, EmojiRecord>,
    /// Unanchored form, used to find the earliest candidate.
    search: Regex,
    /// Anchored form, used to tokenize at position 0.
    anchored: Regex,
}

impl EmojiExtension {
    /// Build the extension from a closed shortcode mapping.
    ///
    /// Every name is regex-escaped before joining the alternation, so the
    /// mapping is the single source of truth for what matches.
    #[must_use]
    pub fn new(emojis: HashMap<String, EmojiRecord>) -> Self {
        let mut names: Vec<&str> = emojis.keys().map(String::as_str).collect();
        // Longest-first so overlapping names (`a`, `ab`) prefer the longer
        // match, then lexicographic for determinism.
        names.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(":({alternation}):");
        let search = Regex::new(&pattern).expect("escaped alternation is a valid pattern");
        let anchored = Regex::new(&format!("^{pattern}")).expect("anchored pattern is valid");

        Self {
            emojis,
            search,
            anchored,
        }
    }
}

impl InlineExtension for EmojiExtension {
    fn start(&self, src: &str) -> Option<usize> {
        self.search.find(src).map(|m| m.start())
    }

    fn tokenize(&self, src: &str) -> Option<InlineToken> {
        let caps = self.anchored.captures(src)?;
        let name = caps.get(1)?.as_str();
        // Defensive: the regex is derived from the mapping, but an absent
        // name must fall through to plain text rather than panic.
        let record = self.emojis.get(name)?.clone();
        Some(InlineToken {
            raw: caps.get(0)?.as_str().to_owned(),
            kind: TokenKind::Emoji {
                name: name.to_owned(),
                record,
            },
        })
    }

    fn render(&self, token: &InlineToken, out: &mut String) {
        let TokenKind::Emoji { name, record } = &token.kind else {
            return;
        };
        match record {
            EmojiRecord::Char { char } => out.push_str(char),
            EmojiRecord::Img { url, alt } => {
                let alt = alt.as_deref().unwrap_or(name);
                write!(
                    out,
                    r#"<img alt="{}" src="{}" class="md-emoji-img">"#,
                    escape_html(alt),
                    escape_html(url)
                )
                .unwrap();
            }
            EmojiRecord::I { class_name } => {
                write!(out, r#"<i class="{}"></i>"#, escape_html(class_name)).unwrap();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension() -> EmojiExtension {
        let mut emojis = HashMap::new();
        emojis.insert(
            "smile".to_owned(),
            EmojiRecord::Char {
                char: "😄".to_owned(),
            },
        );
        emojis.insert(
            "+1".to_owned(),
            EmojiRecord::Img {
                url: "/assets/plus1.png".to_owned(),
                alt: None,
            },
        );
        emojis.insert(
            "rocket".to_owned(),
            EmojiRecord::I {
                class_name: "icon icon-rocket".to_owned(),
            },
        );
        EmojiExtension::new(emojis)
    }

    fn render_at(ext: &EmojiExtension, src: &str) -> Option<String> {
        let token = ext.tokenize(src)?;
        let mut out = String::new();
        ext.render(&token, &mut out);
        Some(out)
    }

    #[test]
    fn test_start_finds_first_candidate() {
        let ext = extension();
        assert_eq!(ext.start("no emoji here :smile: yes"), Some(14));
        assert_eq!(ext.start("plain text"), None);
    }

    #[test]
    fn test_char_variant_emits_glyph() {
        let ext = extension();
        assert_eq!(render_at(&ext, ":smile:").as_deref(), Some("😄"));
    }

    #[test]
    fn test_img_variant_uses_name_as_alt_fallback() {
        let ext = extension();
        assert_eq!(
            render_at(&ext, ":+1:").as_deref(),
            Some(r#"<img alt="+1" src="/assets/plus1.png" class="md-emoji-img">"#)
        );
    }

    #[test]
    fn test_img_variant_explicit_alt() {
        let mut emojis = HashMap::new();
        emojis.insert(
            "cat".to_owned(),
            EmojiRecord::Img {
                url: "/cat.png".to_owned(),
                alt: Some("a cat".to_owned()),
            },
        );
        let ext = EmojiExtension::new(emojis);
        assert_eq!(
            render_at(&ext, ":cat:").as_deref(),
            Some(r#"<img alt="a cat" src="/cat.png" class="md-emoji-img">"#)
        );
    }

    #[test]
    fn test_icon_variant_emits_empty_element() {
        let ext = extension();
        assert_eq!(
            render_at(&ext, ":rocket:").as_deref(),
            Some(r#"<i class="icon icon-rocket"></i>"#)
        );
    }

    #[test]
    fn test_metacharacter_name_round_trips() {
        let ext = extension();
        // `+` would be a quantifier if the name were not escaped.
        assert_eq!(ext.start("vote :+1: now"), Some(5));
        assert!(ext.tokenize(":+1: now").is_some());
    }

    #[test]
    fn test_unknown_shortcode_does_not_tokenize() {
        let ext = extension();
        assert!(ext.tokenize(":frown:").is_none());
    }

    #[test]
    fn test_tokenize_requires_anchored_match() {
        let ext = extension();
        assert!(ext.tokenize("see :smile:").is_none());
    }

    #[test]
    fn test_token_owns_raw_substring() {
        let ext = extension();
        let token = ext.tokenize(":smile: rest").unwrap();
        assert_eq!(token.raw, ":smile:");
    }
}
