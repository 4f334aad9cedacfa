//! Markdown engine with renderer overrides and extension composition.

use std::collections::HashMap;
use std::fmt::Write;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::emoji::{EmojiExtension, EmojiRecord};
use crate::escape::escape_html;
use crate::extension::{InlineExtension, render_text};
use crate::math::{BlockMathPreprocessor, MathExtension, placeholder};

/// Engine configuration.
///
/// Extensions are registered in a fixed order: emoji (when a mapping is
/// supplied) before math (when enabled), matching the order the caller
/// declares them in.
pub struct EngineOptions {
    /// Emoji shortcode mapping. `None` disables the emoji extension.
    pub emojis: Option<HashMap<String, EmojiRecord>>,
    /// Enable `$`/`$$` math spans (default: enabled).
    pub allow_latex: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            emojis: None,
            allow_latex: true,
        }
    }
}

/// Markdown-to-HTML engine.
///
/// Extension regexes are compiled once at construction; rendering is
/// side-effect-free and re-entrant, so one engine instance serves
/// concurrent documents.
pub struct MarkdownEngine {
    extensions: Vec<Box<dyn InlineExtension>>,
    block_math: Option<BlockMathPreprocessor>,
}

impl MarkdownEngine {
    /// Build an engine from options, compiling extension patterns once.
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        let mut extensions: Vec<Box<dyn InlineExtension>> = Vec::new();
        if let Some(emojis) = options.emojis {
            extensions.push(Box::new(EmojiExtension::new(emojis)));
        }
        if options.allow_latex {
            extensions.push(Box::new(MathExtension));
        }
        Self {
            extensions,
            block_math: options.allow_latex.then(BlockMathPreprocessor::new),
        }
    }

    /// Render a markdown document to HTML.
    ///
    /// Deterministic for identical input; never fails — malformed
    /// constructs degrade to their fallback renderings.
    #[must_use]
    pub fn render(&self, content: &str) -> String {
        let (source, math_blocks) = match &self.block_math {
            Some(pre) => pre.extract(content),
            None => (content.to_owned(), Vec::new()),
        };

        let parser = Parser::new_ext(&source, parser_options()).into_offset_iter();
        let mut emitter = Emitter::new(&source, &self.extensions);
        for (event, range) in parser {
            emitter.process(event, &range);
        }
        let mut html = emitter.finish();

        // Substitute extracted block math. Literal replacement: the
        // rendered markup must never be reinterpreted.
        for (index, rendered) in math_blocks.iter().enumerate() {
            html = html.replace(&placeholder(index), rendered);
        }
        html
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

/// Alt-text collection state for an image being rendered.
struct ImageState {
    src: String,
    title: String,
    alt: String,
}

/// Event-stream emitter holding per-render state.
struct Emitter<'a> {
    source: &'a str,
    extensions: &'a [Box<dyn InlineExtension>],
    output: String,
    /// Buffer for the current fenced/indented code block, when active.
    code: Option<String>,
    image: Option<ImageState>,
    /// Ordered flag per open list, for closing tags.
    list_stack: Vec<bool>,
    in_table_head: bool,
}

impl<'a> Emitter<'a> {
    fn new(source: &'a str, extensions: &'a [Box<dyn InlineExtension>]) -> Self {
        Self {
            source,
            extensions,
            output: String::with_capacity(source.len() * 2),
            code: None,
            image: None,
            list_stack: Vec::new(),
            in_table_head: false,
        }
    }

    fn finish(self) -> String {
        self.output
    }

    fn process(&mut self, event: Event<'_>, range: &Range<usize>) {
        match event {
            Event::Start(tag) => self.start_tag(&tag, range),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&code);
                } else {
                    write!(
                        self.output,
                        r#"<code class="md-codespan">{}</code>"#,
                        escape_html(&code)
                    )
                    .unwrap();
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => self.output.push_str(&html),
            Event::SoftBreak => self.output.push('\n'),
            Event::HardBreak => self.output.push_str("<br>"),
            Event::Rule => self.output.push_str(r#"<hr class="md-line" />"#),
            Event::TaskListMarker(checked) => {
                // Emitted at the marker position: inside the leading
                // paragraph for loose items, directly in the item body
                // for tight ones.
                self.output.push_str(if checked {
                    r#"<input type="checkbox" checked disabled> "#
                } else {
                    r#"<input type="checkbox" disabled> "#
                });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: &Tag<'_>, range: &Range<usize>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                // The raw token distinguishes the two heading syntaxes:
                // ATX headings begin with `#`, Setext headings carry the
                // underline marker on the following line.
                let atx = self.source[range.start..].trim_start().starts_with('#');
                let class = if atx {
                    "md-heading"
                } else {
                    "md-heading md-h-underline"
                };
                write!(self.output, r#"<h{} class="{class}">"#, *level as usize).unwrap();
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>\n"),
            Tag::CodeBlock(_) => self.code = Some(String::new()),
            Tag::List(start) => {
                self.list_stack.push(start.is_some());
                match start {
                    None => self.output.push_str("<ul class=\"md-ullist\">\n"),
                    Some(1) => self.output.push_str("<ol class=\"md-ollist\">\n"),
                    Some(n) => {
                        write!(self.output, r#"<ol class="md-ollist" start="{n}">"#).unwrap();
                        self.output.push('\n');
                    }
                }
            }
            Tag::Item => self.output.push_str(r#"<li class="md-item-list">"#),
            Tag::Table(_) => self.output.push_str("<table>"),
            Tag::TableHead => {
                self.in_table_head = true;
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => self.output.push_str("<tr>"),
            Tag::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "<th>" } else { "<td>" });
            }
            Tag::Emphasis => self.output.push_str("<em>"),
            Tag::Strong => self.output.push_str("<strong>"),
            Tag::Strikethrough => self.output.push_str("<s>"),
            Tag::Link { dest_url, .. } => {
                write!(self.output, r#"<a href="{}">"#, escape_html(dest_url)).unwrap();
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageState {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::FootnoteDefinition(_)
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>\n"),
            TagEnd::Heading(level) => {
                write!(self.output, "</h{}>", level as usize).unwrap();
                self.output.push('\n');
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>\n"),
            TagEnd::CodeBlock => {
                let content = self.code.take().unwrap_or_default();
                write!(
                    self.output,
                    "<pre class=\"md-ticcode\"><code class=\"md-ticcode\">{}</code></pre>",
                    escape_html(&content)
                )
                .unwrap();
                self.output.push('\n');
            }
            TagEnd::List(ordered) => {
                self.list_stack.pop();
                self.output
                    .push_str(if ordered { "</ol>\n" } else { "</ul>\n" });
            }
            TagEnd::Item => self.output.push_str("</li>\n"),
            TagEnd::Table => self.output.push_str("</tbody></table>\n"),
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.output.push_str("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "</th>" } else { "</td>" });
            }
            TagEnd::Emphasis => self.output.push_str("</em>"),
            TagEnd::Strong => self.output.push_str("</strong>"),
            TagEnd::Strikethrough => self.output.push_str("</s>"),
            TagEnd::Link => self.output.push_str("</a>"),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    let title_attr = if image.title.is_empty() {
                        String::new()
                    } else {
                        format!(r#" title="{}""#, escape_html(&image.title))
                    };
                    write!(
                        self.output,
                        r#"<img src="{}"{title_attr} alt="{}">"#,
                        escape_html(&image.src),
                        escape_html(&image.alt)
                    )
                    .unwrap();
                }
            }
            TagEnd::FootnoteDefinition
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_)
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::Superscript
            | TagEnd::Subscript => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = &mut self.code {
            code.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            render_text(text, self.extensions, &mut self.output);
        }
    }
}
