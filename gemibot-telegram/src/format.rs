//! Markdown-to-Telegram-HTML rendering and message chunking.
//!
//! Gemini answers in Markdown. Telegram understands a small HTML subset, so
//! replies are rendered with pulldown-cmark into `<b>`, `<i>`, `<s>`,
//! `<code>`, `<pre>`, `<a>` and `<blockquote>`; everything else becomes
//! plain text.

mod chunk;

pub use chunk::{TELEGRAM_MSG_LIMIT, chunk_text};

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Escape the three characters special in Telegram HTML: `&`, `<`, `>`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Convert a Markdown string to Telegram-compatible HTML.
///
/// The output always has balanced tags, so any chunk of Markdown can be
/// rendered on its own.
pub fn md_to_telegram_html(markdown: &str) -> String {
    let mut writer = HtmlWriter::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        writer.event(event);
    }
    writer.out.trim_end().to_string()
}

#[derive(Default)]
struct HtmlWriter {
    out: String,
    /// Open lists: `None` = bulleted, `Some(n)` = numbered with next number n.
    lists: Vec<Option<u64>>,
    /// A block ended and the next one needs a blank line before it.
    pending_gap: bool,
}

impl HtmlWriter {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.out.push_str(&escape_html(&text));
            }
            Event::Code(text) => {
                self.out.push_str("<code>");
                self.out.push_str(&escape_html(&text));
                self.out.push_str("</code>");
            }
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.open_block();
                self.out.push_str("──────────");
                self.pending_gap = true;
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open_block(),
            Tag::Heading { .. } => {
                self.open_block();
                self.out.push_str("<b>");
            }
            Tag::BlockQuote(_) => {
                self.open_block();
                self.out.push_str("<blockquote>");
            }
            Tag::CodeBlock(CodeBlockKind::Fenced(lang)) if !lang.is_empty() => {
                self.open_block();
                self.out.push_str("<pre><code class=\"language-");
                self.out.push_str(&escape_html(&lang));
                self.out.push_str("\">");
            }
            Tag::CodeBlock(_) => {
                self.open_block();
                self.out.push_str("<pre><code>");
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.open_block();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                if !self.out.is_empty() && !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.pending_gap = false;
                self.out
                    .push_str(&"  ".repeat(self.lists.len().saturating_sub(1)));
                match self.lists.last_mut() {
                    Some(Some(n)) => {
                        self.out.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => self.out.push_str("• "),
                }
            }
            Tag::Emphasis => self.out.push_str("<i>"),
            Tag::Strong => self.out.push_str("<b>"),
            Tag::Strikethrough => self.out.push_str("<s>"),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.out.push_str("<a href=\"");
                self.out.push_str(&escape_html(&dest_url).replace('"', "&quot;"));
                self.out.push_str("\">");
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.pending_gap = true,
            TagEnd::Heading(_) => {
                self.out.push_str("</b>");
                self.pending_gap = true;
            }
            TagEnd::BlockQuote(_) => {
                self.out.push_str("</blockquote>");
                self.pending_gap = true;
            }
            TagEnd::CodeBlock => {
                if self.out.ends_with('\n') {
                    self.out.pop();
                }
                self.out.push_str("</code></pre>");
                self.pending_gap = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.pending_gap = self.lists.is_empty();
            }
            TagEnd::Emphasis => self.out.push_str("</i>"),
            TagEnd::Strong => self.out.push_str("</b>"),
            TagEnd::Strikethrough => self.out.push_str("</s>"),
            TagEnd::Link | TagEnd::Image => self.out.push_str("</a>"),
            _ => {}
        }
    }

    /// Separate a new block from the previous one.
    fn open_block(&mut self) {
        if self.pending_gap && !self.out.is_empty() {
            self.out.push_str("\n\n");
        }
        self.pending_gap = false;
    }
}
