//! Terminal rendering of the markdown feedback the model returns.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";

#[derive(Default)]
struct Renderer {
    out: String,
    bold: usize,
    italic: usize,
    heading: Option<HeadingLevel>,
    // One entry per open list: the next number for ordered lists, None for bullets.
    lists: Vec<Option<u64>>,
}

impl Renderer {
    fn style(&mut self) {
        self.out.push_str(RESET);
        if self.bold > 0 || self.heading.is_some() {
            self.out.push_str(BOLD);
        }
        if self.italic > 0 {
            self.out.push_str(ITALIC);
        }
        if self.heading == Some(HeadingLevel::H1) {
            self.out.push_str(UNDERLINE);
        }
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn block_break(&mut self) {
        self.line_break();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_break();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_break();
                self.heading = Some(level);
                self.style();
            }
            Tag::List(first) => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.line_break();
                }
                self.lists.push(first);
            }
            Tag::Item => {
                self.line_break();
                let depth = self.lists.len().saturating_sub(1);
                self.out.push_str(&"  ".repeat(depth));
                match self.lists.last_mut() {
                    Some(Some(n)) => {
                        self.out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => self.out.push_str("• "),
                }
            }
            Tag::Strong => {
                self.bold += 1;
                self.style();
            }
            Tag::Emphasis => {
                self.italic += 1;
                self.style();
            }
            Tag::CodeBlock(_) => self.block_break(),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.line_break(),
            TagEnd::Heading(_) => {
                self.heading = None;
                self.out.push_str(RESET);
                self.line_break();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.line_break();
            }
            TagEnd::Item => self.line_break(),
            TagEnd::Strong => {
                self.bold = self.bold.saturating_sub(1);
                self.style_or_reset();
            }
            TagEnd::Emphasis => {
                self.italic = self.italic.saturating_sub(1);
                self.style_or_reset();
            }
            _ => {}
        }
    }

    fn style_or_reset(&mut self) {
        if self.bold == 0 && self.italic == 0 && self.heading.is_none() {
            self.out.push_str(RESET);
        } else {
            self.style();
        }
    }

    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}

/// Renders markdown feedback with ANSI styling for a terminal.
///
/// Emphasis becomes bold or italic, headings are bold, and list items get
/// bullets or numbers. Anything else is printed as its text.
pub fn render_markdown(markdown: &str) -> String {
    let mut r = Renderer::default();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(tag) => r.start(tag),
            Event::End(tag) => r.end(tag),
            Event::Text(text) | Event::Code(text) => r.out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => r.out.push('\n'),
            Event::Rule => {
                r.block_break();
                r.out.push_str(&"─".repeat(40));
                r.out.push('\n');
            }
            _ => {}
        }
    }

    r.finish()
}
