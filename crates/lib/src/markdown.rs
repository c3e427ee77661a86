//! Markdown-to-content-block rendering for chat transcripts.
//!
//! Assistant replies arrive as Markdown; the chat view wants an ordered list
//! of typed blocks (text runs, code blocks, lists) it can map to widgets.
//! The renderer walks the pulldown-cmark event stream with a small state
//! machine: emphasis events toggle flags on the pending text run, code and
//! list events switch accumulation modes, and block-end events flush.
//! Rendering is total: input that produces no blocks falls back to a single
//! verbatim text block, so non-empty input never renders empty.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::{Deserialize, Serialize};

/// One structurally distinct unit of rendered output, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    /// A run of paragraph text with the emphasis flags in effect when the
    /// run was flushed. Flags are global to the accumulator, not scoped per
    /// nesting level; inline code spans are folded into the run text.
    Text {
        text: String,
        bold: bool,
        italic: bool,
    },
    /// A fenced or indented code block. `language` is the first token of the
    /// fence info string, or empty.
    Code { code: String, language: String },
    /// A flattened list; `ordered` preserves the ordered/unordered
    /// distinction for the view layer.
    List { ordered: bool, items: Vec<String> },
}

/// Per-call parser state; built fresh for each render and discarded after.
#[derive(Default)]
struct ParserState {
    blocks: Vec<ContentBlock>,
    text: String,
    bold: bool,
    italic: bool,
    in_code_block: bool,
    code: String,
    code_language: String,
    // List accumulation; nested lists flatten into the innermost open list.
    list_depth: u32,
    list_ordered: bool,
    items: Vec<String>,
}

impl ParserState {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.handle_start(tag),
            Event::End(tag) => self.handle_end(tag),
            Event::Text(t) => {
                if self.in_code_block {
                    self.code.push_str(&t);
                } else {
                    self.text.push_str(&t);
                }
            }
            // Inline code folds into the current run; no distinct block kind.
            Event::Code(t) => self.text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => self.text.push('\n'),
            Event::Rule => self.flush_text(),
            Event::Html(_) | Event::FootnoteReference(_) | Event::TaskListMarker(_) => {}
        }
    }

    fn handle_start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Strong => self.bold = true,
            Tag::Emphasis => self.italic = true,
            Tag::CodeBlock(kind) => {
                self.flush_text();
                self.in_code_block = true;
                self.code_language = match kind {
                    // First token of the fence info string ("py", "rust,ignore").
                    CodeBlockKind::Fenced(info) => info
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .next()
                        .unwrap_or("")
                        .to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
            }
            Tag::List(start) => {
                if self.list_depth == 0 {
                    self.flush_text();
                    self.list_ordered = start.is_some();
                }
                self.list_depth += 1;
            }
            _ => {}
        }
    }

    fn handle_end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Strong => self.bold = false,
            Tag::Emphasis => self.italic = false,
            Tag::CodeBlock(_) => {
                self.in_code_block = false;
                self.flush_code();
            }
            Tag::Item => {
                let item = self.text.trim().to_string();
                if !item.is_empty() {
                    self.items.push(item);
                }
                self.text.clear();
            }
            Tag::List(_) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 {
                    self.flush_list();
                }
            }
            // Inside a list the accumulated text belongs to the open item.
            Tag::Paragraph | Tag::Heading(..) | Tag::BlockQuote | Tag::Table(_) => {
                if self.list_depth == 0 {
                    self.flush_text();
                }
            }
            Tag::TableCell => self.text.push(' '),
            Tag::TableRow | Tag::TableHead => self.text.push('\n'),
            _ => {}
        }
    }

    /// Flush the accumulated text as one run carrying the current flags.
    /// Whitespace-only accumulations are discarded.
    fn flush_text(&mut self) {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            self.blocks.push(ContentBlock::Text {
                text: trimmed.to_string(),
                bold: self.bold,
                italic: self.italic,
            });
        }
        self.text.clear();
    }

    fn flush_code(&mut self) {
        let code = self.code.trim();
        if !code.is_empty() {
            self.blocks.push(ContentBlock::Code {
                code: code.to_string(),
                language: std::mem::take(&mut self.code_language),
            });
        }
        self.code.clear();
        self.code_language.clear();
    }

    fn flush_list(&mut self) {
        if !self.items.is_empty() {
            self.blocks.push(ContentBlock::List {
                ordered: self.list_ordered,
                items: std::mem::take(&mut self.items),
            });
        }
    }

    fn finish(mut self) -> Vec<ContentBlock> {
        self.flush_text();
        if self.in_code_block {
            self.flush_code();
        }
        if self.list_depth > 0 {
            self.list_depth = 0;
            self.flush_list();
        }
        self.blocks
    }
}

/// Render Markdown into an ordered block sequence. Never fails: anything the
/// parser cannot structure degrades to a single verbatim text block.
pub fn render(text: &str) -> Vec<ContentBlock> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let mut state = ParserState::default();
    for event in Parser::new_ext(text, options) {
        state.handle(event);
    }
    let mut blocks = state.finish();

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: text.to_string(),
            bold: false,
            italic: false,
        });
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paragraph() {
        let blocks = render("hello world");
        assert_eq!(
            blocks,
            vec![ContentBlock::Text {
                text: "hello world".to_string(),
                bold: false,
                italic: false,
            }]
        );
    }

    #[test]
    fn mixed_document_block_order() {
        let blocks = render("**bold** and *italic*\n\n- a\n- b\n\n```py\ncode\n```");
        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            ContentBlock::Text { text, .. } => assert_eq!(text, "bold and italic"),
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(
            blocks[1],
            ContentBlock::List {
                ordered: false,
                items: vec!["a".to_string(), "b".to_string()],
            }
        );
        assert_eq!(
            blocks[2],
            ContentBlock::Code {
                code: "code".to_string(),
                language: "py".to_string(),
            }
        );
    }

    #[test]
    fn ordered_list_keeps_distinction() {
        let blocks = render("1. first\n2. second");
        assert_eq!(
            blocks,
            vec![ContentBlock::List {
                ordered: true,
                items: vec!["first".to_string(), "second".to_string()],
            }]
        );
    }

    #[test]
    fn fenced_language_tag_is_captured() {
        let blocks = render("```rust\nfn main() {}\n```");
        assert_eq!(
            blocks,
            vec![ContentBlock::Code {
                code: "fn main() {}".to_string(),
                language: "rust".to_string(),
            }]
        );
    }

    #[test]
    fn whitespace_only_code_is_discarded_with_fallback() {
        let input = "```\n   \n```";
        let blocks = render(input);
        // No structural block survives, so the raw input comes back verbatim.
        assert_eq!(
            blocks,
            vec![ContentBlock::Text {
                text: input.to_string(),
                bold: false,
                italic: false,
            }]
        );
    }

    #[test]
    fn inline_code_folds_into_text_run() {
        let blocks = render("use `cargo test` here");
        assert_eq!(
            blocks,
            vec![ContentBlock::Text {
                text: "use cargo test here".to_string(),
                bold: false,
                italic: false,
            }]
        );
    }

    #[test]
    fn empty_input_falls_back_to_verbatim_block() {
        let blocks = render("");
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0],
            ContentBlock::Text {
                text: String::new(),
                bold: false,
                italic: false,
            }
        );
    }

    #[test]
    fn nonempty_input_never_renders_empty() {
        for input in ["x", "<div>", "   ", "---", "> quote", "| a | b |"] {
            assert!(!render(input).is_empty(), "{input:?}");
        }
    }

    #[test]
    fn heading_flushes_its_own_run() {
        let blocks = render("# Title\n\nbody");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            ContentBlock::Text { text, .. } => assert_eq!(text, "Title"),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
