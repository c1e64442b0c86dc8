use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde_json::json;

use crate::annotation::{Annotation, AnnotationRef, ContentUnit, Payload};

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    if !markdown.starts_with("---") {
        return markdown;
    }
    // Find the closing ---
    if let Some(end) = markdown[3..].find("\n---") {
        // Skip past the closing --- and any trailing newline
        let after_frontmatter = &markdown[3 + end + 4..];
        after_frontmatter.trim_start_matches('\n')
    } else {
        markdown
    }
}

/// Parse markdown text into annotated content units.
///
/// Every formatting occurrence gets its own annotation instance. Blocks are
/// separated by a single plain `'\n'`.
pub fn parse(markdown: &str) -> Vec<ContentUnit> {
    let markdown = strip_frontmatter(markdown);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state);
    }

    state.units
}

#[derive(Default)]
struct ParseState {
    units: Vec<ContentUnit>,
    // Annotations applied to text at this point, outermost first
    active: Vec<AnnotationRef>,
    // Next item number per open list, None for bullet lists
    lists: Vec<Option<u64>>,
    // Directly after a list marker, the item's first block starts inline
    after_marker: bool,
}

impl ParseState {
    fn begin_block(&mut self) {
        if std::mem::take(&mut self.after_marker) {
            return;
        }
        if self.units.last().is_some_and(|u| u.ch != '\n') {
            self.units.push(ContentUnit::plain('\n'));
        }
    }

    fn open(&mut self, kind: &str, data: Payload) {
        self.active.push(Annotation::with_data(kind, data));
    }

    fn close(&mut self) {
        self.active.pop();
    }

    fn push_text(&mut self, text: &str) {
        self.after_marker = false;
        for ch in text.chars() {
            self.units.push(ContentUnit::annotated(ch, self.active.clone()));
        }
    }

    fn push_plain(&mut self, text: &str) {
        self.after_marker = false;
        self.units.extend(text.chars().map(ContentUnit::plain));
    }
}

fn process_event(event: Event<'_>, state: &mut ParseState) {
    match event {
        // Blocks
        Event::Start(Tag::Paragraph) => state.begin_block(),
        Event::Start(Tag::Heading { level, .. }) => {
            state.begin_block();
            state.open("heading", json!({ "level": heading_level_to_u8(level) }));
        }
        Event::Start(Tag::CodeBlock(kind)) => {
            state.begin_block();
            let lang = match kind {
                CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                    Payload::from(lang.into_string())
                }
                _ => Payload::Null,
            };
            state.open("code_block", json!({ "lang": lang }));
        }
        Event::End(TagEnd::CodeBlock) => {
            // Code block text carries its own trailing newline
            let block = state.active.last().map(|a| a.id());
            let trailing = state.units.last().is_some_and(|u| {
                u.ch == '\n' && u.annotations.last().map(|a| a.id()) == block
            });
            if trailing {
                state.units.pop();
            }
            state.close();
        }

        // Lists
        Event::Start(Tag::List(first_number)) => state.lists.push(first_number),
        Event::End(TagEnd::List(_)) => {
            state.lists.pop();
        }
        Event::Start(Tag::Item) => {
            state.begin_block();
            let depth = state.lists.len().saturating_sub(1);
            let marker = match state.lists.last_mut() {
                Some(Some(number)) => {
                    let marker = format!("{}. ", number);
                    *number += 1;
                    marker
                }
                _ => "- ".to_string(),
            };
            state.push_plain(&"  ".repeat(depth));
            state.push_plain(&marker);
            state.after_marker = true;
        }

        // Inline formatting
        Event::Start(Tag::Strong) => state.open("bold", Payload::Null),
        Event::Start(Tag::Emphasis) => state.open("italic", Payload::Null),
        Event::Start(Tag::Strikethrough) => state.open("strike", Payload::Null),
        Event::Start(Tag::Link { dest_url, .. }) => {
            state.open("link", json!({ "href": dest_url.into_string() }));
        }
        Event::End(
            TagEnd::Heading(_)
            | TagEnd::Strong
            | TagEnd::Emphasis
            | TagEnd::Strikethrough
            | TagEnd::Link,
        ) => state.close(),

        // Text content
        Event::Text(text) => state.push_text(&text),
        Event::Code(code) => {
            state.open("code", Payload::Null);
            state.push_text(&code);
            state.close();
        }

        Event::Rule => {
            state.begin_block();
            state.push_plain("---");
        }

        // Soft/hard breaks
        Event::SoftBreak => state.push_text(" "),
        Event::HardBreak => state.push_text("\n"),

        // Ignore other events
        _ => {}
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
