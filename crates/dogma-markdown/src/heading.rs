use crate::line::LineRecord;
use pulldown_cmark::{Event, Options, Parser};
use std::ops::{Range, RangeInclusive};

/// Deepest heading level a document can express.
pub const MAX_DEPTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingKind {
    Atx,
    Setext,
}

/// A structural heading in document order.
///
/// `span` covers the heading line(s); `body` runs from the end of the heading
/// to the start of the next heading of any depth, or to the end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEvent {
    pub depth: usize,
    pub title: String,
    pub raw: String,
    pub kind: HeadingKind,
    pub span: Range<usize>,
    pub body: Range<usize>,
}

impl HeadingEvent {
    /// Build an ATX-style event with an empty body, mostly useful for tests
    /// and for callers that synthesise heading streams.
    pub fn new(depth: usize, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            depth,
            raw: title.clone(),
            title,
            kind: HeadingKind::Atx,
            span: 0..0,
            body: 0..0,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.body = span.end..span.end;
        self.span = span;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DetectedHeading {
    pub event: HeadingEvent,
    pub line_range: RangeInclusive<usize>,
}

pub(crate) fn detect_heading(lines: &[LineRecord], index: usize) -> Option<DetectedHeading> {
    detect_atx_heading(lines, index).or_else(|| detect_setext_heading(lines, index))
}

fn detect_atx_heading(lines: &[LineRecord], index: usize) -> Option<DetectedHeading> {
    let line = lines.get(index)?;
    let trimmed_start = line.text.trim_start();
    if leading_indent_width(&line.text) > 3 {
        return None;
    }

    let pound_count = trimmed_start.chars().take_while(|ch| *ch == '#').count();
    if pound_count == 0 || pound_count > MAX_DEPTH {
        return None;
    }

    let after_hashes = &trimmed_start[pound_count..];
    if !after_hashes.is_empty() && !after_hashes.starts_with(char::is_whitespace) {
        return None;
    }

    let mut content = after_hashes.trim();
    let stripped_hashes = content.trim_end_matches('#');
    if stripped_hashes.len() < content.len() {
        let candidate = &content[..stripped_hashes.len()];
        if candidate.is_empty() || candidate.ends_with(char::is_whitespace) {
            content = candidate.trim_end();
        }
    }

    let raw = content.trim().to_string();
    Some(DetectedHeading {
        event: HeadingEvent {
            depth: pound_count,
            title: normalize_heading_text(&raw),
            raw,
            kind: HeadingKind::Atx,
            span: line.start..line.end,
            body: line.end..line.end,
        },
        line_range: index..=index,
    })
}

fn detect_setext_heading(lines: &[LineRecord], index: usize) -> Option<DetectedHeading> {
    let line = lines.get(index)?;
    let next = lines.get(index + 1)?;

    if leading_indent_width(&line.text) > 3 || leading_indent_width(&next.text) > 3 {
        return None;
    }

    let raw_line = line.text.trim();
    if raw_line.is_empty() {
        return None;
    }

    let depth = match_setext_depth(next.text.trim())?;
    let raw = raw_line.to_string();

    Some(DetectedHeading {
        event: HeadingEvent {
            depth,
            title: normalize_heading_text(&raw),
            raw,
            kind: HeadingKind::Setext,
            span: line.start..next.end,
            body: next.end..next.end,
        },
        line_range: index..=index + 1,
    })
}

fn match_setext_depth(underline: &str) -> Option<usize> {
    let fence_char = underline.chars().next()?;
    if fence_char != '=' && fence_char != '-' {
        return None;
    }

    if underline.len() < 3 || !underline.chars().all(|ch| ch == fence_char) {
        return None;
    }

    Some(if fence_char == '=' { 1 } else { 2 })
}

/// Render inline markdown to plain text and collapse runs of whitespace.
pub fn normalize_heading_text(input: &str) -> String {
    let mut text = String::new();

    for event in Parser::new_ext(input, Options::empty()) {
        match event {
            Event::Text(cow) | Event::Code(cow) => text.push_str(&cow),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::FootnoteReference(name) => text.push_str(&name),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn leading_indent_width(line: &str) -> usize {
    let mut width = 0usize;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, start: usize, end: usize) -> LineRecord {
        LineRecord {
            text: text.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn parses_atx_heading_with_closing_hashes() {
        let lines = vec![line("### Heading **Text** ##", 0, 23)];
        let parsed = detect_atx_heading(&lines, 0).unwrap();
        assert_eq!(parsed.event.depth, 3);
        assert_eq!(parsed.event.raw, "Heading **Text**");
        assert_eq!(parsed.event.title, "Heading Text");
        assert_eq!(parsed.event.span, 0..23);
    }

    #[test]
    fn synthesised_event_body_starts_after_its_span() {
        let event = HeadingEvent::new(2, "Users").with_span(10..19);
        assert_eq!(event.span, 10..19);
        assert_eq!(event.body, 19..19);
        assert_eq!(event.kind, HeadingKind::Atx);
    }

    #[test]
    fn rejects_seven_hashes_and_missing_space() {
        let lines = vec![line("####### Too deep", 0, 16), line("#NoSpace", 16, 24)];
        assert!(detect_atx_heading(&lines, 0).is_none());
        assert!(detect_atx_heading(&lines, 1).is_none());
    }

    #[test]
    fn parses_setext_heading() {
        let lines = vec![line("Heading with `code`", 0, 20), line("------", 20, 27)];
        let parsed = detect_setext_heading(&lines, 0).unwrap();
        assert_eq!(parsed.event.depth, 2);
        assert_eq!(parsed.event.title, "Heading with code");
        assert_eq!(parsed.event.kind, HeadingKind::Setext);
        assert_eq!(*parsed.line_range.end(), 1);
    }

    #[test]
    fn rejects_invalid_setext_underlines() {
        let lines = vec![line("Heading", 0, 8), line("--=-", 8, 13)];
        assert!(detect_setext_heading(&lines, 0).is_none());
    }

    #[test]
    fn normalizes_backticked_endpoint_names() {
        assert_eq!(normalize_heading_text("`users/{id}`"), "users/{id}");
        assert_eq!(normalize_heading_text("  Get   *all*  users "), "Get all users");
    }
}
