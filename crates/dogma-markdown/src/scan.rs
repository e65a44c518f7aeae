use std::collections::BTreeMap;
use std::io::{self, BufReader, Read};
use std::ops::Range;

use crate::heading::{detect_heading, HeadingEvent};
use crate::line::{read_lines, split_lines, LineRecord};

/// Block-level node produced by the scanner, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    FrontMatter {
        span: Range<usize>,
        entries: BTreeMap<String, String>,
    },
    Heading(HeadingEvent),
    Code {
        span: Range<usize>,
    },
    Text {
        span: Range<usize>,
    },
}

impl Block {
    pub fn as_heading(&self) -> Option<&HeadingEvent> {
        match self {
            Block::Heading(event) => Some(event),
            _ => None,
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            Block::FrontMatter { span, .. } | Block::Code { span } | Block::Text { span } => {
                span.clone()
            }
            Block::Heading(event) => event.span.clone(),
        }
    }
}

/// Heading events contained in `blocks`, in order.
pub fn headings(blocks: &[Block]) -> impl Iterator<Item = &HeadingEvent> {
    blocks.iter().filter_map(Block::as_heading)
}

/// Front matter entries of a scanned document, empty when it has none.
pub fn front_matter(blocks: &[Block]) -> BTreeMap<String, String> {
    blocks
        .iter()
        .find_map(|block| match block {
            Block::FrontMatter { entries, .. } => Some(entries.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

pub fn scan_blocks(contents: &str) -> Vec<Block> {
    scan_lines(&split_lines(contents))
}

pub fn scan_blocks_from_reader<R: Read>(reader: &mut BufReader<R>) -> io::Result<Vec<Block>> {
    let lines = read_lines(reader)?;
    Ok(scan_lines(&lines))
}

fn scan_lines(lines: &[LineRecord]) -> Vec<Block> {
    // An unterminated front matter block is treated as ordinary content.
    let mut blocks = match scan(lines, true) {
        Some(blocks) => blocks,
        None => scan(lines, false).unwrap_or_default(),
    };
    assign_bodies(&mut blocks, lines);
    blocks
}

fn scan(lines: &[LineRecord], allow_front_matter: bool) -> Option<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut front_matter = FrontMatterState {
        done: !allow_front_matter,
        ..FrontMatterState::default()
    };
    let mut code_blocks = CodeBlockTracker::default();
    let mut run = RunBuilder::default();
    let mut skip_until: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(skip_idx) = skip_until {
            if idx <= skip_idx {
                continue;
            }
            skip_until = None;
        }

        match front_matter.consume(idx, line) {
            FrontMatterStep::Inside => continue,
            FrontMatterStep::Closed => {
                blocks.push(front_matter.take_block());
                continue;
            }
            FrontMatterStep::Outside => {}
        }

        if code_blocks.process(&line.text) {
            run.push(&mut blocks, RunKind::Code, line);
            continue;
        }

        if let Some(detected) = detect_heading(lines, idx) {
            let end_idx = *detected.line_range.end();
            if end_idx > idx {
                skip_until = Some(end_idx);
            }
            run.flush(&mut blocks);
            blocks.push(Block::Heading(detected.event));
            continue;
        }

        run.push(&mut blocks, RunKind::Text, line);
    }

    if front_matter.active {
        return None;
    }

    run.flush(&mut blocks);
    Some(blocks)
}

fn assign_bodies(blocks: &mut [Block], lines: &[LineRecord]) {
    let document_end = lines.last().map(|line| line.end).unwrap_or(0);
    let mut next_heading_start = document_end;

    for block in blocks.iter_mut().rev() {
        if let Block::Heading(event) = block {
            event.body = event.span.end..next_heading_start.max(event.span.end);
            next_heading_start = event.span.start;
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Code,
    Text,
}

#[derive(Default)]
struct RunBuilder {
    current: Option<(RunKind, Range<usize>)>,
}

impl RunBuilder {
    fn push(&mut self, blocks: &mut Vec<Block>, kind: RunKind, line: &LineRecord) {
        if let Some((current_kind, span)) = &mut self.current {
            if *current_kind == kind {
                span.end = line.end;
                return;
            }
        }
        self.flush(blocks);
        self.current = Some((kind, line.start..line.end));
    }

    fn flush(&mut self, blocks: &mut Vec<Block>) {
        if let Some((kind, span)) = self.current.take() {
            blocks.push(match kind {
                RunKind::Code => Block::Code { span },
                RunKind::Text => Block::Text { span },
            });
        }
    }
}

enum FrontMatterStep {
    Outside,
    Inside,
    Closed,
}

#[derive(Default)]
struct FrontMatterState {
    active: bool,
    done: bool,
    span: Range<usize>,
    entries: BTreeMap<String, String>,
}

impl FrontMatterState {
    fn consume(&mut self, index: usize, line: &LineRecord) -> FrontMatterStep {
        if self.done {
            return FrontMatterStep::Outside;
        }

        let trimmed = line.text.trim();

        if index == 0 && trimmed == "---" {
            self.active = true;
            self.span = line.start..line.end;
            return FrontMatterStep::Inside;
        }

        if !self.active {
            self.done = true;
            return FrontMatterStep::Outside;
        }

        self.span.end = line.end;
        if trimmed == "---" || trimmed == "..." {
            self.active = false;
            self.done = true;
            return FrontMatterStep::Closed;
        }

        if let Some((key, value)) = trimmed.split_once(':') {
            let key = key.trim();
            let nested = line.text.starts_with(char::is_whitespace);
            if !key.is_empty() && !key.starts_with('#') && !nested {
                let value = value.trim().trim_matches(|ch| ch == '"' || ch == '\'');
                self.entries.insert(key.to_string(), value.to_string());
            }
        }
        FrontMatterStep::Inside
    }

    fn take_block(&mut self) -> Block {
        Block::FrontMatter {
            span: self.span.clone(),
            entries: std::mem::take(&mut self.entries),
        }
    }
}

#[derive(Default)]
struct CodeBlockTracker {
    fenced: Option<FencedBlock>,
    indented_active: bool,
}

#[derive(Clone, Copy)]
struct FencedBlock {
    fence_char: char,
    fence_len: usize,
}

impl CodeBlockTracker {
    fn process(&mut self, line: &str) -> bool {
        if let Some(fence) = self.fenced {
            if is_closing_fence(line, fence) {
                self.fenced = None;
            }
            return true;
        }

        if let Some(fence) = detect_fence_start(line) {
            self.fenced = Some(fence);
            return true;
        }

        let is_blank = line.trim().is_empty();
        let is_indented = is_indented_code_line(line);

        if self.indented_active {
            if is_blank {
                self.indented_active = false;
                return true;
            }
            if is_indented {
                return true;
            }
            self.indented_active = false;
            return false;
        }

        if is_indented {
            self.indented_active = true;
            return true;
        }

        false
    }
}

fn detect_fence_start(line: &str) -> Option<FencedBlock> {
    let (indent_width, rest) = split_indent(line);
    if indent_width > 3 {
        return None;
    }

    let first = rest.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = rest.chars().take_while(|ch| *ch == first).count();
    if count < 3 {
        return None;
    }

    Some(FencedBlock {
        fence_char: first,
        fence_len: count,
    })
}

fn is_closing_fence(line: &str, fence: FencedBlock) -> bool {
    let (indent_width, rest) = split_indent(line);
    if indent_width > 3 {
        return false;
    }

    let trimmed = rest.trim_end();
    !trimmed.is_empty()
        && trimmed.chars().all(|ch| ch == fence.fence_char)
        && trimmed.chars().count() >= fence.fence_len
}

fn is_indented_code_line(line: &str) -> bool {
    let mut width = 0usize;
    for ch in line.chars() {
        match ch {
            ' ' => {
                width += 1;
                if width >= 4 {
                    return true;
                }
            }
            '\t' => return true,
            _ => return false,
        }
    }
    false
}

fn split_indent(line: &str) -> (usize, &str) {
    let mut width = 0usize;
    for (idx, ch) in line.char_indices() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => return (width, &line[idx..]),
        }
    }
    (width, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_is_captured_and_not_scanned_for_headings() {
        let source = "---\ntitle: Users\nversion: '2'\n# not a heading\n---\n# Real\n";
        let blocks = scan_blocks(source);

        let entries = front_matter(&blocks);
        assert_eq!(entries.get("title").map(String::as_str), Some("Users"));
        assert_eq!(entries.get("version").map(String::as_str), Some("2"));

        let titles: Vec<_> = headings(&blocks).map(|event| event.title.as_str()).collect();
        assert_eq!(titles, vec!["Real"]);
    }

    #[test]
    fn unterminated_front_matter_falls_back_to_content() {
        let blocks = scan_blocks("---\n# Heading\nbody\n");
        assert!(front_matter(&blocks).is_empty());
        assert_eq!(headings(&blocks).count(), 1);
    }

    #[test]
    fn fenced_code_hides_headings_and_becomes_code_block() {
        let source = "# A\n```md\n# hidden\n```\ntext\n";
        let blocks = scan_blocks(source);
        assert_eq!(headings(&blocks).count(), 1);
        assert!(matches!(
            blocks[1],
            Block::Code { ref span } if &source[span.clone()] == "```md\n# hidden\n```\n"
        ));
        assert!(matches!(blocks[2], Block::Text { .. }));
    }

    #[test]
    fn heading_bodies_run_to_next_heading() {
        let source = "# A\nalpha\n## B\nbeta\n# C";
        let blocks = scan_blocks(source);
        let events: Vec<_> = headings(&blocks).collect();
        assert_eq!(&source[events[0].body.clone()], "alpha\n");
        assert_eq!(&source[events[1].body.clone()], "beta\n");
        assert_eq!(&source[events[2].body.clone()], "");
    }

    #[test]
    fn setext_underline_is_not_reported_as_text() {
        let blocks = scan_blocks("Title\n=====\nbody\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_heading().map(|event| event.depth), Some(1));
    }
}
