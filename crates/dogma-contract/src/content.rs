//! Structured content found in a section body: tables, fenced blocks and
//! prose lines.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of the column whose header equals one of `names`, ignoring case.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        self.header.iter().position(|cell| {
            let cell = cell.trim();
            names.iter().any(|name| cell.eq_ignore_ascii_case(name))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CodeBlock {
    pub language: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Structured {
    Table(Table),
    Code(CodeBlock),
}

/// First table or code block in `body`, whichever comes first.
pub(crate) fn first_structured(body: &str) -> Option<Structured> {
    let mut table: Option<Table> = None;
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<String> = None;
    let mut code: Option<CodeBlock> = None;
    let mut in_head = false;

    for event in Parser::new_ext(body, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::Table(_)) => {
                table = Some(Table {
                    header: Vec::new(),
                    rows: Vec::new(),
                });
            }
            Event::End(Tag::Table(_)) => return table.take().map(Structured::Table),
            Event::Start(Tag::TableHead) => {
                in_head = true;
                row = Some(Vec::new());
            }
            Event::End(Tag::TableHead) => {
                in_head = false;
                if let (Some(table), Some(cells)) = (table.as_mut(), row.take()) {
                    table.header = cells;
                }
            }
            Event::Start(Tag::TableRow) if !in_head => row = Some(Vec::new()),
            Event::End(Tag::TableRow) if !in_head => {
                if let (Some(table), Some(cells)) = (table.as_mut(), row.take()) {
                    table.rows.push(cells);
                }
            }
            Event::Start(Tag::TableCell) => cell = Some(String::new()),
            Event::End(Tag::TableCell) => {
                if let (Some(cells), Some(text)) = (row.as_mut(), cell.take()) {
                    cells.push(text.trim().to_owned());
                }
            }
            Event::Start(Tag::CodeBlock(kind)) if table.is_none() => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                code = Some(CodeBlock {
                    language,
                    text: String::new(),
                });
            }
            Event::End(Tag::CodeBlock(_)) => {
                if let Some(block) = code.take() {
                    return Some(Structured::Code(block));
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&text);
                } else if let Some(block) = code.as_mut() {
                    block.text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    None
}

/// Prose lines of `body` rendered to plain text. Content of tables and code
/// blocks is left out.
pub(crate) fn prose_lines(body: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut skipping = 0usize;

    for event in Parser::new_ext(body, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::Table(_)) | Event::Start(Tag::CodeBlock(_)) => skipping += 1,
            Event::End(Tag::Table(_)) | Event::End(Tag::CodeBlock(_)) => {
                skipping = skipping.saturating_sub(1);
            }
            Event::Text(text) | Event::Code(text) if skipping == 0 => current.push_str(&text),
            Event::SoftBreak
            | Event::HardBreak
            | Event::End(Tag::Paragraph)
            | Event::End(Tag::Item)
            | Event::End(Tag::Heading(..)) => {
                let line = current.trim();
                if !line.is_empty() {
                    lines.push(line.to_owned());
                }
                current.clear();
            }
            _ => {}
        }
    }

    let line = current.trim();
    if !line.is_empty() {
        lines.push(line.to_owned());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_table_header_and_rows() {
        let body = "\n| Name | Type |\n| ---- | ---- |\n| id | `u64` |\n| tag | string |\n";
        let Some(Structured::Table(table)) = first_structured(body) else {
            panic!("expected a table");
        };
        assert_eq!(table.header, vec!["Name", "Type"]);
        assert_eq!(
            table.rows,
            vec![vec!["id".to_string(), "u64".into()], vec!["tag".into(), "string".into()]]
        );
        assert_eq!(table.column(&["type"]), Some(1));
        assert_eq!(table.column(&["description"]), None);
    }

    #[test]
    fn reads_fenced_code_language() {
        let body = "Some prose.\n\n```json\n{\"id\": 1}\n```\n";
        let Some(Structured::Code(block)) = first_structured(body) else {
            panic!("expected a code block");
        };
        assert_eq!(block.language.as_deref(), Some("json"));
        assert_eq!(block.text, "{\"id\": 1}\n");
    }

    #[test]
    fn prose_skips_code_and_joins_inline_markup() {
        let body = "**Method**: `POST`\n\n- note\n\n```\nMethod: GET\n```\n";
        assert_eq!(prose_lines(body), vec!["Method: POST", "note"]);
    }
}
