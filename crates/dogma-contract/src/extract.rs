use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use dogma_config::{Config, DuplicatePolicy, ExtractSettings, HeadingPattern};
use dogma_markdown::{build_section_tree, front_matter, scan_blocks, Section};
use regex::Regex;

use crate::content::{first_structured, prose_lines, Structured, Table};
use crate::error::{ExtractError, ExtractResult};
use crate::model::{
    Contract, Diagnostic, EndpointDescriptor, Field, Schema, TypeDefinition, TypeSchema,
};
use crate::verb::Verb;

const PARAM_TITLES: &[&str] = &["params", "url params", "path params", "parameters"];
const BODY_TITLES: &[&str] = &["body", "request", "request body"];
const RESULT_TITLES: &[&str] = &["result", "response"];

/// Walks a section tree and materialises the contract it describes.
#[derive(Clone, Debug, Default)]
pub struct Extractor {
    settings: ExtractSettings,
}

impl Extractor {
    pub fn new(settings: ExtractSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.extract.clone())
    }

    pub fn settings(&self) -> &ExtractSettings {
        &self.settings
    }

    /// Scan, build the section tree and extract endpoints and types in one
    /// pass. The first extraction error aborts the whole document.
    pub fn parse_document(&self, source: &str) -> ExtractResult<Contract> {
        let blocks = scan_blocks(source);
        let front_matter = front_matter(&blocks);
        let root = build_section_tree(blocks);

        let mut diagnostics = Vec::new();
        let endpoints = self.collect_endpoints(&root, source, &mut diagnostics)?;
        let types = self.collect_types(&root, source, &mut diagnostics)?;

        Ok(Contract {
            front_matter,
            endpoints,
            types,
            diagnostics,
        })
    }

    /// Endpoint descriptors in document order.
    pub fn extract_endpoints(
        &self,
        root: &Section,
        source: &str,
    ) -> ExtractResult<Vec<EndpointDescriptor>> {
        self.collect_endpoints(root, source, &mut Vec::new())
    }

    pub fn extract_types(
        &self,
        root: &Section,
        source: &str,
    ) -> ExtractResult<BTreeMap<String, TypeSchema>> {
        self.collect_types(root, source, &mut Vec::new())
    }

    fn collect_endpoints(
        &self,
        root: &Section,
        source: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ExtractResult<Vec<EndpointDescriptor>> {
        let mut endpoints: Vec<EndpointDescriptor> = Vec::new();
        let mut seen: HashMap<(String, Verb), (usize, usize)> = HashMap::new();

        for group in matching_sections(root, &self.settings.api_heading) {
            for section in group.children() {
                let line = section_line(section, source);
                let endpoint = parse_endpoint(section, source, line)?;

                // An endpoint is identified by its name and method together.
                let key = (endpoint.name.clone(), endpoint.verb.clone());
                let Some((index, first_line)) = seen.get(&key).copied() else {
                    seen.insert(key, (endpoints.len(), line));
                    endpoints.push(endpoint);
                    continue;
                };

                let subject = format!("endpoint '{}' ({})", endpoint.name, endpoint.verb);
                match self.settings.duplicates {
                    DuplicatePolicy::Error => {
                        return Err(ExtractError::DuplicateEndpoint {
                            name: endpoint.name,
                            verb: endpoint.verb,
                            line,
                            first_line,
                        });
                    }
                    DuplicatePolicy::FirstWins => {
                        report_duplicate(diagnostics, &subject, line, first_line);
                    }
                    DuplicatePolicy::LastWins => {
                        report_duplicate(diagnostics, &subject, line, first_line);
                        endpoints[index] = endpoint;
                    }
                }
            }
        }

        Ok(endpoints)
    }

    fn collect_types(
        &self,
        root: &Section,
        source: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ExtractResult<BTreeMap<String, TypeSchema>> {
        let mut types = BTreeMap::new();
        let mut first_lines: HashMap<String, usize> = HashMap::new();

        for group in matching_sections(root, &self.settings.types_heading) {
            for section in group.children() {
                let line = section_line(section, source);
                let schema = parse_type(section, source, line)?;

                if let Some(&first_line) = first_lines.get(&schema.name) {
                    let subject = format!("type '{}'", schema.name);
                    match self.settings.duplicates {
                        DuplicatePolicy::Error => {
                            return Err(ExtractError::DuplicateType {
                                name: schema.name,
                                line,
                                first_line,
                            });
                        }
                        DuplicatePolicy::FirstWins => {
                            report_duplicate(diagnostics, &subject, line, first_line);
                            continue;
                        }
                        DuplicatePolicy::LastWins => {
                            report_duplicate(diagnostics, &subject, line, first_line);
                        }
                    }
                } else {
                    first_lines.insert(schema.name.clone(), line);
                }

                types.insert(schema.name.clone(), schema);
            }
        }

        Ok(types)
    }
}

/// Sections whose title matches `pattern`, without descending into a match.
fn matching_sections<'a>(root: &'a Section, pattern: &HeadingPattern) -> Vec<&'a Section> {
    fn visit<'a>(section: &'a Section, pattern: &HeadingPattern, found: &mut Vec<&'a Section>) {
        for child in section.children() {
            if pattern.is_match(child.title()) {
                found.push(child);
            } else {
                visit(child, pattern, found);
            }
        }
    }

    let mut found = Vec::new();
    visit(root, pattern, &mut found);
    found
}

fn parse_endpoint(
    section: &Section,
    source: &str,
    line: usize,
) -> ExtractResult<EndpointDescriptor> {
    let name = validate_name("endpoint", section.title().trim_start_matches('/'), line)?;

    let verb = find_method(section.body(source)).ok_or_else(|| ExtractError::MissingVerb {
        endpoint: name.clone(),
        line,
    })?;
    if !verb.is_supported() {
        return Err(ExtractError::UnsupportedVerb {
            endpoint: name,
            verb: verb.to_string(),
            line,
        });
    }

    let mut url_params = None;
    let mut body = None;
    let mut result = None;

    for child in section.children() {
        let title = child.title().to_ascii_lowercase();
        let slot = if PARAM_TITLES.contains(&title.as_str()) {
            &mut url_params
        } else if BODY_TITLES.contains(&title.as_str()) {
            &mut body
        } else if RESULT_TITLES.contains(&title.as_str()) {
            &mut result
        } else {
            tracing::debug!(
                endpoint = %name,
                section = child.title(),
                "skipping unrecognised endpoint section"
            );
            continue;
        };

        if slot.is_some() {
            tracing::debug!(
                endpoint = %name,
                section = child.title(),
                "ignoring repeated schema section"
            );
            continue;
        }
        let child_line = section_line(child, source);
        *slot = Some(parse_schema(child, source, child_line)?);
    }

    Ok(EndpointDescriptor {
        name,
        verb,
        url_params: url_params.unwrap_or_default(),
        body: body.unwrap_or_default(),
        result: result.unwrap_or_default(),
    })
}

fn parse_schema(section: &Section, source: &str, line: usize) -> ExtractResult<Schema> {
    Ok(match first_structured(section.body(source)) {
        Some(Structured::Table(table)) => Schema::Fields {
            fields: table_fields(&table, section.title(), line)?,
        },
        Some(Structured::Code(block)) => Schema::Raw {
            language: block.language,
            text: block.text,
        },
        None => Schema::Empty,
    })
}

fn parse_type(section: &Section, source: &str, line: usize) -> ExtractResult<TypeSchema> {
    let name = validate_name("type", section.title(), line)?;
    let body = section.body(source);

    let definition = match first_structured(body) {
        Some(Structured::Table(table)) => TypeDefinition::Fields {
            fields: table_fields(&table, &name, line)?,
        },
        Some(Structured::Code(block)) => TypeDefinition::Raw {
            language: block.language,
            text: block.text,
        },
        None if !body.trim().is_empty() => TypeDefinition::Raw {
            language: None,
            text: body.trim().to_owned(),
        },
        None => return Err(ExtractError::EmptyType { name, line }),
    };

    Ok(TypeSchema { name, definition })
}

fn table_fields(table: &Table, section: &str, line: usize) -> ExtractResult<Vec<Field>> {
    let malformed = |reason: String| ExtractError::MalformedTable {
        section: section.to_owned(),
        reason,
        line,
    };

    let name_col = table
        .column(&["name", "field"])
        .ok_or_else(|| malformed("missing a 'Name' column".into()))?;
    let type_col = table
        .column(&["type"])
        .ok_or_else(|| malformed("missing a 'Type' column".into()))?;
    let description_col = table.column(&["description"]);
    let required_col = table.column(&["required"]);

    let cell = |row: &[String], col: usize| row.get(col).cloned().unwrap_or_default();

    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let name = cell(row, name_col);
            if name.is_empty() {
                return Err(malformed(format!("row {} has no name", idx + 1)));
            }
            Ok(Field {
                name,
                ty: cell(row, type_col),
                description: description_col
                    .map(|col| cell(row, col))
                    .unwrap_or_default(),
                required: required_col.map_or(true, |col| is_truthy(&cell(row, col))),
            })
        })
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "required" | "x" | "✓" | "✔"
    )
}

fn find_method(body: &str) -> Option<Verb> {
    static METHOD_LINE: OnceLock<Regex> = OnceLock::new();
    let pattern = METHOD_LINE.get_or_init(|| {
        Regex::new(r"(?i)^method\s*:\s*([A-Za-z]+)\s*$").expect("method line pattern is valid")
    });

    prose_lines(body).iter().find_map(|line| {
        pattern
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|verb| Verb::parse(verb.as_str()))
    })
}

fn validate_name(kind: &'static str, name: &str, line: usize) -> ExtractResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ExtractError::InvalidName {
            kind,
            name: name.to_owned(),
            line,
        });
    }
    Ok(name.to_owned())
}

fn report_duplicate(
    diagnostics: &mut Vec<Diagnostic>,
    subject: &str,
    line: usize,
    first_line: usize,
) {
    tracing::warn!(subject, line, first_line, "duplicate contract entry");
    diagnostics.push(Diagnostic {
        line,
        message: format!("{subject} is already defined at line {first_line}"),
    });
}

fn section_line(section: &Section, source: &str) -> usize {
    let offset = section
        .heading()
        .map(|heading| heading.span.start)
        .unwrap_or(0)
        .min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|byte| **byte == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_line_accepts_list_markers_and_code_spans() {
        assert_eq!(find_method("- method: `put`\n"), Some(Verb::Put));
        assert_eq!(
            find_method("Intro.\n\nMethod: TRACE\n"),
            Some(Verb::Other("TRACE".into()))
        );
        assert_eq!(find_method("```\nMethod: GET\n```\n"), None);
    }

    #[test]
    fn names_with_whitespace_are_rejected() {
        assert!(validate_name("endpoint", "users/{id}", 3).is_ok());
        assert_eq!(
            validate_name("endpoint", "list users", 3),
            Err(ExtractError::InvalidName {
                kind: "endpoint",
                name: "list users".into(),
                line: 3,
            })
        );
    }

    #[test]
    fn section_lines_are_one_based() {
        let source = "intro\n\n# API\n";
        let root = dogma_markdown::parse_sections(source);
        assert_eq!(section_line(&root.children()[0], source), 3);
    }
}
