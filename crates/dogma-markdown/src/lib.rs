//! Heading stream scanning and section tree reconstruction.
//!
//! [`scan_blocks`] turns a Markdown document into an ordered stream of
//! [`Block`]s (front matter, headings, code and text runs) without rendering
//! it. [`build_section_tree`] folds that stream into a rooted [`Section`]
//! tree that mirrors the heading hierarchy.

mod heading;
mod line;
mod scan;
mod tree;

pub use heading::{normalize_heading_text, HeadingEvent, HeadingKind, MAX_DEPTH};
pub use scan::{front_matter, headings, scan_blocks, scan_blocks_from_reader, Block};
pub use tree::{build_from_headings, build_section_tree, Section, SectionIter};

/// Scan `contents` and build its section tree in one step.
pub fn parse_sections(contents: &str) -> Section {
    build_section_tree(scan_blocks(contents))
}
