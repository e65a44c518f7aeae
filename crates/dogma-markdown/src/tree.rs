use crate::heading::{HeadingEvent, MAX_DEPTH};
use crate::scan::Block;

/// Node of the reconstructed document hierarchy.
///
/// The root is synthesised: it has an empty title, no heading and depth 0.
/// Every other section owns the heading it was opened by.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    title: String,
    children: Vec<Section>,
    heading: Option<HeadingEvent>,
}

impl Section {
    fn root() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn children(&self) -> &[Section] {
        &self.children
    }

    pub fn heading(&self) -> Option<&HeadingEvent> {
        self.heading.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.heading.is_none()
    }

    /// Heading depth of this section, 0 for the root.
    pub fn depth(&self) -> usize {
        self.heading.as_ref().map_or(0, |heading| heading.depth)
    }

    /// Text between this section's heading and the next heading of any depth.
    ///
    /// Returns an empty string for the root or when the recorded range does
    /// not fall inside `source`.
    pub fn body<'a>(&self, source: &'a str) -> &'a str {
        self.heading
            .as_ref()
            .and_then(|heading| source.get(heading.body.clone()))
            .unwrap_or("")
    }

    /// First direct child whose title matches `title` exactly.
    pub fn child(&self, title: &str) -> Option<&Section> {
        self.children.iter().find(|child| child.title == title)
    }

    /// Pre-order walk over this section and its descendants. The first item
    /// of each pair is the nesting level below `self`.
    pub fn iter(&self) -> SectionIter<'_> {
        SectionIter {
            stack: vec![(0, self)],
        }
    }
}

pub struct SectionIter<'a> {
    stack: Vec<(usize, &'a Section)>,
}

impl<'a> Iterator for SectionIter<'a> {
    type Item = (usize, &'a Section);

    fn next(&mut self) -> Option<Self::Item> {
        let (level, section) = self.stack.pop()?;
        self.stack
            .extend(section.children.iter().rev().map(|child| (level + 1, child)));
        Some((level, section))
    }
}

struct PendingSection {
    heading: Option<HeadingEvent>,
    children: Vec<usize>,
}

/// Rebuild the heading hierarchy from a flat block stream.
///
/// Only headings whose parent level is currently open are attached: a heading
/// that skips a level (an `###` directly under a `#`) produces no section.
/// A new heading at depth `d` closes every open section at depth `d` and
/// deeper. Headings outside `1..=6` are dropped.
pub fn build_section_tree<I>(blocks: I) -> Section
where
    I: IntoIterator<Item = Block>,
{
    build_from_headings(blocks.into_iter().filter_map(|block| match block {
        Block::Heading(event) => Some(event),
        _ => None,
    }))
}

/// Same as [`build_section_tree`] for a stream that only carries headings.
pub fn build_from_headings<I>(events: I) -> Section
where
    I: IntoIterator<Item = HeadingEvent>,
{
    let mut nodes = vec![PendingSection {
        heading: None,
        children: Vec::new(),
    }];
    let mut open: [Option<usize>; MAX_DEPTH + 1] = [None; MAX_DEPTH + 1];
    open[0] = Some(0);

    for event in events {
        let depth = event.depth;
        if !(1..=MAX_DEPTH).contains(&depth) {
            continue;
        }

        let Some(parent) = open[depth - 1] else {
            continue;
        };

        let index = nodes.len();
        nodes.push(PendingSection {
            heading: Some(event),
            children: Vec::new(),
        });
        nodes[parent].children.push(index);
        open[depth] = Some(index);
        for slot in open.iter_mut().skip(depth + 1) {
            *slot = None;
        }
    }

    assemble(nodes)
}

// Children are always pushed after their parent, so walking the arena
// backwards finishes every child before the parent that owns it.
fn assemble(nodes: Vec<PendingSection>) -> Section {
    let mut finished: Vec<Option<Section>> = Vec::with_capacity(nodes.len());
    finished.resize_with(nodes.len(), || None);

    for (index, pending) in nodes.into_iter().enumerate().rev() {
        let children = pending
            .children
            .iter()
            .filter_map(|child| finished[*child].take())
            .collect();
        let section = match pending.heading {
            Some(heading) => Section {
                title: heading.title.clone(),
                children,
                heading: Some(heading),
            },
            None => Section {
                children,
                ..Section::root()
            },
        };
        finished[index] = Some(section);
    }

    finished
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(Section::root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(section: &Section) -> Vec<&str> {
        section.children().iter().map(Section::title).collect()
    }

    #[test]
    fn open_slots_are_cleared_below_new_heading() {
        let root = build_from_headings([
            HeadingEvent::new(1, "A"),
            HeadingEvent::new(2, "B"),
            HeadingEvent::new(3, "C"),
            HeadingEvent::new(2, "D"),
            HeadingEvent::new(3, "E"),
        ]);

        let a = &root.children()[0];
        assert_eq!(titles(a), vec!["B", "D"]);
        assert_eq!(titles(&a.children()[0]), vec!["C"]);
        assert_eq!(titles(&a.children()[1]), vec!["E"]);
    }

    #[test]
    fn out_of_range_depths_are_rejected() {
        let root = build_from_headings([
            HeadingEvent::new(0, "zero"),
            HeadingEvent::new(1, "A"),
            HeadingEvent::new(7, "seven"),
        ]);
        assert_eq!(titles(&root), vec!["A"]);
        assert!(root.children()[0].children().is_empty());
    }

    #[test]
    fn iter_walks_in_document_order() {
        let root = build_from_headings([
            HeadingEvent::new(1, "A"),
            HeadingEvent::new(2, "B"),
            HeadingEvent::new(1, "C"),
        ]);
        let walked: Vec<_> = root
            .iter()
            .map(|(level, section)| (level, section.title()))
            .collect();
        assert_eq!(walked, vec![(0, ""), (1, "A"), (2, "B"), (1, "C")]);
    }
}
