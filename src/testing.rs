//! Helpers shared by the crate's unit tests.

use crate::error::SectionError;
use crate::lines::{Line, LineDefinition};
use crate::sections::{LineMatch, Section, SectionHandler, SectionKind};

/// A section handler that only counts its callback invocations.
#[derive(Default)]
pub struct Counting {
    pub on_match_calls: usize,
    pub on_complete_calls: usize,
}

impl SectionHandler for Counting {
    fn on_match(&mut self, _matched: &LineMatch<'_>) -> Result<(), SectionError> {
        self.on_match_calls += 1;
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), SectionError> {
        self.on_complete_calls += 1;
        Ok(())
    }
}

pub fn section_kind(name: &'static str, definitions: Vec<LineDefinition>) -> SectionKind {
    SectionKind::new(name, definitions, Counting::default).expect("valid test section kind")
}

pub fn section_kind_with_end(
    name: &'static str,
    definitions: Vec<LineDefinition>,
    end_pattern: &str,
) -> SectionKind {
    SectionKind::with_end_pattern(name, definitions, Some(end_pattern), Counting::default)
        .expect("valid test section kind")
}

/// A single-line section kind whose only definition is `pattern`.
pub fn leaf_kind(name: &'static str, pattern: &str) -> SectionKind {
    section_kind(name, vec![LineDefinition::new(pattern)])
}

pub fn make_lines(texts: &[&str]) -> Vec<Line> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| Line::new(index, text))
        .collect()
}

/// Open a section at the first line and consume the rest.
pub fn make_section(kind: &SectionKind, lines: &[Line]) -> Section {
    let mut section = Section::open(kind, &lines[0]).expect("first line opens the section");
    for line in &lines[1..] {
        section.consume(line).expect("line is consumed");
    }
    section
}

#[track_caller]
pub fn assert_consumed(section: &Section, lines: &[Line]) {
    let last = lines.last().expect("at least one line");
    assert_eq!(section.last_consumed_line(), last);
    assert_eq!(section.number_of_lines(), lines.len());
    assert_eq!(section.starting_line_index(), lines[0].index());
    if section.completed() {
        assert_eq!(section.ending_line_index(), Some(last.index()));
    } else {
        assert_eq!(section.ending_line_index(), None);
    }

    let counting = section.handler::<Counting>().expect("counting handler");
    assert_eq!(counting.on_match_calls, lines.len());
    assert_eq!(
        counting.on_complete_calls,
        if section.completed() { 1 } else { 0 }
    );
}
