//! Fixtures shared by the document-level tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use folio_parse::patterns::TAGS_PATTERN;
use folio_parse::{
    File, FileError, FileHandler, FileKind, LineDefinition, Section, SectionKind,
};

static TAG_COUNTER: AtomicUsize = AtomicUsize::new(26);

/// A fresh registrable file-tag: `aa_file`, `ab_file`, ... Tests share
/// one process-wide registry, so every test kind needs its own tag.
pub fn unique_tag() -> String {
    let mut n = TAG_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let mut tag = String::new();
    while n > 0 {
        let remainder = (n - 1) % 26;
        tag.insert(0, (b'a' + remainder as u8) as char);
        n = (n - 1) / 26;
    }
    tag.push_str("_file");
    tag
}

/// A file handler that records which sections completed, in order.
#[derive(Default)]
pub struct Recording {
    pub matched: Vec<&'static str>,
    pub on_match_calls: usize,
    pub on_complete_calls: usize,
}

impl FileHandler for Recording {
    fn on_match(&mut self, section: &Section) -> Result<(), FileError> {
        self.matched.push(section.name());
        self.on_match_calls += 1;
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), FileError> {
        self.on_complete_calls += 1;
        Ok(())
    }
}

pub fn leaf_kind(name: &'static str, pattern: &str) -> SectionKind {
    SectionKind::new(name, vec![LineDefinition::new(pattern)], || ())
        .expect("valid test section kind")
}

/// The two-line document header: a title line and the tags line.
pub fn header_kind() -> SectionKind {
    SectionKind::new(
        "HeaderSection",
        vec![
            LineDefinition::new("Header"),
            LineDefinition::new(TAGS_PATTERN),
        ],
        || (),
    )
    .expect("valid test section kind")
}

pub fn body_kind() -> SectionKind {
    leaf_kind("BodySection", "Body")
}

pub fn group_kind() -> SectionKind {
    leaf_kind("GroupSection", "Group")
}

pub fn note_kind() -> SectionKind {
    leaf_kind("NoteSection", "Note")
}

pub fn comment_kind() -> SectionKind {
    leaf_kind("CommentSection", "Comment")
}

pub fn footer_kind() -> SectionKind {
    leaf_kind("FooterSection", "Footer")
}

/// Join document lines the way they would sit on disk.
pub fn doc(lines: &[&str]) -> String {
    lines.join("\n")
}

/// Parse a document that is expected to succeed.
#[track_caller]
pub fn parse(kind: &FileKind, lines: &[&str]) -> File {
    let mut file = kind.open("test_file.md");
    if let Err(error) = file.parse_source(&doc(lines)) {
        panic!("parse failed: {error}");
    }
    file
}

/// Parse a document that is expected to fail, returning the error text.
#[track_caller]
pub fn parse_error(kind: &FileKind, lines: &[&str]) -> String {
    let mut file = kind.open("test_file.md");
    match file.parse_source(&doc(lines)) {
        Ok(()) => panic!("parse unexpectedly succeeded"),
        Err(error) => error.to_string(),
    }
}

/// The completed sections and callback counts of a recorded parse.
#[track_caller]
pub fn assert_matched(file: &File, expected: &[&'static str]) {
    let recording = file.handler::<Recording>().expect("recording handler");
    assert_eq!(recording.matched, expected);
    assert_eq!(recording.on_match_calls, expected.len());
    assert_eq!(recording.on_complete_calls, 1);
}
