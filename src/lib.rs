//! A declarative grammar engine for structured plain-text documents.
//!
//! You describe a document format once, as data: a **file kind** is a
//! tree of **section definitions**, and a **section kind** is a sequence
//! of **line definitions** (regex patterns with cardinality and ordering
//! attributes). The engine then drives a two-level matcher over the
//! document and dispatches every matched line and every completed
//! section to handlers you supply, which accumulate your domain objects.
//!
//! A document looks like this: a free-form first line, a backtick-quoted
//! tags line whose first tag picks the file kind, and then sections
//! separated by blank lines.
//!
//! ```text
//! Journal
//! `[journal_file]`
//!
//! Entries
//! - Water the plants
//! - Fix the gate
//! ```
//!
//! # How to use folio-parse
//!
//! Declare a section kind for each block of lines, a file kind tying
//! them together, and parse:
//!
//! ```
//! use folio_parse::{
//!     patterns, FileError, FileHandler, FileKind, LineDefinition, LineMatch, Section,
//!     SectionDefinition, SectionError, SectionHandler, SectionKind,
//! };
//!
//! // Per-section state: collects one entry per matched list line.
//! #[derive(Default)]
//! struct Entries {
//!     titles: Vec<String>,
//! }
//!
//! impl SectionHandler for Entries {
//!     fn on_match(&mut self, m: &LineMatch<'_>) -> Result<(), SectionError> {
//!         if m.index == 1 {
//!             self.titles.push(m.group(1).to_string());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! // Per-file state: picks up each completed section's results.
//! #[derive(Default)]
//! struct Journal {
//!     titles: Vec<String>,
//! }
//!
//! impl FileHandler for Journal {
//!     fn on_match(&mut self, section: &Section) -> Result<(), FileError> {
//!         if let Some(entries) = section.handler::<Entries>() {
//!             self.titles = entries.titles.clone();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let header = SectionKind::new(
//!     "HeaderSection",
//!     vec![
//!         LineDefinition::new("^Journal$"),
//!         LineDefinition::new(patterns::TAGS_PATTERN),
//!     ],
//!     || (),
//! )
//! .unwrap();
//!
//! let entries = SectionKind::new(
//!     "EntriesSection",
//!     vec![
//!         LineDefinition::new("^Entries$"),
//!         LineDefinition::new(r"- (.+)").unlimited(),
//!     ],
//!     Entries::default,
//! )
//! .unwrap();
//!
//! let kind = FileKind::new(
//!     "JournalFile",
//!     "journal_file",
//!     vec![
//!         SectionDefinition::new(&header),
//!         SectionDefinition::new(&entries),
//!     ],
//!     Journal::default,
//! )
//! .unwrap();
//!
//! let mut file = kind.open("journal.md");
//! file.parse_source("Journal\n`[journal_file]`\n\nEntries\n- Water the plants\n- Fix the gate\n")
//!     .unwrap();
//!
//! let journal = file.handler::<Journal>().unwrap();
//! assert_eq!(journal.titles, ["Water the plants", "Fix the gate"]);
//! ```
//!
//! `FileKind::open` never touches the disk; [`File::parse`] reads the
//! document at the file's path, and [`File::parse_source`] parses text
//! you already have. [`File::matched`] reads only a document's first two
//! lines and dispatches on the file-tag through the process-wide
//! registry, which every `FileKind::new` populates.
//!
//! # Line definitions
//!
//! A [`LineDefinition`] is a regex pattern, anchored at the start of the
//! line, with three attributes:
//!
//! - `optional` - the line may be absent.
//! - `unordered` - within a run of unordered neighbors, matches may
//!   come in any order.
//! - a count - exactly *n* times (`repeats(n)`, default 1) or
//!   [`unlimited`](LineDefinition::unlimited) (one or more).
//!
//! After every match the section recomputes which definitions may
//! legally consume the next line; a line matching none of them is a
//! fatal parse error that reports the expected patterns.
//!
//! A section kind may also declare an *end pattern*: once all
//! definitions are satisfied, a line matching it closes the section
//! without being consumed. A section ending in an unlimited definition
//! gets a blank-line end pattern by default, so it closes at the next
//! separator.
//!
//! # Section definitions
//!
//! A [`SectionDefinition`] composes a section kind into the file
//! grammar with the same `optional` / `unordered` / count attributes,
//! plus:
//!
//! - `subsections` - nested definitions expected after the parent's own
//!   lines, e.g. groups of notes under a group heading.
//! - a [`SectionPriority`] - among candidates matching the same line,
//!   higher priorities win; `Interrupting` candidates are suppressed
//!   while the previous section is still being consumed.
//! - `separators(n)` - exactly `n` blank lines must precede the
//!   section.
//!
//! Grammars that would make matching ambiguous (the same kind reachable
//! both as a repeat and as a successor, or a kind nested under itself)
//! are rejected when the file kind is constructed.
//!
//! # Failure model
//!
//! All errors are fatal for the parse; there is no skip-and-continue.
//! Construction-time problems are [`DefinitionError`]s, parse-time
//! problems are [`SectionError`]s and [`FileError`]s carrying the
//! offending line, the last consumed line and the expected patterns.

#![deny(missing_docs)]

mod definitions;
mod error;
mod files;
mod lines;
pub mod patterns;
pub mod registry;
mod sections;
#[cfg(test)]
mod testing;

pub use definitions::{SectionDefinition, SectionPriority};
pub use error::{CandidateErrors, DefinitionError, ExpectedPatterns, FileError, SectionError};
pub use files::{File, FileHandler, FileKind};
pub use lines::{Count, Line, LineDefinition};
pub use sections::{LineMatch, Section, SectionHandler, SectionKind};

/// Everything a grammar author needs in one import.
pub mod prelude {
    pub use crate::{
        Count, DefinitionError, File, FileError, FileHandler, FileKind, Line, LineDefinition,
        LineMatch, Section, SectionDefinition, SectionError, SectionHandler, SectionKind,
        SectionPriority,
    };
}
