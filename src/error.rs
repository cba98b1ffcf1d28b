//! Errors raised while declaring grammars and while parsing.
//!
//! Every error is fatal: a definition error rejects the grammar at
//! construction time, a parse error aborts the parse with no partial
//! result. Diagnostic messages carry enough context to localize the
//! problem (the offending line, the last consumed line, the patterns that
//! were expected) and tests match on them, so their wording is part of
//! the contract.

use std::fmt;

use thiserror::Error;

use crate::lines::Line;

/// A grammar the engine refuses to accept.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// A section kind was declared with no line definitions.
    #[error("{name}: Section must have at least one line definition.")]
    NoLineDefinitions {
        /// The offending section kind.
        name: &'static str,
    },

    /// The first line definition of a section may not be optional.
    #[error("Header definition cannot be optional.")]
    OptionalHeader,

    /// The first line definition of a section may not be unordered.
    #[error("Header definition cannot be unordered.")]
    UnorderedHeader,

    /// A line definition was declared with a count of zero.
    #[error("Definition at index {index} cannot have a count of 0.")]
    ZeroCount {
        /// Position of the definition in the section's definition list.
        index: usize,
    },

    /// An unordered line definition with ordered neighbors on both sides
    /// behaves exactly like an ordered one.
    #[error("Definition at index {index} must have unordered siblings, otherwise it has no effect.")]
    StandaloneUnordered {
        /// Position of the definition in the section's definition list.
        index: usize,
    },

    /// An end pattern may not be the empty string.
    #[error("End pattern cannot be an empty string.")]
    EmptyEndPattern,

    /// An end pattern only terminates trailing optional or unlimited
    /// definitions; anything else completes on its own.
    #[error("The end pattern has no effect if the last definition is not optional or unlimited.")]
    IneffectiveEndPattern,

    /// A pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    BadPattern {
        /// The pattern as given.
        pattern: String,
        /// The compilation failure.
        source: regex::Error,
    },

    /// A file tag that does not match the required `two_words_file` form.
    #[error("Invalid file tag '{tag}'.")]
    InvalidFileTag {
        /// The tag as given.
        tag: String,
    },

    /// A file tag already claimed by another kind.
    #[error("Duplicate file tag '{tag}'.")]
    DuplicateFileTag {
        /// The tag as given.
        tag: String,
    },

    /// A file kind was declared with no section definitions.
    #[error("{name}: Must have at least one section.")]
    NoSections {
        /// The offending file kind.
        name: &'static str,
    },

    /// A section definition was declared with a count of zero.
    #[error("Section definition for {kind} cannot have a count of 0.")]
    ZeroSectionCount {
        /// The offending section kind.
        kind: &'static str,
    },

    /// The same section kind could open both as a repeat of one
    /// definition and as a later definition, so the engine could not tell
    /// which counter to advance.
    #[error("{kind} cannot be duplicated by the next possible section definitions.")]
    AmbiguousDefinition {
        /// The offending section kind.
        kind: &'static str,
    },

    /// A section kind appeared in its own subsection closure.
    #[error("{kind} cannot be defined as a subsection of itself.")]
    SelfEmbeddingDefinition {
        /// The offending section kind.
        kind: &'static str,
    },
}

/// The patterns a section was prepared to match, as printed in
/// diagnostics: `['Body', 'Comment']`.
#[derive(Debug, Clone)]
pub struct ExpectedPatterns(Vec<String>);

impl ExpectedPatterns {
    pub(crate) fn new(patterns: Vec<String>) -> ExpectedPatterns {
        ExpectedPatterns(patterns)
    }

    /// The expected patterns, in candidate order.
    pub fn patterns(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ExpectedPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, pattern) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{pattern}'")?;
        }
        write!(f, "]")
    }
}

/// A failure inside one section's line-level matcher.
#[derive(Debug, Error)]
pub enum SectionError {
    /// No expected definition matched the line.
    #[error("{name}: Invalid line {line}. Last consumed line: {last_consumed}. Expected patterns: {expected}.")]
    UnmatchedLine {
        /// The section kind.
        name: &'static str,
        /// The line that matched nothing.
        line: Line,
        /// The line the section last consumed.
        last_consumed: Line,
        /// What the section would have accepted.
        expected: ExpectedPatterns,
    },

    /// A completed section was fed another line.
    #[error("{name} already completed.")]
    AlreadyCompleted {
        /// The section kind.
        name: &'static str,
    },

    /// The section was closed before every definition was satisfied.
    #[error("{name}: End of section reached before section was completed. Last consumed line {last_consumed}.")]
    Unterminated {
        /// The section kind.
        name: &'static str,
        /// The line the section last consumed.
        last_consumed: Line,
    },

    /// An error raised by a section handler callback.
    #[error("{0}")]
    Handler(String),
}

impl SectionError {
    /// Wrap a handler-level failure, e.g. a domain validation the grammar
    /// cannot express.
    pub fn handler(message: impl Into<String>) -> SectionError {
        SectionError::Handler(message.into())
    }
}

/// The per-candidate errors collected while a line failed to open any
/// section, printed one per line.
#[derive(Debug)]
pub struct CandidateErrors(Vec<SectionError>);

impl CandidateErrors {
    pub(crate) fn new(errors: Vec<SectionError>) -> CandidateErrors {
        CandidateErrors(errors)
    }

    /// The collected errors, in candidate order.
    pub fn errors(&self) -> &[SectionError] {
        &self.0
    }
}

impl fmt::Display for CandidateErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "- {error}")?;
        }
        Ok(())
    }
}

/// A failure while matching a whole document.
#[derive(Debug, Error)]
pub enum FileError {
    /// The document is not on disk.
    #[error("File does not exist")]
    Missing,

    /// Any other I/O failure while reading the document.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The second line of the document is not a valid tags line.
    #[error("Invalid tags '{line}'.")]
    InvalidTags {
        /// The tags line as read.
        line: String,
    },

    /// No file kind is registered for the document's file-tag.
    #[error("Invalid '{tag}' tag.")]
    UnregisteredTag {
        /// The file-tag as read.
        tag: String,
    },

    /// The document's file-tag names a different kind.
    #[error("Invalid '{tag}' tag for {name}.")]
    UnknownTag {
        /// The file-tag as read.
        tag: String,
        /// The kind the caller tried to match.
        name: &'static str,
    },

    /// A line opened no section, continued no section, and was not a
    /// separator.
    #[error("{name}: Could not match any section.\nErrors:\n{errors}")]
    UnmatchedSection {
        /// The file kind.
        name: &'static str,
        /// Why each candidate section rejected the line.
        errors: CandidateErrors,
    },

    /// The blank-line run before a section did not match its declared
    /// separator count.
    #[error("{name}: Invalid separator count for {section} at line {line}.")]
    InvalidSeparators {
        /// The file kind.
        name: &'static str,
        /// The section that just opened.
        section: &'static str,
        /// Index of the section's first line.
        line: usize,
    },

    /// The document ended with unconsumed sections outstanding.
    #[error("{name}: End of file reached before all sections were completed.")]
    Unterminated {
        /// The file kind.
        name: &'static str,
    },

    /// A failure inside the open section.
    #[error(transparent)]
    Section(#[from] SectionError),

    /// An error raised by a file handler callback.
    #[error("{0}")]
    Handler(String),
}

impl FileError {
    /// Wrap a handler-level failure.
    pub fn handler(message: impl Into<String>) -> FileError {
        FileError::Handler(message.into())
    }
}
