//! Section kinds and the line-level matching engine.
//!
//! A [`SectionKind`] bundles the static grammar of one kind of section
//! (its [`LineDefinition`]s and optional end pattern) with a factory for
//! the per-instance state its handler accumulates. A [`Section`] is one
//! instance of a kind being matched line by line: it keeps a counter per
//! definition and an ordered *expected set* of the definitions that may
//! legally consume the next line, recomputed after every match.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use log::debug;
use regex::{Captures, Regex};

use crate::error::{DefinitionError, ExpectedPatterns, SectionError};
use crate::lines::{is_consumed, Count, Line, LineDefinition};
use crate::patterns::{self, SEPARATOR, SEPARATOR_PATTERN};

/// Callbacks and accumulated state for one section kind.
///
/// Implementations hold whatever domain objects the section builds up
/// while its lines are consumed; once the section completes, the file
/// handler recovers them through [`Section::handler`].
pub trait SectionHandler: Any {
    /// Called once for every consumed line, with the captures of the
    /// definition that matched it.
    fn on_match(&mut self, matched: &LineMatch<'_>) -> Result<(), SectionError>;

    /// Called once when the section completes.
    fn on_complete(&mut self) -> Result<(), SectionError> {
        Ok(())
    }
}

/// The no-op handler, for sections whose lines carry no data.
impl SectionHandler for () {
    fn on_match(&mut self, _matched: &LineMatch<'_>) -> Result<(), SectionError> {
        Ok(())
    }
}

/// A line successfully matched against one of a section's definitions.
pub struct LineMatch<'a> {
    /// Position of the matched definition in the kind's definition list.
    pub index: usize,
    /// The matched definition.
    pub definition: &'a LineDefinition,
    /// Capture groups of the definition's pattern.
    pub captures: Captures<'a>,
    /// The consumed line.
    pub line: &'a Line,
}

impl LineMatch<'_> {
    /// Text of capture group `group`, or `""` if it did not participate
    /// in the match.
    pub fn group(&self, group: usize) -> &str {
        self.captures.get(group).map(|m| m.as_str()).unwrap_or("")
    }
}

struct SectionKindInner {
    name: &'static str,
    line_definitions: Vec<LineDefinition>,
    regexes: Vec<Regex>,
    end_pattern: Option<String>,
    end_regex: Option<Regex>,
    build: Box<dyn Fn() -> Box<dyn SectionHandler> + Send + Sync>,
}

/// A section kind: static grammar metadata plus the factory for its
/// per-instance handler state.
///
/// Kinds are cheap shared handles. Cloning shares the same identity,
/// which is what grammar validation compares, so the same kind used at
/// two positions of a file grammar must be the same handle.
#[derive(Clone)]
pub struct SectionKind {
    inner: Arc<SectionKindInner>,
}

impl SectionKind {
    /// Declare a section kind.
    ///
    /// The line grammar is validated and its patterns compiled here, so
    /// an unusable kind is rejected before any document is opened.
    pub fn new<H, F>(
        name: &'static str,
        definitions: Vec<LineDefinition>,
        build: F,
    ) -> Result<SectionKind, DefinitionError>
    where
        H: SectionHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        SectionKind::with_end_pattern(name, definitions, None, build)
    }

    /// Declare a section kind whose trailing optional or unlimited
    /// definitions are terminated by a line matching `end_pattern`.
    ///
    /// The terminator line is not consumed by the section. When the last
    /// definition is unlimited and its own pattern cannot match a blank
    /// line, an omitted end pattern defaults to the blank-line pattern.
    pub fn with_end_pattern<H, F>(
        name: &'static str,
        definitions: Vec<LineDefinition>,
        end_pattern: Option<&str>,
        build: F,
    ) -> Result<SectionKind, DefinitionError>
    where
        H: SectionHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        if definitions.is_empty() {
            return Err(DefinitionError::NoLineDefinitions { name });
        }
        let header = &definitions[0];
        if header.is_optional() {
            return Err(DefinitionError::OptionalHeader);
        }
        if !header.is_ordered() {
            return Err(DefinitionError::UnorderedHeader);
        }

        for (index, definition) in definitions.iter().enumerate() {
            if definition.count() == Count::Times(0) {
                return Err(DefinitionError::ZeroCount { index });
            }
            if !definition.is_ordered() {
                // The header check above guarantees index > 0 here.
                let previous = &definitions[index - 1];
                let next = definitions.get(index + 1);
                if previous.is_ordered() && next.map_or(true, |next| next.is_ordered()) {
                    return Err(DefinitionError::StandaloneUnordered { index });
                }
            }
        }

        if end_pattern == Some("") {
            return Err(DefinitionError::EmptyEndPattern);
        }

        let regexes = definitions
            .iter()
            .map(|definition| {
                patterns::compiled(definition.pattern()).map_err(|source| {
                    DefinitionError::BadPattern {
                        pattern: definition.pattern().to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<Regex>, DefinitionError>>()?;

        let last = definitions.last().expect("definitions are non-empty");
        let last_regex = regexes.last().expect("one regex per definition");
        let last_unlimited = last.count() == Count::Unlimited;

        let mut end_pattern = end_pattern.map(String::from);
        if end_pattern.is_none() && last_unlimited && !last_regex.is_match(SEPARATOR) {
            end_pattern = Some(SEPARATOR_PATTERN.to_string());
        }
        if end_pattern.is_some() && !(last.is_optional() || last_unlimited) {
            return Err(DefinitionError::IneffectiveEndPattern);
        }

        let end_regex = match &end_pattern {
            Some(pattern) => {
                Some(
                    patterns::compiled(pattern).map_err(|source| DefinitionError::BadPattern {
                        pattern: pattern.clone(),
                        source,
                    })?,
                )
            }
            None => None,
        };

        Ok(SectionKind {
            inner: Arc::new(SectionKindInner {
                name,
                line_definitions: definitions,
                regexes,
                end_pattern,
                end_regex,
                build: Box::new(move || Box::new(build()) as Box<dyn SectionHandler>),
            }),
        })
    }

    /// The kind's name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// The kind's line definitions, in declaration order.
    pub fn line_definitions(&self) -> &[LineDefinition] {
        &self.inner.line_definitions
    }

    /// The kind's end pattern, after defaulting.
    pub fn end_pattern(&self) -> Option<&str> {
        self.inner.end_pattern.as_deref()
    }

    pub(crate) fn same_kind(&self, other: &SectionKind) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SectionKind").field(&self.inner.name).finish()
    }
}

impl PartialEq for SectionKind {
    fn eq(&self, other: &SectionKind) -> bool {
        self.same_kind(other)
    }
}

impl Eq for SectionKind {}

/// One section instance being matched line by line.
pub struct Section {
    kind: SectionKind,
    handler: Box<dyn SectionHandler>,
    starting_line_index: usize,
    ending_line_index: Option<usize>,
    last_consumed_line: Line,
    counts: Vec<usize>,
    expected: Vec<usize>,
}

impl Section {
    /// Open a section at its first line.
    ///
    /// Fails if the line does not match the kind's first definition; the
    /// outer engine uses this to probe which kind a line opens.
    pub fn open(kind: &SectionKind, first_line: &Line) -> Result<Section, SectionError> {
        let mut section = Section {
            kind: kind.clone(),
            handler: (kind.inner.build)(),
            starting_line_index: first_line.index(),
            ending_line_index: None,
            last_consumed_line: first_line.clone(),
            counts: vec![0; kind.inner.line_definitions.len()],
            expected: vec![0],
        };
        section.consume(first_line)?;
        Ok(section)
    }

    /// The kind's name.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// True once the section has an ending line.
    pub fn completed(&self) -> bool {
        self.ending_line_index.is_some()
    }

    /// Index of the section's first line.
    pub fn starting_line_index(&self) -> usize {
        self.starting_line_index
    }

    /// Index of the section's last line, set on completion.
    pub fn ending_line_index(&self) -> Option<usize> {
        self.ending_line_index
    }

    /// The line the section last consumed.
    pub fn last_consumed_line(&self) -> &Line {
        &self.last_consumed_line
    }

    /// Number of lines consumed so far. A terminator line matched by the
    /// end pattern is not included.
    pub fn number_of_lines(&self) -> usize {
        self.last_consumed_line.index() - self.starting_line_index + 1
    }

    /// The handler state accumulated by this section, if it is of type
    /// `H`.
    pub fn handler<H: SectionHandler>(&self) -> Option<&H> {
        let handler: &dyn Any = &*self.handler;
        handler.downcast_ref::<H>()
    }

    /// True once every line definition has met its cardinality.
    pub fn has_consumed_all_definitions(&self) -> bool {
        self.kind
            .inner
            .line_definitions
            .iter()
            .zip(&self.counts)
            .all(|(definition, &matched)| {
                is_consumed(definition.is_optional(), definition.count(), matched)
            })
    }

    /// Feed the next line to the section.
    ///
    /// Fails if the section already completed or if no expected
    /// definition matches, reporting the line, the last consumed line and
    /// every pattern that was expected.
    pub fn consume(&mut self, line: &Line) -> Result<(), SectionError> {
        if self.completed() {
            return Err(SectionError::AlreadyCompleted { name: self.name() });
        }

        if self.matches_end_pattern(line) {
            let ending = self.last_consumed_line.index();
            return self.complete(ending);
        }

        let kind = self.kind.clone();
        let matched = self.expected.iter().copied().find_map(|index| {
            kind.inner.regexes[index]
                .captures(line.text())
                .map(|captures| (index, captures))
        });

        let Some((index, captures)) = matched else {
            let expected = ExpectedPatterns::new(
                self.expected
                    .iter()
                    .map(|&index| kind.inner.line_definitions[index].pattern().to_string())
                    .collect(),
            );
            return Err(SectionError::UnmatchedLine {
                name: self.name(),
                line: line.clone(),
                last_consumed: self.last_consumed_line.clone(),
                expected,
            });
        };

        self.last_consumed_line = line.clone();
        self.counts[index] += 1;
        self.handler.on_match(&LineMatch {
            index,
            definition: &kind.inner.line_definitions[index],
            captures,
            line,
        })?;

        self.update_expected(index);
        if self.expected.is_empty() {
            return self.complete(line.index());
        }
        Ok(())
    }

    /// Close the section at end of input or when another section opens.
    ///
    /// Fails if any definition is still unsatisfied.
    pub fn end(&mut self) -> Result<(), SectionError> {
        if !self.has_consumed_all_definitions() {
            return Err(SectionError::Unterminated {
                name: self.name(),
                last_consumed: self.last_consumed_line.clone(),
            });
        }
        let ending = self.last_consumed_line.index();
        self.complete(ending)
    }

    fn matches_end_pattern(&self, line: &Line) -> bool {
        match &self.kind.inner.end_regex {
            Some(regex) => self.has_consumed_all_definitions() && regex.is_match(line.text()),
            None => false,
        }
    }

    fn complete(&mut self, ending_line_index: usize) -> Result<(), SectionError> {
        self.ending_line_index = Some(ending_line_index);
        debug!(
            "section {} completed at line {}",
            self.kind.name(),
            ending_line_index
        );
        self.handler.on_complete()
    }

    /// Recompute the expected set after definition `matched_index`
    /// consumed a line.
    ///
    /// The scan restarts from the nearest ordered definition at or before
    /// the matched one (so an unordered run stays open as a whole), adds
    /// every definition that can still consume more, and stops at the
    /// first ordered definition that is not yet satisfied.
    fn update_expected(&mut self, matched_index: usize) {
        let definitions = &self.kind.inner.line_definitions;

        let mut start = matched_index;
        if !definitions[start].is_ordered() {
            while start > 0 && !definitions[start].is_ordered() {
                start -= 1;
            }
        }

        let mut expected = Vec::new();
        let mut has_unconsumed_unordered = false;
        for index in start..definitions.len() {
            let definition = &definitions[index];
            let matched = self.counts[index];
            let consumed = is_consumed(definition.is_optional(), definition.count(), matched);
            let can_consume_more = definition.count().can_consume_more(matched);

            if definition.is_ordered() {
                if has_unconsumed_unordered {
                    break;
                }
                if can_consume_more {
                    expected.push(index);
                }
                if !consumed {
                    break;
                }
            } else {
                if can_consume_more {
                    expected.push(index);
                }
                if !consumed {
                    has_unconsumed_unordered = true;
                }
            }
        }

        self.expected = expected;
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name())
            .field("starting_line_index", &self.starting_line_index)
            .field("ending_line_index", &self.ending_line_index)
            .finish_non_exhaustive()
    }
}
