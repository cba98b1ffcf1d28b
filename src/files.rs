//! File kinds and the section-level matching engine.
//!
//! A [`FileKind`] pairs a file-tag with a validated grammar tree and a
//! handler factory; a [`File`] drives one document against that grammar.
//! The engine keeps one section open at a time: every line first tries to
//! open a new section from the current expected set, then is forwarded to
//! the open section, then may be a blank separator; anything else aborts
//! the parse.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, trace};

use crate::definitions::{SectionDefinition, SectionPriority, SectionTree};
use crate::error::{CandidateErrors, DefinitionError, FileError, SectionError};
use crate::lines::{is_consumed, Line};
use crate::patterns::{self, SEPARATOR};
use crate::registry;
use crate::sections::Section;

/// Callbacks and accumulated state for one file kind.
///
/// The file handler receives every completed section and assembles the
/// document-level result; it is recovered after the parse through
/// [`File::handler`].
pub trait FileHandler: Any {
    /// Called once for every completed section, in input order.
    fn on_match(&mut self, section: &Section) -> Result<(), FileError>;

    /// Called once at a successful end of file.
    fn on_complete(&mut self) -> Result<(), FileError> {
        Ok(())
    }
}

/// The no-op handler, for file kinds parsed only for validation.
impl FileHandler for () {
    fn on_match(&mut self, _section: &Section) -> Result<(), FileError> {
        Ok(())
    }
}

struct FileKindInner {
    name: &'static str,
    tag: String,
    tree: SectionTree,
    build: Box<dyn Fn() -> Box<dyn FileHandler> + Send + Sync>,
}

/// A file kind: its dispatch tag, its section grammar, and the factory
/// for per-parse handler state.
///
/// Construction validates the tag and the grammar and registers the kind
/// in the process-wide registry, so every kind that exists is usable.
#[derive(Clone)]
pub struct FileKind {
    inner: Arc<FileKindInner>,
}

impl FileKind {
    /// Declare and register a file kind.
    pub fn new<H, F>(
        name: &'static str,
        tag: &str,
        definitions: Vec<SectionDefinition>,
        build: F,
    ) -> Result<FileKind, DefinitionError>
    where
        H: FileHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        if !patterns::file_tag_regex().is_match(tag) {
            return Err(DefinitionError::InvalidFileTag {
                tag: tag.to_string(),
            });
        }
        if definitions.is_empty() {
            return Err(DefinitionError::NoSections { name });
        }
        let tree = SectionTree::build(&definitions)?;

        let kind = FileKind {
            inner: Arc::new(FileKindInner {
                name,
                tag: tag.to_string(),
                tree,
                build: Box::new(move || Box::new(build()) as Box<dyn FileHandler>),
            }),
        };
        registry::register(&kind)?;
        Ok(kind)
    }

    /// The kind's name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// The kind's file-tag.
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// Open a document of this kind at `path`. No I/O happens until
    /// [`File::parse`].
    pub fn open(&self, path: impl Into<PathBuf>) -> File {
        File {
            kind: self.clone(),
            path: path.into(),
            handler: (self.inner.build)(),
            number_of_lines: 0,
            counts: HashMap::new(),
            expected: Vec::new(),
        }
    }

    /// Open the document at `path` after checking that its file-tag names
    /// this kind.
    pub fn matched(&self, path: impl AsRef<Path>) -> Result<File, FileError> {
        let path = path.as_ref();
        let tag = read_file_tag(path)?;
        if tag != self.inner.tag {
            return Err(FileError::UnknownTag {
                tag,
                name: self.inner.name,
            });
        }
        Ok(self.open(path))
    }
}

impl fmt::Debug for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKind")
            .field("name", &self.inner.name)
            .field("tag", &self.inner.tag)
            .finish_non_exhaustive()
    }
}

/// Read the first two lines of `path` and extract the file-tag from the
/// tags line.
fn read_file_tag(path: &Path) -> Result<String, FileError> {
    let file = fs::File::open(path).map_err(missing_or_io)?;
    let mut reader = io::BufReader::new(file);
    let mut header = String::new();
    let mut tags_line = String::new();
    reader.read_line(&mut header)?;
    reader.read_line(&mut tags_line)?;

    let tags_line = tags_line.trim_end_matches('\n');
    if !patterns::tags_regex().is_match(tags_line) {
        return Err(FileError::InvalidTags {
            line: tags_line.to_string(),
        });
    }
    let tag = patterns::tag_regex()
        .find(tags_line)
        .map(|found| found.as_str())
        .unwrap_or_default();
    Ok(tag.to_string())
}

fn missing_or_io(error: io::Error) -> FileError {
    if error.kind() == io::ErrorKind::NotFound {
        FileError::Missing
    } else {
        FileError::Io(error)
    }
}

/// The open section as the file engine sees it, with the bookkeeping that
/// the interruption rule and counter scoping need.
struct SectionInfo {
    section: Section,
    node: usize,
    has_updated_count: bool,
    has_been_completed: bool,
}

/// One document being parsed against its file kind's grammar.
///
/// Files compare equal and hash by path.
pub struct File {
    kind: FileKind,
    path: PathBuf,
    handler: Box<dyn FileHandler>,
    number_of_lines: usize,
    counts: HashMap<usize, usize>,
    expected: Vec<usize>,
}

impl File {
    /// Look up the file kind named by the tags line of the document at
    /// `path` and open it.
    pub fn matched(path: impl AsRef<Path>) -> Result<File, FileError> {
        let path = path.as_ref();
        let tag = read_file_tag(path)?;
        let kind =
            registry::find(&tag).ok_or_else(|| FileError::UnregisteredTag { tag: tag.clone() })?;
        Ok(kind.open(path))
    }

    /// The kind's name.
    pub fn name(&self) -> &'static str {
        self.kind.inner.name
    }

    /// The document's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of raw lines in the document, set by parsing.
    pub fn number_of_lines(&self) -> usize {
        self.number_of_lines
    }

    /// The handler state accumulated by this file, if it is of type `H`.
    pub fn handler<H: FileHandler>(&self) -> Option<&H> {
        let handler: &dyn Any = &*self.handler;
        handler.downcast_ref::<H>()
    }

    /// Read the document at this file's path and parse it.
    pub fn parse(&mut self) -> Result<(), FileError> {
        let source = fs::read_to_string(&self.path).map_err(missing_or_io)?;
        self.parse_source(&source)
    }

    /// Parse an in-memory document against this file's grammar.
    pub fn parse_source(&mut self, source: &str) -> Result<(), FileError> {
        let raw_lines: Vec<&str> = source.lines().collect();
        self.number_of_lines = raw_lines.len();
        self.counts.clear();
        self.update_expected(None);

        let mut current: Option<SectionInfo> = None;
        for (index, raw_line) in raw_lines.iter().enumerate() {
            let line = Line::new(index, raw_line);

            // Always start by trying to open a new section.
            let (matched, errors) = self.try_open(&line);
            if let Some(matched) = matched {
                let interrupts = match &current {
                    Some(open) => self.can_interrupt(&matched, open),
                    None => true,
                };
                if interrupts {
                    if let Some(mut open) = current.take() {
                        if !open.section.completed() {
                            open.section.end()?;
                            self.complete_section(&mut open)?;
                        }
                        self.validate_separators(&matched, &raw_lines)?;
                    }

                    let mut info = matched;
                    // One-line sections are already complete at open.
                    if info.section.completed() {
                        self.complete_section(&mut info)?;
                    }
                    if !self.kind.inner.tree.node(info.node).children.is_empty() {
                        self.clear_subsection_counts(info.node);
                    }
                    self.update_expected(Some(info.node));
                    current = Some(info);
                    continue;
                }
            }

            let open_and_unfinished = current
                .as_ref()
                .map_or(false, |open| !open.section.completed());
            if open_and_unfinished {
                let mut open = current.take().expect("section is open");
                open.section.consume(&line)?;
                if !open.has_updated_count && open.section.has_consumed_all_definitions() {
                    update_count(&mut self.counts, &mut open);
                    self.update_expected(Some(open.node));
                }
                if open.section.completed() {
                    self.complete_section(&mut open)?;
                }
                current = Some(open);
                continue;
            }

            if line.text() == SEPARATOR {
                continue;
            }

            return Err(FileError::UnmatchedSection {
                name: self.name(),
                errors: CandidateErrors::new(errors),
            });
        }

        if let Some(mut open) = current.take() {
            if !open.section.completed() {
                open.section.end()?;
                self.complete_section(&mut open)?;
            }
        }
        self.finish()
    }

    /// Try to open a new section for `line`, probing the expected
    /// candidates in order. The per-candidate errors are reported only if
    /// the whole line turns out to be unmatchable.
    fn try_open(&self, line: &Line) -> (Option<SectionInfo>, Vec<SectionError>) {
        let mut errors = Vec::new();
        for &node in &self.expected {
            match Section::open(&self.kind.inner.tree.node(node).kind, line) {
                Ok(section) => {
                    debug!(
                        "{}: opened {} at line {}",
                        self.name(),
                        section.name(),
                        line.index()
                    );
                    return (
                        Some(SectionInfo {
                            section,
                            node,
                            has_updated_count: false,
                            has_been_completed: false,
                        }),
                        errors,
                    );
                }
                Err(error) => errors.push(error),
            }
        }
        (None, errors)
    }

    /// An interrupting-priority candidate is suppressed while the open
    /// section has not finished.
    fn can_interrupt(&self, matched: &SectionInfo, open: &SectionInfo) -> bool {
        let priority = self.kind.inner.tree.node(matched.node).priority;
        !(priority == SectionPriority::Interrupting && !open.has_been_completed)
    }

    fn complete_section(&mut self, info: &mut SectionInfo) -> Result<(), FileError> {
        update_count(&mut self.counts, info);
        info.has_been_completed = true;
        trace!("{}: completed {}", self.name(), info.section.name());
        self.handler.on_match(&info.section)
    }

    /// Counters are kept only for the latest instance of a parent
    /// section, so a newly opened parent resets its subsections.
    fn clear_subsection_counts(&mut self, node: usize) {
        for &child in &self.kind.inner.tree.node(node).children {
            self.counts.remove(&child);
        }
    }

    /// Exactly `separator_count` blank raw lines must precede the new
    /// section, and the raw line before the run must not be blank. Lines
    /// before the start of the document count as non-blank.
    fn validate_separators(&self, info: &SectionInfo, raw_lines: &[&str]) -> Result<(), FileError> {
        let to_index = info.section.starting_line_index();
        let separator_count = self.kind.inner.tree.node(info.node).separator_count;
        let invalid = || FileError::InvalidSeparators {
            name: self.name(),
            section: info.section.name(),
            line: to_index,
        };

        if separator_count > to_index {
            return Err(invalid());
        }
        let from_index = to_index - separator_count;
        if raw_lines[from_index..to_index]
            .iter()
            .any(|&raw| raw != SEPARATOR)
        {
            return Err(invalid());
        }
        if from_index > 0 && raw_lines[from_index - 1] == SEPARATOR {
            return Err(invalid());
        }
        Ok(())
    }

    fn update_expected(&mut self, matched: Option<usize>) {
        let node = matched.unwrap_or(self.kind.inner.tree.roots()[0]);
        self.expected = self.select_expected(node, false);
    }

    /// The grammar analogue of the section-level expected set: descend
    /// into subsections on a fresh match, otherwise scan siblings from
    /// the (cluster-adjusted) matched position, climbing to the parent's
    /// siblings when the scan runs off the end with no unordered sibling
    /// outstanding. The result is sorted by priority, highest first.
    fn select_expected(&self, node: usize, upwards: bool) -> Vec<usize> {
        let tree = &self.kind.inner.tree;
        let mut expected = Vec::new();

        let possible: Vec<usize> = if upwards || tree.node(node).children.is_empty() {
            let siblings = tree.siblings(node);
            let mut index = siblings
                .iter()
                .position(|&sibling| sibling == node)
                .expect("node is in its sibling list");
            if !tree.node(node).ordered {
                while index > 0 && !tree.node(siblings[index]).ordered {
                    index -= 1;
                }
            }
            siblings[index..].to_vec()
        } else {
            tree.node(node).children.clone()
        };

        let mut has_unconsumed_unordered = false;
        for (position, &candidate) in possible.iter().enumerate() {
            let n = tree.node(candidate);
            let matched = self.counts.get(&candidate).copied().unwrap_or(0);
            let consumed = is_consumed(n.optional, n.count, matched);
            let can_consume_more = n.count.can_consume_more(matched);

            if n.ordered {
                if has_unconsumed_unordered {
                    break;
                }
                if can_consume_more {
                    expected.push(candidate);
                }
                if !consumed {
                    break;
                }
            } else {
                if can_consume_more {
                    expected.push(candidate);
                }
                if !consumed {
                    has_unconsumed_unordered = true;
                }
            }

            if position == possible.len() - 1 && !has_unconsumed_unordered {
                if let Some(parent) = n.parent {
                    expected.extend(self.select_expected(parent, true));
                }
            }
        }

        expected.sort_by_key(|&candidate| Reverse(tree.node(candidate).priority));
        expected
    }

    fn finish(&mut self) -> Result<(), FileError> {
        if !self.is_consumed() {
            return Err(FileError::Unterminated { name: self.name() });
        }
        self.expected.clear();
        debug!("{}: completed {}", self.name(), self.path.display());
        self.handler.on_complete()
    }

    /// True once every root definition's counter is satisfied.
    fn is_consumed(&self) -> bool {
        let tree = &self.kind.inner.tree;
        tree.roots().iter().all(|&root| {
            let node = tree.node(root);
            is_consumed(
                node.optional,
                node.count,
                self.counts.get(&root).copied().unwrap_or(0),
            )
        })
    }
}

fn update_count(counts: &mut HashMap<usize, usize>, info: &mut SectionInfo) {
    if !info.has_updated_count {
        *counts.entry(info.node).or_insert(0) += 1;
        info.has_updated_count = true;
    }
}

impl PartialEq for File {
    fn eq(&self, other: &File) -> bool {
        self.path == other.path
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
