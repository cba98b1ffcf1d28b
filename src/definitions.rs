//! Section definition trees and their validation.
//!
//! A file grammar is a forest of [`SectionDefinition`]s. Before parsing,
//! the forest is flattened into an arena of nodes; a node's index in the
//! arena is the *identifier* the outer engine counts matches under, so
//! the same section kind declared at two tree positions keeps two
//! independent counters.
//!
//! The validator rejects grammars the engine could not drive without
//! guessing: a kind must never appear in its own next-possible set (the
//! engine would not know whether a fresh match repeats the current
//! definition or advances to the later one), and a kind may not appear in
//! its own subsection closure.

use crate::error::DefinitionError;
use crate::lines::Count;
use crate::sections::SectionKind;

/// Relative precedence among section candidates competing for the same
/// line. Higher priorities are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionPriority {
    /// Matches only once the previously open section has completed.
    /// Intended for broad patterns that would otherwise absorb the
    /// remaining lines of the section still being consumed.
    Interrupting,
    /// Tried after default-priority candidates.
    Lower,
    /// The ordinary priority.
    Default,
    /// Tried before default-priority candidates.
    Higher,
}

impl Default for SectionPriority {
    fn default() -> SectionPriority {
        SectionPriority::Default
    }
}

/// One node of a file grammar: a section kind with cardinality, ordering,
/// priority, separator requirements and optional subsections.
///
/// ```
/// use folio_parse::{LineDefinition, SectionDefinition, SectionKind};
///
/// let note = SectionKind::new("NoteSection", vec![LineDefinition::new("Note")], || ()).unwrap();
/// let group = SectionKind::new("GroupSection", vec![LineDefinition::new("Group")], || ()).unwrap();
///
/// let _definition = SectionDefinition::new(&group)
///     .unlimited()
///     .unordered()
///     .subsections(vec![SectionDefinition::new(&note)]);
/// ```
#[derive(Debug, Clone)]
pub struct SectionDefinition {
    kind: SectionKind,
    subsections: Vec<SectionDefinition>,
    optional: bool,
    ordered: bool,
    count: Count,
    priority: SectionPriority,
    separator_count: usize,
}

impl SectionDefinition {
    /// A definition of `kind` matching exactly once, in declaration
    /// order, at default priority, preceded by one blank separator line.
    pub fn new(kind: &SectionKind) -> SectionDefinition {
        SectionDefinition {
            kind: kind.clone(),
            subsections: Vec::new(),
            optional: false,
            ordered: true,
            count: Count::default(),
            priority: SectionPriority::default(),
            separator_count: 1,
        }
    }

    /// The section may be absent.
    pub fn optional(mut self) -> SectionDefinition {
        self.optional = true;
        self
    }

    /// The section may appear in any order within its run of unordered
    /// neighbors.
    pub fn unordered(mut self) -> SectionDefinition {
        self.ordered = false;
        self
    }

    /// The section must appear exactly `times` times.
    pub fn repeats(mut self, times: usize) -> SectionDefinition {
        self.count = Count::Times(times);
        self
    }

    /// The section may appear any number of times.
    pub fn unlimited(mut self) -> SectionDefinition {
        self.count = Count::Unlimited;
        self
    }

    /// The section's precedence among candidates for the same line.
    pub fn priority(mut self, priority: SectionPriority) -> SectionDefinition {
        self.priority = priority;
        self
    }

    /// Number of blank lines required immediately before the section.
    pub fn separators(mut self, count: usize) -> SectionDefinition {
        self.separator_count = count;
        self
    }

    /// Sections nested under this one. They are expected once the parent
    /// section's own lines have been consumed.
    pub fn subsections(mut self, subsections: Vec<SectionDefinition>) -> SectionDefinition {
        self.subsections = subsections;
        self
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub kind: SectionKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub optional: bool,
    pub ordered: bool,
    pub count: Count,
    pub priority: SectionPriority,
    pub separator_count: usize,
}

/// A file grammar flattened into an arena. Node indices are the counter
/// identifiers used by the outer engine.
#[derive(Debug)]
pub(crate) struct SectionTree {
    nodes: Vec<Node>,
    roots: Vec<usize>,
}

impl SectionTree {
    pub fn build(definitions: &[SectionDefinition]) -> Result<SectionTree, DefinitionError> {
        let mut tree = SectionTree {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        tree.roots = tree.add_all(definitions, None)?;
        tree.validate_ids(&tree.roots)?;
        Ok(tree)
    }

    fn add_all(
        &mut self,
        definitions: &[SectionDefinition],
        parent: Option<usize>,
    ) -> Result<Vec<usize>, DefinitionError> {
        let mut ids = Vec::new();
        for definition in definitions {
            if definition.count == Count::Times(0) {
                return Err(DefinitionError::ZeroSectionCount {
                    kind: definition.kind.name(),
                });
            }
            let id = self.nodes.len();
            self.nodes.push(Node {
                kind: definition.kind.clone(),
                parent,
                children: Vec::new(),
                optional: definition.optional,
                ordered: definition.ordered,
                count: definition.count,
                priority: definition.priority,
                separator_count: definition.separator_count,
            });
            let children = self.add_all(&definition.subsections, Some(id))?;
            self.nodes[id].children = children;
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// The sibling list containing `id`: the root list or its parent's
    /// children.
    pub fn siblings(&self, id: usize) -> &[usize] {
        match self.nodes[id].parent {
            Some(parent) => &self.nodes[parent].children,
            None => &self.roots,
        }
    }

    fn validate_ids(&self, ids: &[usize]) -> Result<(), DefinitionError> {
        for &id in ids {
            let node = &self.nodes[id];
            let mut next_possible = Vec::new();
            self.next_possible_kinds(id, false, &mut next_possible);
            if next_possible.iter().any(|kind| kind.same_kind(&node.kind)) {
                return Err(DefinitionError::AmbiguousDefinition {
                    kind: node.kind.name(),
                });
            }
            if !node.children.is_empty() {
                if self
                    .descendant_kinds(id)
                    .iter()
                    .any(|kind| kind.same_kind(&node.kind))
                {
                    return Err(DefinitionError::SelfEmbeddingDefinition {
                        kind: node.kind.name(),
                    });
                }
                self.validate_ids(&node.children)?;
            }
        }
        Ok(())
    }

    /// Every kind in the subsection closure of `id`.
    pub fn descendant_kinds(&self, id: usize) -> Vec<SectionKind> {
        let mut kinds = Vec::new();
        let mut pending = self.nodes[id].children.clone();
        while let Some(child) = pending.pop() {
            kinds.push(self.nodes[child].kind.clone());
            pending.extend(self.nodes[child].children.iter().copied());
        }
        kinds
    }

    /// Collect the kinds that may start a section immediately after the
    /// first match of `id`, walking right over optional and unordered
    /// siblings and climbing to the parent's siblings when the walk runs
    /// off the end of a subsection list.
    fn next_possible_kinds(&self, id: usize, upwards: bool, out: &mut Vec<SectionKind>) {
        let siblings = self.siblings(id);
        let mut index = siblings
            .iter()
            .position(|&sibling| sibling == id)
            .expect("node is in its sibling list");

        if upwards && !self.nodes[id].ordered {
            while index > 0 && !self.nodes[siblings[index]].ordered {
                index -= 1;
            }
        }

        let possible = &siblings[index..];
        let mut last_continued = None;
        for &candidate in possible {
            if upwards || candidate != id {
                out.push(self.nodes[candidate].kind.clone());
            } else {
                last_continued = Some(candidate);
                continue;
            }
            if upwards && candidate == id {
                last_continued = Some(candidate);
                continue;
            }
            let node = &self.nodes[candidate];
            if node.optional || !node.ordered {
                last_continued = Some(candidate);
                continue;
            }
            break;
        }

        if let Some(last) = last_continued {
            let reached_end = possible.last() == Some(&last);
            if reached_end {
                if let Some(parent) = self.nodes[last].parent {
                    self.next_possible_kinds(parent, true, out);
                }
            }
        }
    }
}
