//! End-to-end parse of a Spanish learning-notes document.

use std::collections::BTreeSet;

use folio_parse::patterns::{
    ANY_TEXT_EXCEPT_BLANK_PATTERN, CAPITALISED_WORD_PATTERN, TAGS_PATTERN, TITLE_PATTERN,
};
use folio_parse::{
    File, FileError, FileHandler, FileKind, LineDefinition, LineMatch, Section, SectionDefinition,
    SectionError, SectionHandler, SectionKind,
};

const DOCUMENT: &str = "\
Learning Spanish
`[spanish_file]`

Tasks
- [x] Establish a study schedule
- [ ] Find a teacher

W) Feliz
Meaning: Happy
Synonyms: Alegre, Contento
Antonyms: Triste
Examples:
- Estoy muy feliz (I am very happy)

G) Ser vs estar
'Ser' relates to essence or identity, while 'estar' relates to state or condition.
Examples:
- Ella es profesora (She is a teacher)
- Ella est\u{e1} cansada (She is tired)
";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Task {
    title: String,
    completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Example {
    text: String,
    translation: String,
}

impl Example {
    fn new(text: &str, translation: &str) -> Example {
        Example {
            text: text.to_string(),
            translation: translation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    text: String,
    meaning: String,
    synonyms: BTreeSet<String>,
    antonyms: BTreeSet<String>,
    examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GrammarRule {
    text: String,
    explanation: String,
    examples: Vec<Example>,
}

fn header_kind() -> SectionKind {
    SectionKind::new(
        "HeaderSection",
        vec![
            LineDefinition::new("^Learning Spanish$"),
            LineDefinition::new(TAGS_PATTERN),
        ],
        || (),
    )
    .unwrap()
}

#[derive(Default)]
struct TasksSection {
    tasks: Vec<Task>,
}

impl SectionHandler for TasksSection {
    fn on_match(&mut self, m: &LineMatch<'_>) -> Result<(), SectionError> {
        if m.index == 1 {
            self.tasks.push(Task {
                title: m.group(2).to_string(),
                completed: m.group(1) == "x",
            });
        }
        Ok(())
    }
}

fn tasks_kind() -> SectionKind {
    SectionKind::new(
        "TasksSection",
        vec![
            LineDefinition::new("^Tasks$"),
            LineDefinition::new(format!(r"- \[(x| )\] ({TITLE_PATTERN})")).unlimited(),
        ],
        TasksSection::default,
    )
    .unwrap()
}

fn examples_definitions() -> Vec<LineDefinition> {
    vec![
        LineDefinition::new("^Examples:$"),
        LineDefinition::new(format!(r"- ({TITLE_PATTERN}) \(({TITLE_PATTERN})\)")).unlimited(),
    ]
}

/// Groups past the first of a repeated capture, deduplicated. Repeated
/// groups only keep their last occurrence, which is fine for the
/// two-entry lists in this format.
fn captured_set(m: &LineMatch<'_>) -> Result<BTreeSet<String>, SectionError> {
    let groups: Vec<&str> = m
        .captures
        .iter()
        .skip(1)
        .flatten()
        .map(|group| group.as_str())
        .collect();
    let set: BTreeSet<String> = groups.iter().map(|group| group.to_string()).collect();
    if set.len() < groups.len() {
        return Err(SectionError::handler("Cannot have duplicate entries"));
    }
    Ok(set)
}

#[derive(Default)]
struct WordSection {
    text: String,
    meaning: String,
    synonyms: BTreeSet<String>,
    antonyms: BTreeSet<String>,
    examples: Vec<Example>,
    word: Option<Word>,
}

impl SectionHandler for WordSection {
    fn on_match(&mut self, m: &LineMatch<'_>) -> Result<(), SectionError> {
        match m.index {
            0 => self.text = m.group(1).to_string(),
            1 => self.meaning = m.group(1).to_string(),
            2 => self.synonyms = captured_set(m)?,
            3 => self.antonyms = captured_set(m)?,
            5 => self.examples.push(Example::new(m.group(1), m.group(2))),
            _ => {}
        }
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), SectionError> {
        self.word = Some(Word {
            text: self.text.clone(),
            meaning: self.meaning.clone(),
            synonyms: self.synonyms.clone(),
            antonyms: self.antonyms.clone(),
            examples: self.examples.clone(),
        });
        Ok(())
    }
}

fn word_kind() -> SectionKind {
    let mut definitions = vec![
        LineDefinition::new(format!(r"^W\) ({CAPITALISED_WORD_PATTERN})$")),
        LineDefinition::new(format!(r"^Meaning: ({CAPITALISED_WORD_PATTERN})$")),
        LineDefinition::new(format!(
            r"^Synonyms: ({CAPITALISED_WORD_PATTERN})(?:, ({CAPITALISED_WORD_PATTERN}))*$"
        ))
        .optional(),
        LineDefinition::new(format!(
            r"^Antonyms: ({CAPITALISED_WORD_PATTERN})(?:, ({CAPITALISED_WORD_PATTERN}))*$"
        ))
        .optional(),
    ];
    definitions.extend(examples_definitions());
    SectionKind::new("WordSection", definitions, WordSection::default).unwrap()
}

#[derive(Default)]
struct GrammarSection {
    text: String,
    explanation: String,
    examples: Vec<Example>,
    grammar_rule: Option<GrammarRule>,
}

impl SectionHandler for GrammarSection {
    fn on_match(&mut self, m: &LineMatch<'_>) -> Result<(), SectionError> {
        match m.index {
            0 => self.text = m.group(1).to_string(),
            1 => self.explanation = m.group(1).to_string(),
            3 => self.examples.push(Example::new(m.group(1), m.group(2))),
            _ => {}
        }
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), SectionError> {
        self.grammar_rule = Some(GrammarRule {
            text: self.text.clone(),
            explanation: self.explanation.clone(),
            examples: self.examples.clone(),
        });
        Ok(())
    }
}

fn grammar_kind() -> SectionKind {
    let mut definitions = vec![
        LineDefinition::new(format!(r"^G\) ({TITLE_PATTERN})$")),
        LineDefinition::new(ANY_TEXT_EXCEPT_BLANK_PATTERN),
    ];
    definitions.extend(examples_definitions());
    SectionKind::new("GrammarSection", definitions, GrammarSection::default).unwrap()
}

#[derive(Default)]
struct SpanishFile {
    tasks: Vec<Task>,
    words: Vec<Word>,
    grammar_rules: Vec<GrammarRule>,
}

impl FileHandler for SpanishFile {
    fn on_match(&mut self, section: &Section) -> Result<(), FileError> {
        if let Some(tasks) = section.handler::<TasksSection>() {
            self.tasks = tasks.tasks.clone();
        } else if let Some(word) = section.handler::<WordSection>() {
            self.words.push(word.word.clone().expect("completed word"));
        } else if let Some(grammar) = section.handler::<GrammarSection>() {
            self.grammar_rules
                .push(grammar.grammar_rule.clone().expect("completed rule"));
        }
        Ok(())
    }
}

fn spanish_kind() -> FileKind {
    FileKind::new(
        "SpanishFile",
        "spanish_file",
        vec![
            SectionDefinition::new(&header_kind()),
            SectionDefinition::new(&tasks_kind()).optional(),
            SectionDefinition::new(&word_kind()).unlimited().unordered(),
            SectionDefinition::new(&grammar_kind()).unlimited().unordered(),
        ],
        SpanishFile::default,
    )
    .unwrap()
}

#[test]
fn test_parse() {
    let kind = spanish_kind();

    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("learning_spanish.txt");
    std::fs::write(&path, DOCUMENT).unwrap();

    // Dispatch through the registry rather than naming the kind.
    let mut file = File::matched(&path).unwrap();
    assert_eq!(file.name(), kind.name());
    file.parse().unwrap();

    let spanish = file.handler::<SpanishFile>().unwrap();

    assert_eq!(
        spanish.tasks,
        [
            Task {
                title: "Establish a study schedule".to_string(),
                completed: true,
            },
            Task {
                title: "Find a teacher".to_string(),
                completed: false,
            },
        ]
    );

    assert_eq!(
        spanish.words,
        [Word {
            text: "Feliz".to_string(),
            meaning: "Happy".to_string(),
            synonyms: BTreeSet::from(["Alegre".to_string(), "Contento".to_string()]),
            antonyms: BTreeSet::from(["Triste".to_string()]),
            examples: vec![Example::new("Estoy muy feliz", "I am very happy")],
        }]
    );

    assert_eq!(
        spanish.grammar_rules,
        [GrammarRule {
            text: "Ser vs estar".to_string(),
            explanation: "'Ser' relates to essence or identity, \
                          while 'estar' relates to state or condition."
                .to_string(),
            examples: vec![
                Example::new("Ella es profesora", "She is a teacher"),
                Example::new("Ella est\u{e1} cansada", "She is tired"),
            ],
        }]
    );
}
