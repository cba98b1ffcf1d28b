//! Pattern constants and memoized regex compilation.
//!
//! The engine treats patterns as opaque strings; everything here other
//! than the separator and tag patterns exists for grammar authors, who
//! are free to ignore it.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;
use regex::Regex;

/// A blank line once trailing whitespace is stripped: the section
/// separator.
pub const SEPARATOR: &str = "";

/// Matches the blank separator line.
pub const SEPARATOR_PATTERN: &str = "^$";

/// A single document tag: lowercase words joined by underscores.
pub const TAG_PATTERN: &str = r"([a-z]+_)*[a-z]+";

/// The backtick-quoted tags line on the second line of every document,
/// e.g. `` `[spanish_file][draft, review]` ``.
pub const TAGS_PATTERN: &str = r"^`(?:\[([a-z]+_)*[a-z]+(?:, ?([a-z]+_)*[a-z]+)*\])+`$";

/// Tags that dispatch to a file kind: `spanish_file`, `reading_list_file`.
pub const FILE_TAG_PATTERN: &str = r"^([a-z]{2,}_)+file$";

/// A capitalised title.
pub const TITLE_PATTERN: &str = r"[A-Z][\w,-:–'& ]+\w";

/// A capitalised sentence with closing punctuation.
pub const SENTENCE_PATTERN: &str = r"[A-Z][\w,-:–'& ]+\w[\.\!\?]";

/// A capitalised question.
pub const QUESTION_PATTERN: &str = r"[A-Z][\w,-:–'& ]+\w\?";

/// A single capitalised word.
pub const CAPITALISED_WORD_PATTERN: &str = r"[A-Z][a-z-]+";

/// A day of the month; range checks are left to date handling.
pub const DAY_PATTERN: &str = r"([0-9]{1,2})";

/// A zero-padded month number.
pub const MONTH_PATTERN: &str = r"(0[0-9]|1[0-2])";

/// A month by name.
pub const MONTH_NAME_PATTERN: &str =
    r"(January|February|March|April|May|June|July|August|September|October|November|December)";

/// A weekday by name.
pub const WEEKDAY_PATTERN: &str = r"(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)";

/// A four-digit year from 2000 on.
pub const YEAR_PATTERN: &str = r"([2-9][0-9]{3})";

/// A `dd/mm/yyyy` date.
pub const DATE_PATTERN: &str = r"((?:[0-2][0-9]|(?:3)[0-1])/(?:0[0-9]|1[0-2])/(?:[2-9][0-9]{3}))";

/// Free text that is not a heading.
pub const ANY_TEXT_PATTERN: &str = r"^(?: +)?((?:[^ #].*)|(?:))$";

/// Free text that is not a heading and not blank.
pub const ANY_TEXT_EXCEPT_BLANK_PATTERN: &str = r"^(?: +)?((?:[^ #]\w.*))$";

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(TAG_PATTERN).unwrap();
    static ref TAGS_RE: Regex = Regex::new(TAGS_PATTERN).unwrap();
    static ref FILE_TAG_RE: Regex = Regex::new(FILE_TAG_PATTERN).unwrap();
    static ref COMPILED: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// Unanchored tag regex, for extracting the file-tag from a tags line.
pub(crate) fn tag_regex() -> &'static Regex {
    &TAG_RE
}

/// The whole-tags-line regex.
pub(crate) fn tags_regex() -> &'static Regex {
    &TAGS_RE
}

/// The file-tag regex.
pub(crate) fn file_tag_regex() -> &'static Regex {
    &FILE_TAG_RE
}

/// Compile `pattern` anchored at the start of a line, reusing earlier
/// compilations of the same pattern string.
pub(crate) fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    let mut cache = COMPILED.lock().expect("pattern cache lock");
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&format!(r"\A(?:{pattern})"))?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}
