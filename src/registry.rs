//! The process-wide file-kind registry.
//!
//! The registry maps file-tags to [`FileKind`]s. It is written only
//! while grammars are constructed, which happens at program start-up,
//! and read by [`File::matched`](crate::File::matched) during dispatch;
//! it is never mutated during a parse.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::error::DefinitionError;
use crate::files::FileKind;

lazy_static! {
    static ref REGISTRY: Mutex<HashMap<String, FileKind>> = Mutex::new(HashMap::new());
}

/// Claim `kind`'s tag. Duplicate tags are construction-time errors.
pub(crate) fn register(kind: &FileKind) -> Result<(), DefinitionError> {
    let mut registry = REGISTRY.lock().expect("file-kind registry lock");
    if registry.contains_key(kind.tag()) {
        return Err(DefinitionError::DuplicateFileTag {
            tag: kind.tag().to_string(),
        });
    }
    registry.insert(kind.tag().to_string(), kind.clone());
    Ok(())
}

/// The kind registered for `tag`, if any.
pub fn find(tag: &str) -> Option<FileKind> {
    REGISTRY
        .lock()
        .expect("file-kind registry lock")
        .get(tag)
        .cloned()
}
