//! A loaded source buffer: a file on disk, stdin, or an in-memory macro
//! re-expansion buffer, all represented the same way so the lexer never
//! needs to know which one it's looking at.

use std::{path::PathBuf, rc::Rc};

/// A named, in-memory text buffer. `name` is what shows up in diagnostics
/// (`"foo.c"`, `"stdin"`, `"<command line>"`); `path` is only present for
/// real files, and is consulted when resolving a `"relative"` `#include`.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub name: String,
    pub path: Option<PathBuf>,
    pub contents: Rc<str>,
}

impl SourceText {
    pub fn new(name: impl Into<String>, contents: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            path: None,
            contents: contents.into(),
        }
    }

    pub fn from_file(name: impl Into<String>, path: PathBuf, contents: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            path: Some(path),
            contents: contents.into(),
        }
    }
}
