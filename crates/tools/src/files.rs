//! The created-file ledger.
//!
//! Every successful `create_file` call appends a [`CreatedFile`]. The ledger
//! is session-scoped and only ever grows until it is cleared explicitly.

use serde::{Deserialize, Serialize};

/// A file written by the `create_file` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedFile {
    /// Base name, no directory components
    pub name: String,

    /// The exact content written
    pub content: String,
}

impl CreatedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// MIME type used when the file is offered for download.
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("html") | Some("htm") => "text/html",
            _ => "text/plain",
        }
    }
}

/// Ordered record of created files. Entries are never mutated or removed
/// individually; writing the same name twice records two entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedFiles {
    entries: Vec<CreatedFile>,
}

impl CreatedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: CreatedFile) {
        self.entries.push(file);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CreatedFile> {
        self.entries.iter()
    }

    /// The most recent entry with this name.
    pub fn get(&self, name: &str) -> Option<&CreatedFile> {
        self.entries.iter().rev().find(|f| f.name == name)
    }

    /// Entries added after a snapshot taken with [`len`](Self::len).
    pub fn since(&self, snapshot: usize) -> &[CreatedFile] {
        self.entries.get(snapshot..).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
