//! WAL Entry definitions
//!
//! Defines the mutation intent carried by one log frame.

/// Kind of mutation recorded by a LogEntry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Store a value under a key
    Set = 1,

    /// Remove a key
    Delete = 2,
}

impl EntryKind {
    /// Map the on-disk kind byte back to a kind.
    ///
    /// Returns `None` for kinds this build does not know; replay skips those.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(EntryKind::Set),
            2 => Some(EntryKind::Delete),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A single mutation handed to the WAL.
///
/// Immutable once built: fields are private and the WAL only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    kind: EntryKind,
    key: String,
    value: Vec<u8>,
}

impl LogEntry {
    /// A Set entry
    pub fn set(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: EntryKind::Set,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A Delete entry (carries no value)
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value of a Set entry; always empty for Delete
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Split the entry into owned parts (used when applying to the index)
    pub fn into_parts(self) -> (EntryKind, String, Vec<u8>) {
        (self.kind, self.key, self.value)
    }
}
