use crate::hash::Hash;
use crate::types::FileStatus;

/// one line of a snapshot listing: a relative path, its status and,
/// for readable regular files, the content hash
///
/// entries are not `Clone`; they move from the scanner into the snapshot
/// and out again by iterating it by value.
#[derive(Debug, PartialEq, Eq)]
pub struct DirListEntry {
    path: String,
    status: FileStatus,
    hash: Option<Hash>,
}

impl DirListEntry {
    pub fn new(path: impl Into<String>, status: FileStatus, hash: Option<Hash>) -> Self {
        Self {
            path: path.into(),
            status,
            hash,
        }
    }

    /// path relative to the snapshot root
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> &FileStatus {
        &self.status
    }

    /// content hash, absent for directories and unreadable or irregular files
    pub fn hash(&self) -> Option<&Hash> {
        self.hash.as_ref()
    }
}
