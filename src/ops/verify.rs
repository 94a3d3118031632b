use std::fmt;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::Store;

/// result of checking a labelled snapshot against the store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// distinct content hashes checked
    pub checked: usize,
    pub missing: Vec<Hash>,
    pub corrupt: Vec<Hash>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked {} objects: {} missing, {} corrupt",
            self.checked,
            self.missing.len(),
            self.corrupt.len()
        )
    }
}

/// check that every content hash in the labelled snapshot is stored intact
pub fn verify(store: &Store, label: &str) -> Result<VerifyReport> {
    let snapshot = store.get_snapshot(label)?;
    let mut report = VerifyReport::default();

    for hash in snapshot.hashes() {
        report.checked += 1;
        match store.get(&hash) {
            Ok(_) => {}
            Err(Error::ObjectNotFound(h)) => report.missing.push(h),
            Err(Error::CorruptObject(h)) => report.corrupt.push(h),
            Err(e) => return Err(e),
        }
    }

    if !report.is_ok() {
        tracing::warn!(label, %report, "snapshot incomplete");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::hash::{compute_hash, HashAlgorithm};
    use crate::snapshot::Snapshot;
    use crate::types::{DirListEntry, FileKind, FileStatus};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_verify_reports_missing_and_corrupt() {
        let dir = tempdir().unwrap();
        let store = Store::init(&dir.path().join("store"), Config::default()).unwrap();

        let good = store.put(b"good").unwrap();
        let bad = store.put(b"bad").unwrap();
        fs::write(store.object_path(&bad), b"rotten").unwrap();
        let gone = compute_hash(HashAlgorithm::Sha1, b"gone");

        let status = FileStatus::new(FileKind::Regular, 0o644, 4, 0);
        let snapshot: Snapshot = [good, bad, gone]
            .into_iter()
            .enumerate()
            .map(|(i, h)| DirListEntry::new(format!("f{}", i), status.clone(), Some(h)))
            .collect();
        store.put_snapshot("check", &snapshot).unwrap();

        let report = verify(&store, "check").unwrap();
        assert_eq!(report.checked, 3);
        assert_eq!(report.missing, vec![gone]);
        assert_eq!(report.corrupt, vec![bad]);
        assert!(!report.is_ok());
    }

    #[test]
    fn test_verify_clean_snapshot() {
        let dir = tempdir().unwrap();
        let store = Store::init(&dir.path().join("store"), Config::default()).unwrap();
        store.put_snapshot("empty", &Snapshot::new()).unwrap();

        let report = verify(&store, "empty").unwrap();
        assert!(report.is_ok());
        assert_eq!(report.to_string(), "checked 0 objects: 0 missing, 0 corrupt");
    }

    #[test]
    fn test_verify_unknown_label() {
        let dir = tempdir().unwrap();
        let store = Store::init(&dir.path().join("store"), Config::default()).unwrap();
        assert!(matches!(
            verify(&store, "nope"),
            Err(Error::LabelNotFound(_))
        ));
    }
}
