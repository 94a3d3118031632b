use std::fs::File;
use std::io::Read;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{ContentHasher, Hash, HashAlgorithm};
use crate::snapshot::Snapshot;
use crate::types::{DirListEntry, FileStatus};

/// enumerate `root` into a snapshot
///
/// entries are relative, `/` separated and sorted by walk order (file name
/// within each directory). symlinks are recorded, not followed. only
/// readable regular files get a hash.
pub fn scan(root: &Path, algorithm: HashAlgorithm) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::Io {
                path,
                source: e.into(),
            }
        })?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let status = FileStatus::from_metadata(&meta);

        let hash = if status.is_regular() {
            match hash_file(path, algorithm) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot hash file, recording without hash");
                    None
                }
            }
        } else {
            None
        };

        snapshot.push(DirListEntry::new(relative_path(root, path)?, status, hash));
    }

    tracing::debug!(root = %root.display(), entries = snapshot.len(), "scanned");
    Ok(snapshot)
}

/// hash a file's content without loading it whole
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<Hash> {
    let mut file = File::open(path).with_path(path)?;
    let mut hasher = ContentHasher::new(algorithm);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).with_path(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let invalid = |reason| Error::InvalidPath {
        path: path.to_path_buf(),
        reason,
    };
    let rel = path
        .strip_prefix(root)
        .map_err(|_| invalid("outside the scanned root"))?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| invalid("not valid utf-8"))?;
        // tab separates fields and newline ends the line in a listing
        if part.contains(['\t', '\n', '\r']) {
            return Err(invalid("contains a tab or line break"));
        }
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::compute_hash;
    use crate::types::FileKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_tree() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/tool"), b"").unwrap();
        fs::write(dir.path().join("readme"), b"hello").unwrap();
        std::os::unix::fs::symlink("readme", dir.path().join("link")).unwrap();

        let snapshot = scan(dir.path(), HashAlgorithm::Md5).unwrap();
        let paths: Vec<_> = snapshot.entries().iter().map(|e| e.path()).collect();
        assert_eq!(paths, vec!["bin", "bin/tool", "link", "readme"]);

        let entries = snapshot.entries();
        assert_eq!(entries[0].status().kind, FileKind::Directory);
        assert!(entries[0].hash().is_none());

        assert_eq!(
            entries[1].hash().map(|h| h.to_hex()),
            Some("d41d8cd98f00b204e9800998ecf8427e".to_string())
        );

        assert_eq!(entries[2].status().kind, FileKind::Symlink);
        assert!(entries[2].hash().is_none());

        assert_eq!(
            entries[3].hash(),
            Some(&compute_hash(HashAlgorithm::Md5, b"hello"))
        );
        assert_eq!(entries[3].status().size, 5);
    }

    #[test]
    fn test_scan_renders_and_parses_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a file"), b"x").unwrap();

        let snapshot = scan(dir.path(), HashAlgorithm::Sha1).unwrap();
        let parsed = Snapshot::parse(&snapshot.render()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_scan_rejects_separator_in_name() {
        for name in ["a\tb", "line\nbreak", "cr\r"] {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(name), b"x").unwrap();
            assert!(
                matches!(
                    scan(dir.path(), HashAlgorithm::Sha1),
                    Err(Error::InvalidPath { .. })
                ),
                "accepted {:?}",
                name
            );
        }
    }

    #[test]
    fn test_scan_keeps_edge_whitespace() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(" lead"), b"x").unwrap();
        fs::write(dir.path().join("trail "), b"y").unwrap();

        let snapshot = scan(dir.path(), HashAlgorithm::Sha1).unwrap();
        let parsed = Snapshot::parse(&snapshot.render()).unwrap();
        let paths: Vec<_> = parsed.entries().iter().map(|e| e.path()).collect();
        assert_eq!(paths, vec![" lead", "trail "]);
    }

    #[test]
    fn test_scan_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(scan(dir.path(), HashAlgorithm::Sha1).unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempdir().unwrap();
        assert!(scan(&dir.path().join("nope"), HashAlgorithm::Sha1).is_err());
    }

    #[test]
    fn test_hash_file_matches_buffer_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big");
        let content = vec![7u8; 200 * 1024];
        fs::write(&path, &content).unwrap();

        assert_eq!(
            hash_file(&path, HashAlgorithm::Sha1).unwrap(),
            compute_hash(HashAlgorithm::Sha1, &content)
        );
    }
}
