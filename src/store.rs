use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::config::Config;
use crate::error::{Error, IoResultExt, Result};
use crate::hash::{compute_hash, ContentHasher, Hash};
use crate::snapshot::Snapshot;
use crate::wait::{retry, WaitCondition};

/// a sharded content store
///
/// objects live at `objects/<storage address>`, labels under `labels/`
/// hold the hash of a snapshot object.
pub struct Store {
    path: PathBuf,
    config: Config,
}

impl Store {
    /// initialize a new store at the given path
    pub fn init(path: &Path, config: Config) -> Result<Self> {
        let config_path = path.join("config.toml");
        if config_path.exists() {
            return Err(Error::StoreExists(path.to_path_buf()));
        }

        fs::create_dir_all(path.join("objects")).with_path(path)?;
        fs::create_dir_all(path.join("labels")).with_path(path)?;
        fs::create_dir_all(path.join("tmp")).with_path(path)?;
        config.save(&config_path)?;

        tracing::info!(path = %path.display(), algorithm = %config.algorithm, "initialized store");
        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// open an existing store
    pub fn open(path: &Path) -> Result<Self> {
        let config_path = path.join("config.toml");
        if !config_path.exists() {
            return Err(Error::NoStore(path.to_path_buf()));
        }

        let config = Config::load(&config_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// store root path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn objects_path(&self) -> PathBuf {
        self.path.join("objects")
    }

    pub fn labels_path(&self) -> PathBuf {
        self.path.join("labels")
    }

    /// path to tmp directory (for atomic writes)
    pub fn tmp_path(&self) -> PathBuf {
        self.path.join("tmp")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path.join(".lock")
    }

    /// on-disk location of an object
    pub fn object_path(&self, hash: &Hash) -> PathBuf {
        let (first, second, rest) = hash.to_path_components();
        self.objects_path().join(first).join(second).join(rest)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.object_path(hash).is_file()
    }

    /// store a buffer, returning its hash; existing content is not rewritten
    pub fn put(&self, content: &[u8]) -> Result<Hash> {
        let hash = compute_hash(self.config.algorithm, content);
        if self.contains(&hash) {
            return Ok(hash);
        }

        let tmp_path = self.new_tmp_path();
        {
            let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
            tmp_file.write_all(content).with_path(&tmp_path)?;
            tmp_file.sync_all().with_path(&tmp_path)?;
        }
        self.install(&tmp_path, &hash)?;
        Ok(hash)
    }

    /// store a file's content, streaming it through the hasher
    pub fn put_file(&self, source: &Path) -> Result<Hash> {
        let (tmp_path, hash) = self.stage_file(source)?;
        self.commit(&tmp_path, &hash)?;
        Ok(hash)
    }

    /// store a file's content only if it still hashes to `expected`
    ///
    /// on a mismatch nothing is installed and `ContentChanged` is returned.
    pub fn put_file_expecting(&self, source: &Path, expected: &Hash) -> Result<()> {
        let (tmp_path, hash) = self.stage_file(source)?;
        if hash != *expected {
            fs::remove_file(&tmp_path).with_path(&tmp_path)?;
            tracing::warn!(path = %source.display(), %expected, actual = %hash, "content changed");
            return Err(Error::ContentChanged(source.to_path_buf()));
        }
        self.commit(&tmp_path, &hash)
    }

    /// copy a file into tmp, hashing as it goes
    fn stage_file(&self, source: &Path) -> Result<(PathBuf, Hash)> {
        let tmp_path = self.new_tmp_path();
        let mut hasher = ContentHasher::new(self.config.algorithm);
        if let Err(e) = copy_hashing(source, &tmp_path, &mut hasher) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok((tmp_path, hasher.finalize()))
    }

    /// install a staged file unless the store already holds its content
    fn commit(&self, tmp_path: &Path, hash: &Hash) -> Result<()> {
        if self.contains(hash) {
            fs::remove_file(tmp_path).with_path(tmp_path)?;
            return Ok(());
        }
        self.install(tmp_path, hash)
    }

    /// read an object, verifying its content against the hash
    pub fn get(&self, hash: &Hash) -> Result<Vec<u8>> {
        let path = self.object_path(hash);
        let content = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ObjectNotFound(*hash)
            } else {
                Error::Io { path, source: e }
            }
        })?;

        if compute_hash(hash.algorithm(), &content) != *hash {
            return Err(Error::CorruptObject(*hash));
        }
        Ok(content)
    }

    /// hashes referenced by `snapshot` that the store does not hold
    pub fn missing(&self, snapshot: &Snapshot) -> Vec<Hash> {
        snapshot
            .hashes()
            .into_iter()
            .filter(|h| !self.contains(h))
            .collect()
    }

    /// store a snapshot listing as an object and point `label` at it
    pub fn put_snapshot(&self, label: &str, snapshot: &Snapshot) -> Result<Hash> {
        validate_label(label)?;
        let hash = self.put(snapshot.render().as_bytes())?;
        self.write_label(label, &hash)?;
        Ok(hash)
    }

    /// load the snapshot a label points at
    pub fn get_snapshot(&self, label: &str) -> Result<Snapshot> {
        let hash = self.read_label(label)?;
        let content = self.get(&hash)?;
        Snapshot::read_from(&content[..])
    }

    /// create or move a label
    pub fn write_label(&self, label: &str, hash: &Hash) -> Result<()> {
        validate_label(label)?;
        let label_path = self.labels_path().join(label);
        if let Some(parent) = label_path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }

        let tmp_path = self.new_tmp_path();
        {
            let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
            writeln!(tmp_file, "{}", hash.to_hex()).with_path(&tmp_path)?;
            tmp_file.sync_all().with_path(&tmp_path)?;
        }
        fs::rename(&tmp_path, &label_path).with_path(&label_path)?;
        Ok(())
    }

    pub fn read_label(&self, label: &str) -> Result<Hash> {
        validate_label(label)?;
        let label_path = self.labels_path().join(label);
        let content = fs::read_to_string(&label_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::LabelNotFound(label.to_string())
            } else {
                Error::Io {
                    path: label_path.clone(),
                    source: e,
                }
            }
        })?;
        Hash::from_hex(content.trim())
    }

    /// all labels, sorted
    pub fn list_labels(&self) -> Result<Vec<String>> {
        let base = self.labels_path();
        let mut labels = Vec::new();
        for entry in walkdir::WalkDir::new(&base).min_depth(1) {
            let entry = entry.map_err(|e| Error::Io {
                path: base.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let label = entry
                .path()
                .strip_prefix(&base)
                .ok()
                .and_then(Path::to_str)
                .ok_or_else(|| Error::InvalidLabel(entry.path().display().to_string()))?;
            labels.push(label.to_string());
        }
        labels.sort();
        Ok(labels)
    }

    /// try to acquire the exclusive store lock, returning None if held elsewhere
    pub fn try_lock(&self) -> Result<Option<StoreLock>> {
        let lock_path = self.lock_path();
        let file = File::create(&lock_path).with_path(&lock_path)?;
        lock_outcome(&lock_path, Flock::lock(file, FlockArg::LockExclusiveNonblock))
    }

    /// acquire the store lock, pausing on `waiter` while another holder has it
    pub fn lock_waiting(&self, waiter: &WaitCondition) -> Result<StoreLock> {
        retry(waiter, "waiting for store lock", || self.try_lock())
    }

    fn new_tmp_path(&self) -> PathBuf {
        self.tmp_path().join(uuid::Uuid::new_v4().to_string())
    }

    /// move a fully written tmp file to its object path
    fn install(&self, tmp_path: &Path, hash: &Hash) -> Result<()> {
        let object_path = self.object_path(hash);
        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        fs::rename(tmp_path, &object_path).with_path(&object_path)?;
        tracing::debug!(%hash, "stored object");
        Ok(())
    }
}

/// guard that holds the store lock until dropped
pub struct StoreLock {
    #[allow(dead_code)]
    flock: Flock<File>,
}

fn copy_hashing(source: &Path, dest: &Path, hasher: &mut ContentHasher) -> Result<()> {
    let mut reader = File::open(source).with_path(source)?;
    let mut out = File::create(dest).with_path(dest)?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).with_path(source)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n]).with_path(dest)?;
    }
    out.sync_all().with_path(dest)
}

fn lock_outcome(
    lock_path: &Path,
    result: std::result::Result<Flock<File>, (File, Errno)>,
) -> Result<Option<StoreLock>> {
    match result {
        Ok(flock) => Ok(Some(StoreLock { flock })),
        Err((_, Errno::EWOULDBLOCK)) => Ok(None),
        Err((_, errno)) => Err(Error::Io {
            path: lock_path.to_path_buf(),
            source: errno.into(),
        }),
    }
}

/// labels are `/` separated names; no empty, `.` or `..` components
pub(crate) fn validate_label(label: &str) -> Result<()> {
    let valid = !label.contains('\0')
        && label
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if !valid {
        return Err(Error::InvalidLabel(label.to_string()));
    }
    Ok(())
}
