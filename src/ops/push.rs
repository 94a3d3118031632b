use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::hash::Hash;
use crate::scan::scan;
use crate::store::{validate_label, Store};
use crate::wait::WaitCondition;

/// push options
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// report what would be uploaded without writing anything
    pub dry_run: bool,
}

/// outcome of a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResult {
    /// hash of the stored snapshot object, None on a dry run
    pub snapshot: Option<Hash>,
    /// entries in the snapshot
    pub entries: usize,
    /// distinct contents uploaded (or that would be, on a dry run)
    pub uploaded: usize,
    /// hashed entries whose content the store already held
    pub skipped: usize,
}

/// snapshot `source` into the store under `label`
///
/// holds the store lock for the whole operation, pausing on `waiter` while
/// someone else holds it. only content the store does not already have is
/// uploaded.
pub fn push(
    store: &Store,
    source: &Path,
    label: &str,
    waiter: &WaitCondition,
    options: &PushOptions,
) -> Result<PushResult> {
    validate_label(label)?;
    let _lock = store.lock_waiting(waiter)?;

    let snapshot = scan(source, store.config().algorithm)?;
    let missing: HashSet<Hash> = store.missing(&snapshot).into_iter().collect();

    let mut uploaded = HashSet::new();
    let mut skipped = 0;
    for entry in snapshot.entries() {
        let Some(hash) = entry.hash() else {
            continue;
        };
        if !missing.contains(hash) {
            skipped += 1;
            continue;
        }
        if !uploaded.insert(*hash) || options.dry_run {
            continue;
        }

        store.put_file_expecting(&source.join(entry.path()), hash)?;
        tracing::debug!(path = entry.path(), %hash, "uploaded");
    }

    let snapshot_hash = if options.dry_run {
        None
    } else {
        Some(store.put_snapshot(label, &snapshot)?)
    };

    tracing::info!(
        label,
        entries = snapshot.len(),
        uploaded = uploaded.len(),
        skipped,
        dry_run = options.dry_run,
        "push complete"
    );

    Ok(PushResult {
        snapshot: snapshot_hash,
        entries: snapshot.len(),
        uploaded: uploaded.len(),
        skipped,
    })
}
