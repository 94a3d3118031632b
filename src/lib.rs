//! shardsync - content-addressed directory sync core
//!
//! a client lists a directory tree, hashes file content, and exchanges a
//! textual snapshot with a store so that only content the store does not
//! already hold is transferred.
//!
//! # Core concepts
//!
//! - **Hash**: an MD5 or SHA-1 digest, used as content identity and as the
//!   sharded storage address `aa/bb/rest`
//! - **DirListEntry**: relative path + file status + optional hash
//! - **Snapshot**: ordered entries, one tab separated line each
//! - **WaitCondition**: interruptible pause for retry loops (store lock, store
//!   availability)
//!
//! # Snapshot line format
//!
//! ```text
//! bin/tool\tfile,755,2048,1700000000\td41d8cd98f00b204e9800998ecf8427e\n
//! etc\tdir,755,4096,1700000000\tnohash\n
//! ```
//!
//! # Example usage
//!
//! ```no_run
//! use shardsync::{ops, Config, Store};
//! use std::path::Path;
//!
//! let store = Store::init(Path::new("/srv/objects"), Config::default()).unwrap();
//! let waiter = store.config().waiter();
//! let result = ops::push(&store, Path::new("/source"), "release/1.0", &waiter, &Default::default()).unwrap();
//! println!("uploaded {} new objects", result.uploaded);
//! ```

mod config;
mod error;
mod hash;
mod scan;
mod store;

pub mod ops;
pub mod snapshot;
pub mod types;
pub mod wait;

pub use config::Config;
pub use error::{Error, Result};
pub use hash::{compute_hash, ContentHasher, Hash, HashAlgorithm};
pub use scan::{hash_file, scan};
pub use snapshot::{parse_entry, render_entry, Snapshot};
pub use store::{Store, StoreLock};
pub use types::{DirListEntry, FileKind, FileStatus};
pub use wait::{retry, WaitCondition};
