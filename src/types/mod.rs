mod entry;
mod status;

pub use entry::DirListEntry;
pub use status::{FileKind, FileStatus};
