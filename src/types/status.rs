use std::fmt;
use std::fs::{self, Metadata};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, IoResultExt, Result};

/// kind of filesystem entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
}

impl FileKind {
    /// detect kind from metadata
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_file() {
            FileKind::Regular
        } else if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_block_device() {
            FileKind::BlockDevice
        } else if ft.is_char_device() {
            FileKind::CharDevice
        } else if ft.is_fifo() {
            FileKind::Fifo
        } else {
            FileKind::Socket
        }
    }

    /// token used in the status text form
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Regular => "file",
            FileKind::Directory => "dir",
            FileKind::Symlink => "symlink",
            FileKind::BlockDevice => "block",
            FileKind::CharDevice => "char",
            FileKind::Fifo => "fifo",
            FileKind::Socket => "socket",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "file" => FileKind::Regular,
            "dir" => FileKind::Directory,
            "symlink" => FileKind::Symlink,
            "block" => FileKind::BlockDevice,
            "char" => FileKind::CharDevice,
            "fifo" => FileKind::Fifo,
            "socket" => FileKind::Socket,
            _ => return None,
        })
    }
}

/// metadata snapshot of one filesystem entry
///
/// text form is `<kind>,<mode octal>,<size>,<mtime>`, e.g.
/// `file,755,2048,1700000000`. it never contains tabs or newlines.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileStatus {
    pub kind: FileKind,
    /// permission bits only
    pub mode: u32,
    pub size: u64,
    /// seconds since the epoch
    pub mtime: i64,
}

impl FileStatus {
    pub fn new(kind: FileKind, mode: u32, size: u64, mtime: i64) -> Self {
        Self {
            kind,
            mode: mode & 0o7777,
            size,
            mtime,
        }
    }

    /// read status from path (does not follow symlinks)
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = fs::symlink_metadata(path).with_path(path)?;
        Ok(Self::from_metadata(&meta))
    }

    /// create from std::fs::Metadata
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self::new(
            FileKind::from_metadata(meta),
            meta.mode(),
            meta.len(),
            meta.mtime(),
        )
    }

    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// canonical single-token text rendering
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// parse the canonical rendering
    ///
    /// anything [`render`](Self::render) would not produce is rejected:
    /// signs on unsigned fields, `+` on mtime, leading zeros.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || Error::MalformedStatus {
            text: text.to_string(),
        };

        let fields: Vec<&str> = text.split(',').collect();
        let [kind, mode, size, mtime] = fields.as_slice() else {
            return Err(malformed());
        };

        let kind = FileKind::from_token(kind).ok_or_else(malformed)?;
        let mode = u32::from_str_radix(mode, 8).map_err(|_| malformed())?;
        if mode > 0o7777 {
            return Err(malformed());
        }
        let size = size.parse::<u64>().map_err(|_| malformed())?;
        let mtime = mtime.parse::<i64>().map_err(|_| malformed())?;

        let status = Self {
            kind,
            mode,
            size,
            mtime,
        };
        if status.render() != text {
            return Err(malformed());
        }
        Ok(status)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:o},{},{}",
            self.kind.as_str(),
            self.mode,
            self.size,
            self.mtime
        )
    }
}

impl FromStr for FileStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
