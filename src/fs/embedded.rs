//! The read-only filesystem contract the accessor is built on.

use bytes::Bytes;
use std::io::{self, Cursor, Read};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata of a file or directory in an embedded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full path inside the tree, without a leading slash.
    pub path: String,
    /// Base name.
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

impl FileInfo {
    pub fn file(path: &str, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            path: path.to_string(),
            name: base_name(path).to_string(),
            size,
            modified,
            is_dir: false,
        }
    }

    pub fn dir(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: base_name(path).to_string(),
            size: 0,
            modified: None,
            is_dir: true,
        }
    }

    /// Modification time in unix seconds (0 when unknown).
    pub fn modified_unix(&self) -> u64 {
        self.modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// One child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A read-only tree of files, usually compiled into the binary.
///
/// Implementations report a missing entry with `io::ErrorKind::NotFound`;
/// any other error kind is treated as an internal fault.
pub trait EmbeddedFs: Send + Sync + 'static {
    /// Children of `dir`, sorted by name. `""` is the root.
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>>;

    fn stat(&self, path: &str) -> io::Result<FileInfo>;

    fn read_file(&self, path: &str) -> io::Result<Bytes>;

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.read_file(path)?)))
    }
}

/// Strip leading "/" and "./" and trailing "/".
pub fn normalize(path: &str) -> &str {
    let mut p = path;
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            break;
        }
    }
    let p = p.trim_end_matches('/');
    if p == "." {
        ""
    } else {
        p
    }
}

pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

pub(crate) fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", path))
}

/// Directory listing for trees stored as a flat, sorted list of file paths.
///
/// Returns `None` when `dir` is neither the root nor a prefix of any file.
pub(crate) fn children_of<'a, I>(files: I, dir: &str) -> Option<Vec<DirEntry>>
where
    I: IntoIterator<Item = &'a str>,
{
    let dir = normalize(dir);
    let mut entries: Vec<DirEntry> = Vec::new();
    let mut found = dir.is_empty();

    for file in files {
        let rest = if dir.is_empty() {
            file
        } else {
            match file.strip_prefix(dir).and_then(|r| r.strip_prefix('/')) {
                Some(rest) => rest,
                None => continue,
            }
        };
        found = true;

        let (name, is_dir) = match rest.split_once('/') {
            Some((head, _)) => (head, true),
            None => (rest, false),
        };
        if !entries.iter().any(|e| e.name == name) {
            entries.push(DirEntry {
                name: name.to_string(),
                is_dir,
            });
        }
    }

    if !found {
        return None;
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Some(entries)
}

/// True when some file lives below `dir`.
pub(crate) fn is_dir_of<'a, I>(files: I, dir: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let dir = normalize(dir);
    dir.is_empty()
        || files
            .into_iter()
            .any(|f| f.strip_prefix(dir).is_some_and(|r| r.starts_with('/')))
}
