//! In-memory tree, built at runtime.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::io;
use std::time::SystemTime;

use crate::fs::embedded::{children_of, is_dir_of, normalize, not_found, DirEntry, EmbeddedFs, FileInfo};

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Bytes,
    modified: Option<SystemTime>,
}

/// A tree of files held in a sorted map keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, MemoryFile>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert with the current time as modification time.
    pub fn with_file(mut self, path: &str, data: impl Into<Bytes>) -> Self {
        self.insert(path, data, Some(SystemTime::now()));
        self
    }

    pub fn with_file_modified(mut self, path: &str, data: impl Into<Bytes>, modified: SystemTime) -> Self {
        self.insert(path, data, Some(modified));
        self
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Bytes>, modified: Option<SystemTime>) {
        self.files.insert(
            normalize(path).to_string(),
            MemoryFile {
                data: data.into(),
                modified,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl EmbeddedFs for MemoryFs {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        children_of(self.paths(), dir).ok_or_else(|| not_found(dir))
    }

    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        let key = normalize(path);
        if let Some(file) = self.files.get(key) {
            return Ok(FileInfo::file(key, file.data.len() as u64, file.modified));
        }
        if is_dir_of(self.paths(), key) {
            return Ok(FileInfo::dir(key));
        }
        Err(not_found(path))
    }

    fn read_file(&self, path: &str) -> io::Result<Bytes> {
        self.files
            .get(normalize(path))
            .map(|f| f.data.clone())
            .ok_or_else(|| not_found(path))
    }
}
