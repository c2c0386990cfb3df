//! File lookup, listing and reading over an embedded tree.

use arc_swap::ArcSwap;
use axum::body::Body;
use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::error::StaticError;
use crate::fs::embedded::{normalize, EmbeddedFs, FileInfo};

/// Spooling threshold meaning "always buffer".
pub const NEVER_SPOOL: u64 = u64::MAX;

/// Opened file contents.
#[derive(Debug)]
pub enum FileContent {
    /// Read fully into memory.
    Memory(Bytes),
    /// Copied into an anonymous temporary file, removed when dropped.
    Spooled(File),
}

impl FileContent {
    pub fn is_spooled(&self) -> bool {
        matches!(self, FileContent::Spooled(_))
    }

    /// Convert into a response body, streaming spooled files.
    pub fn into_body(self) -> Body {
        match self {
            FileContent::Memory(bytes) => Body::from(bytes),
            FileContent::Spooled(file) => {
                let file = tokio::fs::File::from_std(file);
                Body::from_stream(ReaderStream::new(file))
            }
        }
    }

    /// Blocking read of the whole content.
    pub fn read_to_vec(self) -> io::Result<Vec<u8>> {
        match self {
            FileContent::Memory(bytes) => Ok(bytes.to_vec()),
            FileContent::Spooled(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

/// Reads files from an embedded tree, with base-path fallback for lookups.
///
/// Cheap to clone; clones share the tree, the base paths and the threshold.
#[derive(Clone)]
pub struct FileAccessor {
    fs: Arc<dyn EmbeddedFs>,
    bases: Arc<ArcSwap<Vec<String>>>,
    spool_threshold: Arc<AtomicU64>,
}

impl FileAccessor {
    pub fn new(fs: Arc<dyn EmbeddedFs>, bases: Vec<String>) -> Self {
        let bases = bases.iter().map(|b| normalize(b).to_string()).collect();
        Self {
            fs,
            bases: Arc::new(ArcSwap::from_pointee(bases)),
            spool_threshold: Arc::new(AtomicU64::new(NEVER_SPOOL)),
        }
    }

    pub fn base_paths(&self) -> Arc<Vec<String>> {
        self.bases.load_full()
    }

    pub fn set_base_paths(&self, bases: Vec<String>) {
        let bases = bases.iter().map(|b| normalize(b).to_string()).collect();
        self.bases.store(Arc::new(bases));
    }

    pub fn spool_threshold(&self) -> u64 {
        self.spool_threshold.load(Ordering::Relaxed)
    }

    /// Files of `size` bytes or more are served from a temporary file.
    pub fn use_temp_for_file_size(&self, size: u64) {
        self.spool_threshold.store(size, Ordering::Relaxed);
    }

    pub fn info(&self, path: &str) -> Result<FileInfo, StaticError> {
        let key = normalize(path);
        if key.is_empty() {
            return Err(StaticError::EmptyPath);
        }
        self.fs.stat(key).map_err(|e| StaticError::from_io(key, e))
    }

    /// True when `path` names anything (file or directory).
    pub fn has(&self, path: &str) -> bool {
        self.info(path).is_ok()
    }

    /// True when `path` names a regular file.
    pub fn is_file(&self, path: &str) -> bool {
        self.info(path).map(|i| !i.is_dir).unwrap_or(false)
    }

    /// Find `candidate` directly, then under each base path in order.
    pub fn locate(&self, candidate: &str) -> Option<String> {
        let candidate = normalize(candidate);
        if candidate.is_empty() {
            return None;
        }
        if self.is_file(candidate) {
            return Some(candidate.to_string());
        }
        self.bases
            .load()
            .iter()
            .map(|base| join(base, candidate))
            .find(|path| self.is_file(path))
    }

    /// Open a file, buffering or spooling according to the threshold.
    pub fn open(&self, path: &str) -> Result<(FileInfo, FileContent), StaticError> {
        let info = self.info(path)?;
        if info.is_dir {
            return Err(StaticError::NotFound(info.path));
        }

        let content = if info.size >= self.spool_threshold() {
            FileContent::Spooled(self.spool(&info.path)?)
        } else {
            let bytes = self
                .fs
                .read_file(&info.path)
                .map_err(|e| StaticError::from_io(&info.path, e))?;
            FileContent::Memory(bytes)
        };
        Ok((info, content))
    }

    /// Copy a file into a temporary file regardless of its size.
    pub fn temp(&self, path: &str) -> Result<File, StaticError> {
        let info = self.info(path)?;
        if info.is_dir {
            return Err(StaticError::NotFound(info.path));
        }
        self.spool(&info.path)
    }

    fn spool(&self, path: &str) -> Result<File, StaticError> {
        let mut reader = self.fs.open(path).map_err(|e| StaticError::from_io(path, e))?;
        let temp_err = |source| StaticError::TempFile {
            path: path.to_string(),
            source,
        };

        let mut file = tempfile::tempfile().map_err(temp_err)?;
        io::copy(&mut reader, &mut file).map_err(temp_err)?;
        file.seek(SeekFrom::Start(0)).map_err(temp_err)?;
        Ok(file)
    }

    /// Every file below `root`, recursively. `""` lists every base path.
    pub fn list(&self, root: &str) -> Result<Vec<String>, StaticError> {
        let mut files = Vec::new();
        self.walk_roots(root, &mut |path, _| {
            files.push(path.to_string());
            Ok(())
        })?;
        Ok(files)
    }

    /// Call `visitor` for every file below the base paths. An error from the
    /// visitor stops the walk and is returned.
    pub fn map<F>(&self, mut visitor: F) -> Result<(), StaticError>
    where
        F: FnMut(&str, &FileInfo) -> Result<(), StaticError>,
    {
        self.walk_roots("", &mut visitor)
    }

    fn walk_roots(
        &self,
        root: &str,
        visitor: &mut dyn FnMut(&str, &FileInfo) -> Result<(), StaticError>,
    ) -> Result<(), StaticError> {
        let root = normalize(root);
        if !root.is_empty() {
            return self.walk(root, visitor);
        }

        let bases = self.bases.load_full();
        if bases.is_empty() {
            return self.walk("", visitor);
        }
        for base in bases.iter() {
            self.walk(base, visitor)?;
        }
        Ok(())
    }

    fn walk(
        &self,
        dir: &str,
        visitor: &mut dyn FnMut(&str, &FileInfo) -> Result<(), StaticError>,
    ) -> Result<(), StaticError> {
        let entries = self.fs.read_dir(dir).map_err(|e| StaticError::from_io(dir, e))?;
        for entry in entries {
            let path = join(dir, &entry.name);
            if entry.is_dir {
                self.walk(&path, visitor)?;
            } else {
                let info = self.fs.stat(&path).map_err(|e| StaticError::from_io(&path, e))?;
                visitor(&path, &info)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAccessor")
            .field("bases", &self.bases.load())
            .field("spool_threshold", &self.spool_threshold())
            .finish()
    }
}

/// Join two tree paths, resolving "." and ".." lexically.
pub fn join(base: &str, path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}
