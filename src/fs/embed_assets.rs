//! Adapter over a folder compiled in with `rust-embed`.

use bytes::Bytes;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::io;
use std::marker::PhantomData;
use std::time::{Duration, UNIX_EPOCH};

use crate::fs::embedded::{children_of, is_dir_of, normalize, not_found, DirEntry, EmbeddedFs, FileInfo};

/// Serves the files of a `#[derive(RustEmbed)]` type.
///
/// ```ignore
/// #[derive(RustEmbed)]
/// #[folder = "assets/"]
/// struct Assets;
///
/// let fs = AssetFs::<Assets>::new();
/// ```
pub struct AssetFs<E: RustEmbed> {
    files: Vec<String>,
    _embed: PhantomData<fn() -> E>,
}

impl<E: RustEmbed> AssetFs<E> {
    pub fn new() -> Self {
        let mut files: Vec<String> = E::iter().map(|f| f.into_owned()).collect();
        files.sort();
        Self {
            files,
            _embed: PhantomData,
        }
    }

    fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }
}

impl<E: RustEmbed> Default for AssetFs<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RustEmbed + 'static> EmbeddedFs for AssetFs<E> {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        children_of(self.paths(), dir).ok_or_else(|| not_found(dir))
    }

    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        let key = normalize(path);
        if let Some(file) = E::get(key) {
            let modified = file
                .metadata
                .last_modified()
                .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));
            return Ok(FileInfo::file(key, file.data.len() as u64, modified));
        }
        if is_dir_of(self.paths(), key) {
            return Ok(FileInfo::dir(key));
        }
        Err(not_found(path))
    }

    fn read_file(&self, path: &str) -> io::Result<Bytes> {
        let file = E::get(normalize(path)).ok_or_else(|| not_found(path))?;
        Ok(match file.data {
            Cow::Borrowed(data) => Bytes::from_static(data),
            Cow::Owned(data) => Bytes::from(data),
        })
    }
}
