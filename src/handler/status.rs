//! Monitor contract: name, release, hash and health.

use crate::error::StaticError;
use crate::handler::StaticHandler;

pub const STATUS_NAME: &str = "Embedded FS";

impl StaticHandler {
    /// `(name, release, hash)` for the whole tree.
    pub fn status_info(&self) -> (String, String, String) {
        self.status_info_path("")
    }

    /// `(name, release, hash)` for one path. The name carries the path's
    /// base name when it exists. Embedded content has no build hash.
    pub fn status_info_path(&self, path: &str) -> (String, String, String) {
        let release = env!("CARGO_PKG_VERSION").to_string();
        match self.files.info(path) {
            Ok(info) => (format!("{} [{}]", STATUS_NAME, info.name), release, String::new()),
            Err(_) => (STATUS_NAME.to_string(), release, String::new()),
        }
    }

    /// Healthy when every base path exists in the tree.
    pub fn status_health(&self) -> Result<(), StaticError> {
        for base in self.files.base_paths().iter().filter(|b| !b.is_empty()) {
            self.status_health_path(base)?;
        }
        Ok(())
    }

    pub fn status_health_path(&self, path: &str) -> Result<(), StaticError> {
        self.files.info(path).map(|_| ())
    }
}
