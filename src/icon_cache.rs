//! App icon cache, content-addressed by app id. Reads are synchronous local
//! hits; writes happen in the background after a successful fetch so the
//! caller never waits on persistence. No eviction.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct IconCache {
    dir: PathBuf,
}

impl IconCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// App ids are alphanumeric with dots; anything else is flattened so an
    /// id can never name a path outside the cache directory.
    fn icon_path(&self, app_id: &str) -> PathBuf {
        let safe: String = app_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.png"))
    }

    pub fn get(&self, app_id: &str) -> Option<Vec<u8>> {
        fs::read(self.icon_path(app_id)).ok()
    }

    /// Fire-and-forget write on a blocking worker.
    pub fn store(&self, app_id: &str, bytes: Vec<u8>) {
        let dir = self.dir.clone();
        let path = self.icon_path(app_id);
        debug!(path = %path.display(), "caching icon");
        tokio::task::spawn_blocking(move || {
            let written = fs::create_dir_all(&dir).and_then(|()| fs::write(&path, &bytes));
            if let Err(error) = written {
                warn!(path = %path.display(), "icon cache write failed: {error}");
            }
        });
    }
}
