//! Versioned on-disk snapshot store for polled data sources.
//!
//! Each source owns one published snapshot directory. A new download is
//! written into a staging directory and swapped in by renames, so a reader of
//! `current/<source>` sees either the previous snapshot or the new one, never
//! a partial tree.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   archive/<source>_<stamp>_<raw>.csv      one marker per publish
//!   current/<source>/
//!     contents.csv
//!     digest.txt
//!     geotree.json
//!     spray/<geo key>.csv
//!     when=<stamp>.txt
//!   staging/<source>_<raw>/                 same shape, being filled
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use cc_cache::{digest, VersionedCache};
//! use cc_geo::GeoTree;
//!
//! let cache = VersionedCache::new("data");
//! let payload = b"date,state,cases\n";
//! if let Some(staged) = cache.publish("nyt_us_states", payload, &digest(payload)).unwrap() {
//!     staged.write_spray_file("Texas", b"date,cases\n").unwrap();
//!     staged.write_geotree(&GeoTree::new()).unwrap();
//!     staged.commit().unwrap();
//! }
//! ```

pub mod error;
mod snapshot;

pub use error::{CacheError, Result};
pub use snapshot::{Snapshot, StagedSnapshot};

use cc_utils::stamps::{now_stamp, raw_timestamp};
use chrono::Local;
use error::IoContext;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const ARCHIVE_DIR: &str = "archive";
pub const CURRENT_DIR: &str = "current";
pub const STAGING_DIR: &str = "staging";
pub const CONTENTS_FILE: &str = "contents.csv";
pub const DIGEST_FILE: &str = "digest.txt";
pub const GEOTREE_FILE: &str = "geotree.json";
pub const SPRAY_DIR: &str = "spray";

/// Hex md5 of a payload.
pub fn digest(payload: &[u8]) -> String {
    format!("{:x}", md5::compute(payload))
}

/// Root of the snapshot store shared by all sources.
#[derive(Debug, Clone)]
pub struct VersionedCache {
    root: PathBuf,
}

impl VersionedCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        VersionedCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_path(&self, name: &str) -> PathBuf {
        self.root.join(CURRENT_DIR).join(name)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    /// Where the previous snapshot sits while a commit swaps in a new one.
    pub fn aside_path(&self, name: &str) -> PathBuf {
        self.root.join(CURRENT_DIR).join(format!("{}xx", name))
    }

    /// The published snapshot for `name`, if there is one.
    ///
    /// A commit interrupted between its two renames leaves only the
    /// `<name>xx` copy; that copy is served until the next commit.
    pub fn snapshot(&self, name: &str) -> Option<Snapshot> {
        let dir = self.current_path(name);
        if dir.is_dir() {
            return Some(Snapshot::new(name, dir));
        }
        let aside = self.aside_path(name);
        if aside.is_dir() {
            warn!("{}: no current snapshot, reading {}", name, aside.display());
            return Some(Snapshot::new(name, aside));
        }
        None
    }

    /// Like [`VersionedCache::snapshot`] but a missing snapshot is an error.
    pub fn require_snapshot(&self, name: &str) -> Result<Snapshot> {
        self.snapshot(name)
            .ok_or_else(|| CacheError::NoSnapshot(name.to_string()))
    }

    /// Stage a new snapshot for `name` unless the published one already has
    /// `digest`.
    ///
    /// The returned [`StagedSnapshot`] holds the contents, digest and when
    /// marker. The caller fills in the spray and geotree and then commits;
    /// dropping it uncommitted discards the staging directory.
    pub fn publish(
        &self,
        name: &str,
        payload: &[u8],
        digest: &str,
    ) -> Result<Option<StagedSnapshot>> {
        if let Some(current) = self.snapshot(name) {
            if current.digest().ok().as_deref() == Some(digest) {
                debug!("{} unchanged (digest {})", name, digest);
                return Ok(None);
            }
        }

        let now = Local::now();
        let raw = raw_timestamp(&now);
        let stamp = now_stamp(&now);
        let staging = self
            .root
            .join(STAGING_DIR)
            .join(format!("{}_{}", name, raw));
        for dir in [self.root.join(CURRENT_DIR), self.archive_path()] {
            fs::create_dir_all(&dir).at(&dir)?;
        }

        let staged = StagedSnapshot::new(self.clone(), name, staging, stamp, raw);
        let spray = staged.spray_dir();
        fs::create_dir_all(&spray).at(&spray)?;
        staged.write_file(CONTENTS_FILE, payload)?;
        staged.write_file(DIGEST_FILE, digest.as_bytes())?;
        staged.write_file(&format!("when={}.txt", staged.stamp()), staged.raw().as_bytes())?;
        info!("Staged {} at {}", name, staged.path().display());
        Ok(Some(staged))
    }

    /// Number of archive markers recorded for `name`.
    pub fn archive_count(&self, name: &str) -> usize {
        let prefix = format!("{}_", name);
        fs::read_dir(self.archive_path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
                    .count()
            })
            .unwrap_or(0)
    }
}
