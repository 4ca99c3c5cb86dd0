use crate::error::{CacheError, IoContext, Result};
use crate::{VersionedCache, CONTENTS_FILE, DIGEST_FILE, GEOTREE_FILE, SPRAY_DIR};
use cc_geo::GeoTree;
use chrono::{DateTime, Local};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the spray file for a geography key.
fn spray_file_name(key: &str) -> Result<String> {
    if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(format!("{}.csv", key))
}

/// A published, read-only snapshot under `current/`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    name: String,
    dir: PathBuf,
}

impl Snapshot {
    pub(crate) fn new(name: &str, dir: PathBuf) -> Self {
        Snapshot {
            name: name.to_string(),
            dir,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn contents_path(&self) -> PathBuf {
        self.dir.join(CONTENTS_FILE)
    }

    pub fn digest(&self) -> Result<String> {
        let path = self.dir.join(DIGEST_FILE);
        Ok(fs::read_to_string(&path).at(&path)?.trim().to_string())
    }

    /// Read the geotree fresh from disk.
    pub fn geo_tree(&self) -> Result<GeoTree> {
        let path = self.dir.join(GEOTREE_FILE);
        let json = fs::read_to_string(&path).at(&path)?;
        Ok(GeoTree::from_json(&json)?)
    }

    /// Path of the spray file for `key`; the file may not exist.
    pub fn spray_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.dir.join(SPRAY_DIR).join(spray_file_name(key)?))
    }

    /// Modification time of `contents.csv`.
    pub fn modified(&self) -> Result<DateTime<Local>> {
        let path = self.contents_path();
        let modified = fs::metadata(&path).and_then(|m| m.modified()).at(&path)?;
        Ok(DateTime::<Local>::from(modified))
    }
}

/// A snapshot being assembled under `staging/`.
///
/// Dropping it without calling [`StagedSnapshot::commit`] removes the staging
/// directory and leaves the published snapshot as it was.
#[derive(Debug)]
pub struct StagedSnapshot {
    cache: VersionedCache,
    name: String,
    dir: PathBuf,
    stamp: String,
    raw: String,
    committed: bool,
}

impl StagedSnapshot {
    pub(crate) fn new(
        cache: VersionedCache,
        name: &str,
        dir: PathBuf,
        stamp: String,
        raw: String,
    ) -> Self {
        StagedSnapshot {
            cache,
            name: name.to_string(),
            dir,
            stamp,
            raw,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn spray_dir(&self) -> PathBuf {
        self.dir.join(SPRAY_DIR)
    }

    pub(crate) fn write_file(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).at(&path)
    }

    pub fn write_spray_file(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.spray_dir().join(spray_file_name(key)?);
        fs::write(&path, bytes).at(&path)
    }

    pub fn write_geotree(&self, tree: &GeoTree) -> Result<()> {
        self.write_file(GEOTREE_FILE, tree.to_json()?.as_bytes())
    }

    /// Swap the staged tree in as the current snapshot.
    ///
    /// The previous snapshot is renamed to `<name>xx`, the staged directory
    /// renamed into its place, then the old copy removed. An archive marker
    /// is written afterwards; failing to write it only logs.
    ///
    /// A `<name>xx` left without a current snapshot by an interrupted commit
    /// is moved back first so it can be restored if this swap fails.
    pub fn commit(mut self) -> Result<Snapshot> {
        let current = self.cache.current_path(&self.name);
        let aside = self.cache.aside_path(&self.name);

        if aside.exists() {
            if current.is_dir() {
                fs::remove_dir_all(&aside).at(&aside)?;
            } else {
                warn!("Recovering {} from {}", current.display(), aside.display());
                fs::rename(&aside, &current).at(&aside)?;
            }
        }
        let had_current = current.is_dir();
        if had_current {
            fs::rename(&current, &aside).at(&current)?;
        }
        if let Err(e) = fs::rename(&self.dir, &current) {
            if had_current {
                if let Err(restore) = fs::rename(&aside, &current) {
                    warn!("Could not restore {}: {}", current.display(), restore);
                }
            }
            return Err(CacheError::Io {
                path: self.dir.clone(),
                source: e,
            });
        }
        self.committed = true;
        if had_current {
            if let Err(e) = fs::remove_dir_all(&aside) {
                warn!("Could not remove {}: {}", aside.display(), e);
            }
        }

        let marker = self
            .cache
            .archive_path()
            .join(format!("{}_{}_{}.csv", self.name, self.stamp, self.raw));
        if let Err(e) = fs::write(&marker, self.raw.as_bytes()) {
            warn!("Could not write archive marker {}: {}", marker.display(), e);
        }
        info!("Published {} ({})", self.name, self.stamp);
        Ok(Snapshot::new(&self.name, current))
    }
}

impl Drop for StagedSnapshot {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        warn!("Abandoning staged snapshot {}", self.dir.display());
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!("Could not remove {}: {}", self.dir.display(), e);
        }
    }
}
