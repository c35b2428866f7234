//! Local staging store.
//!
//! Layout under the staging root:
//!
//! ```text
//! tags/<name>/            release assets as pushed to the mirror
//! tags/<name>/.synced     zero-byte marker: release fully pushed
//! <channel>/<name>        relative symlink to ../tags/<name>
//! ```
//!
//! Everything here is re-read from disk on every call; the filesystem is the
//! only state shared between release tasks and between runs.

use crate::error::{Result, SyncError};
use crate::release::Release;
use crate::transport::MirrorTransport;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Directory holding per-release asset directories
pub const TAGS_DIR: &str = "tags";

/// Marker written once a release is on the mirror
pub const SYNCED_MARKER: &str = "synced";

#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `tags/<name>` under the root
    pub fn release_dir(&self, rel: &Release) -> PathBuf {
        self.root.join(TAGS_DIR).join(&rel.name)
    }

    /// `<channel>/<name>` under the root
    pub fn channel_symlink_path(&self, rel: &Release) -> PathBuf {
        self.root.join(rel.channel.as_str()).join(&rel.name)
    }

    /// `tags/<name>/.<marker>` under the root
    pub fn marker_path(&self, rel: &Release, marker: &str) -> PathBuf {
        self.release_dir(rel).join(format!(".{}", marker))
    }

    /// Whether the release is already on the mirror.
    ///
    /// Without a local marker the mirror itself is probed; if it already has
    /// the release, the marker and channel symlink are recreated locally.
    pub async fn is_synced(&self, rel: &Release, transport: &dyn MirrorTransport) -> Result<bool> {
        if path_exists(&self.marker_path(rel, SYNCED_MARKER)).await? {
            return Ok(true);
        }

        if !transport.probe(rel).await? {
            return Ok(false);
        }

        tracing::info!("{}: already on mirror, restoring local state", rel.name);
        self.ensure_release_dir(rel).await?;
        self.mark_synced(rel).await?;
        self.ensure_channel_symlink(rel).await?;
        Ok(true)
    }

    /// Create the marker if it does not exist yet.
    pub async fn mark_synced(&self, rel: &Release) -> Result<()> {
        let marker = self.marker_path(rel, SYNCED_MARKER);
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&marker)
            .await
            .map_err(|e| SyncError::io(&marker, e))?;
        Ok(())
    }

    /// Create `tags/<name>` (and parents) if missing.
    pub async fn ensure_release_dir(&self, rel: &Release) -> Result<PathBuf> {
        let dir = self.release_dir(rel);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::io(&dir, e))?;
        Ok(dir)
    }

    /// Point `<channel>/<name>` at `../tags/<name>`, replacing whatever was there.
    pub async fn ensure_channel_symlink(&self, rel: &Release) -> Result<()> {
        let link = self.channel_symlink_path(rel);
        let Some(channel_dir) = link.parent() else {
            return Err(SyncError::Config(format!(
                "channel symlink {} has no parent",
                link.display()
            )));
        };
        fs::create_dir_all(channel_dir)
            .await
            .map_err(|e| SyncError::io(channel_dir, e))?;

        let target = relative_path(&self.release_dir(rel), channel_dir);
        replace_symlink(&target, &link).await
    }
}

/// Create `link -> target`, replacing an existing file or link at `link`.
///
/// Losing a race against an identical link is not an error.
pub(crate) async fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    match fs::symlink_metadata(link).await {
        Ok(_) => fs::remove_file(link)
            .await
            .or_else(ignore_not_found)
            .map_err(|e| SyncError::io(link, e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(SyncError::io(link, e)),
    }

    match fs::symlink(target, link).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            match fs::read_link(link).await {
                Ok(existing) if existing == target => Ok(()),
                _ => Err(SyncError::io(link, e)),
            }
        }
        Err(e) => Err(SyncError::io(link, e)),
    }
}

fn ignore_not_found(e: std::io::Error) -> std::io::Result<()> {
    if e.kind() == ErrorKind::NotFound {
        Ok(())
    } else {
        Err(e)
    }
}

async fn path_exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| SyncError::io(path, e))
}

/// Path to `target` relative to directory `base`, walking up with `..`
/// from `base` until a common ancestor is reached.
///
/// Both paths are compared lexically and should be absolute or share the same root.
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component<'_>> = target.components().collect();
    let base: Vec<Component<'_>> = base.components().collect();

    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    rel
}
