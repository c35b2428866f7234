//! Per-release asset staging.
//!
//! An asset on disk is trusted iff its size matches the remote metadata.
//! Anything else is deleted and fetched again.

use futures::StreamExt;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SyncError};
use crate::github::ReleaseSource;
use crate::release::{is_tarball, transform_asset_name, ReleaseAsset};
use crate::staging::replace_symlink;

const EXECUTABLE_MODE: u32 = 0o755;
const ARCHIVE_MODE: u32 = 0o644;

/// What [`ensure_release_assets`] had to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub downloaded: usize,
    pub reused: usize,
    pub bytes_downloaded: u64,
}

/// Permission bits for a staged asset: tarballs are plain files, everything
/// else is a single-file executable.
pub fn asset_mode(name: &str) -> u32 {
    if is_tarball(name) {
        ARCHIVE_MODE
    } else {
        EXECUTABLE_MODE
    }
}

/// Make every asset present in `dir` with the right size, mode and alias link.
pub async fn ensure_release_assets(
    source: &dyn ReleaseSource,
    dir: &Path,
    assets: &[ReleaseAsset],
) -> Result<AssetStats> {
    let mut stats = AssetStats::default();

    for asset in assets {
        validate_asset_name(&asset.name)?;
        let local = dir.join(&asset.name);
        tracing::debug!("asset {}: local {}", asset.name, local.display());

        if local_size(&local).await? == Some(asset.size) {
            tracing::debug!("asset {}: size matches", asset.name);
            stats.reused += 1;
        } else {
            tracing::info!("removing {}", local.display());
            remove_if_exists(&local).await?;

            let written = download_to(source, asset, &local)
                .await
                .map_err(|e| SyncError::Download {
                    asset: asset.name.clone(),
                    source: Box::new(e),
                })?;
            if written != asset.size {
                return Err(SyncError::SizeMismatch {
                    asset: asset.name.clone(),
                    expected: asset.size,
                    actual: written,
                });
            }

            stats.downloaded += 1;
            stats.bytes_downloaded += written;
        }

        // Reused files too: a crash between the last write and the chmod leaves 0644
        fs::set_permissions(
            &local,
            std::fs::Permissions::from_mode(asset_mode(&asset.name)),
        )
        .await
        .map_err(|e| SyncError::io(&local, e))?;

        let alias = transform_asset_name(&asset.name);
        if alias != asset.name {
            replace_symlink(Path::new(&asset.name), &dir.join(&alias)).await?;
        }
    }

    Ok(stats)
}

/// Asset names come from the remote; they must stay inside the release directory.
fn validate_asset_name(name: &str) -> Result<()> {
    // `components()` normalizes away interior `.`, so compare the raw name too
    let is_plain = !name.contains('/')
        && matches!(
            Path::new(name).components().next(),
            Some(Component::Normal(c)) if c == name
        );
    if is_plain {
        Ok(())
    } else {
        Err(SyncError::UnsafeAssetName(name.to_string()))
    }
}

async fn local_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

async fn download_to(source: &dyn ReleaseSource, asset: &ReleaseAsset, local: &Path) -> Result<u64> {
    let mut stream = source.download_asset(asset).await?;
    let mut file = fs::File::create(local)
        .await
        .map_err(|e| SyncError::io(local, e))?;

    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| SyncError::io(local, e))?;
        written += chunk.len() as u64;
    }

    file.sync_all().await.map_err(|e| SyncError::io(local, e))?;
    Ok(written)
}
