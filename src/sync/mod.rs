//! Release syncer - mirrors recent GitHub releases to the rsync mirror.
//!
//! Each run lists the newest releases and drives every one of them through
//!
//! ```text
//! Discovered -> Legacy (skip)
//!            -> AlreadySynced (marker, or mirror probe)
//!            -> NeedsSync -> Staged -> Pushed -> Synced
//! ```
//!
//! Releases are processed concurrently and independently. A failed release
//! is left without its marker and picked up again by the next run; every
//! step is idempotent, so re-running the whole worker is the retry policy.

pub mod assets;

use futures::StreamExt;
use std::sync::Arc;

use crate::error::Result;
use crate::github::ReleaseSource;
use crate::release::{Classification, RemoteRelease};
use crate::staging::StagingDir;
use crate::transport::MirrorTransport;

pub use assets::{ensure_release_assets, AssetStats};

/// How many of the newest releases are looked at per run
pub const RELEASES_PER_RUN: usize = 3;

/// Terminal state of one release within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Legacy,
    AlreadySynced,
    Synced(AssetStats),
}

#[derive(Debug)]
pub struct ReleaseReport {
    pub tag: String,
    pub result: Result<ReleaseOutcome>,
}

/// Per-release results of one run, in listing order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub releases: Vec<ReleaseReport>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.releases.iter().any(|r| r.result.is_err())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReleaseReport> {
        self.releases.iter().filter(|r| r.result.is_err())
    }

    pub fn outcome(&self, tag: &str) -> Option<&Result<ReleaseOutcome>> {
        self.releases
            .iter()
            .find(|r| r.tag == tag)
            .map(|r| &r.result)
    }
}

pub struct ReleaseSyncer {
    source: Arc<dyn ReleaseSource>,
    transport: Arc<dyn MirrorTransport>,
    staging: StagingDir,
    repo: String,
}

impl ReleaseSyncer {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        transport: Arc<dyn MirrorTransport>,
        staging: StagingDir,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            source,
            transport,
            staging,
            repo: repo.into(),
        }
    }

    /// One full pass over the newest releases.
    ///
    /// Only a listing failure is returned as `Err`; per-release failures are
    /// collected in the summary so that sibling releases still complete.
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!(
            "rsync staging directory at {}",
            self.staging.root().display()
        );

        let releases = self
            .source
            .list_recent_releases(&self.repo, RELEASES_PER_RUN)
            .await?;
        tracing::debug!("{}: {} releases listed", self.repo, releases.len());

        let releases: Vec<ReleaseReport> = futures::stream::iter(releases)
            .map(move |remote| async move {
                let result = self.run_one(&remote).await;
                if let Err(e) = &result {
                    tracing::error!("{}: sync failed: {}", remote.tag_name, e);
                }
                ReleaseReport {
                    tag: remote.tag_name,
                    result,
                }
            })
            .buffered(RELEASES_PER_RUN)
            .collect()
            .await;

        Ok(RunSummary { releases })
    }

    async fn run_one(&self, remote: &RemoteRelease) -> Result<ReleaseOutcome> {
        let name = &remote.tag_name;

        let rel = match remote.classify()? {
            Classification::Legacy => {
                tracing::debug!("{}: ignoring pre-automation release", name);
                return Ok(ReleaseOutcome::Legacy);
            }
            Classification::Active(rel) => rel,
        };

        let synced = self
            .staging
            .is_synced(&rel, self.transport.as_ref())
            .await?;
        tracing::info!(
            "{}: {} {}",
            name,
            rel.channel,
            if synced { "synced" } else { "needs sync" }
        );
        if synced {
            return Ok(ReleaseOutcome::AlreadySynced);
        }

        let dir = self.staging.ensure_release_dir(&rel).await?;
        tracing::info!("{}: pulling assets", name);
        let stats = ensure_release_assets(self.source.as_ref(), &dir, &remote.assets).await?;
        tracing::info!(
            "{}: {} assets downloaded ({} bytes), {} reused",
            name,
            stats.downloaded,
            stats.bytes_downloaded,
            stats.reused
        );

        self.staging.ensure_channel_symlink(&rel).await?;

        tracing::info!("{}: pushing to remote", name);
        self.transport.push(&rel).await?;
        self.staging.mark_synced(&rel).await?;
        tracing::info!("{}: synced", name);

        Ok(ReleaseOutcome::Synced(stats))
    }
}
