//! rsync subprocess transport.
//!
//! Content goes to `<remote>/tags/<name>/`, the channel symlink to
//! `<remote>/<channel>/`. The remote password, if any, is handed to rsync via
//! `RSYNC_PASSWORD` so it never shows up in the process list.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::MirrorTransport;
use crate::error::{Result, SyncError};
use crate::release::Release;
use crate::staging::{StagingDir, SYNCED_MARKER, TAGS_DIR};

pub const DEFAULT_PROGRAM: &str = "rsync";

/// Archive mode, hardlinks, partial+progress, copy symlinks' referents
const CONTENT_FLAGS: &str = "-avHPL";

/// Same as [`CONTENT_FLAGS`] but keeps symlinks as symlinks
const SYMLINK_FLAGS: &str = "-avHP";

const PASSWORD_ENV: &str = "RSYNC_PASSWORD";

#[derive(Debug, Clone)]
pub struct RsyncTransport {
    program: PathBuf,
    remote_url: String,
    password: Option<String>,
    staging: StagingDir,
}

impl RsyncTransport {
    pub fn new(remote_url: &str, password: Option<String>, staging: StagingDir) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            // A slash is appended to every remote spec, so drop any trailing one here
            remote_url: remote_url.trim_end_matches('/').to_string(),
            password: password.filter(|p| !p.is_empty()),
            staging,
        }
    }

    /// Use a different rsync binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn remote_tag_spec(&self, rel: &Release) -> String {
        format!("{}/{}/{}/", self.remote_url, TAGS_DIR, rel.name)
    }

    fn remote_channel_spec(&self, rel: &Release) -> String {
        format!("{}/{}/", self.remote_url, rel.channel)
    }

    fn local_dir_spec(&self, rel: &Release) -> OsString {
        let mut spec = self.staging.release_dir(rel).into_os_string();
        spec.push("/");
        spec
    }

    fn exclude_marker() -> String {
        format!("--exclude=.{}", SYNCED_MARKER)
    }

    /// Arguments for a dry-run pull of the release from the mirror
    pub fn probe_args(&self, rel: &Release) -> Vec<OsString> {
        vec![
            "--dry-run".into(),
            CONTENT_FLAGS.into(),
            Self::exclude_marker().into(),
            self.remote_tag_spec(rel).into(),
            self.local_dir_spec(rel),
        ]
    }

    /// Arguments for pushing the release content
    pub fn push_content_args(&self, rel: &Release) -> Vec<OsString> {
        vec![
            CONTENT_FLAGS.into(),
            Self::exclude_marker().into(),
            self.local_dir_spec(rel),
            self.remote_tag_spec(rel).into(),
        ]
    }

    /// Arguments for pushing the channel symlink itself
    pub fn push_symlink_args(&self, rel: &Release) -> Vec<OsString> {
        vec![
            SYMLINK_FLAGS.into(),
            self.staging.channel_symlink_path(rel).into_os_string(),
            self.remote_channel_spec(rel).into(),
        ]
    }

    /// Run rsync to completion and return its exit code (`None` if killed by a signal).
    async fn run(&self, args: &[OsString]) -> Result<Option<i32>> {
        tracing::info!("calling {} with args: {:?}", self.program.display(), args);

        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        if let Some(password) = &self.password {
            cmd.env(PASSWORD_ENV, password);
        }

        let status = cmd.status().await.map_err(|source| SyncError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        tracing::debug!("{} exited with {}", self.program.display(), status);
        Ok(status.code())
    }

    async fn run_checked(&self, args: &[OsString]) -> Result<()> {
        match self.run(args).await? {
            Some(0) => Ok(()),
            code => Err(SyncError::Transport {
                program: self.program.display().to_string(),
                code,
            }),
        }
    }
}

#[async_trait]
impl MirrorTransport for RsyncTransport {
    async fn probe(&self, rel: &Release) -> Result<bool> {
        let code = self.run(&self.probe_args(rel)).await?;
        Ok(code == Some(0))
    }

    async fn push(&self, rel: &Release) -> Result<()> {
        self.run_checked(&self.push_content_args(rel)).await?;
        self.run_checked(&self.push_symlink_args(rel)).await
    }
}
