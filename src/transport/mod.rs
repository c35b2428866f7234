//! Mirror transport - moves staged releases to the distribution mirror.
//!
//! The state machine in [`crate::sync`] only sees this trait, so the rsync
//! subprocess can be swapped for another implementation.

pub mod rsync;

use crate::error::Result;
use crate::release::Release;
use async_trait::async_trait;

pub use rsync::RsyncTransport;

#[async_trait]
pub trait MirrorTransport: Send + Sync {
    /// Whether the mirror already holds this release's content.
    ///
    /// A negative answer covers both "absent" and "unreachable".
    async fn probe(&self, rel: &Release) -> Result<bool>;

    /// Push the release content, then its channel symlink.
    ///
    /// The channel symlink is never pushed unless the content push succeeded.
    async fn push(&self, rel: &Release) -> Result<()>;
}
