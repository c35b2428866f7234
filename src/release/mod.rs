//! Release identity and classification.
//!
//! A remote release is classified once per run into either a legacy release
//! (never touched by the worker) or a [`Release`] on a concrete [`Channel`].

pub mod asset_name;

use crate::error::{Result, SyncError};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use asset_name::{is_tarball, transform_asset_name};

/// Releases at or below this version were published to the mirror by hand.
pub const LEGACY_CUTOVER: Version = Version::new(0, 6, 0);

/// Distribution channel a release is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stable,
    Testing,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Testing => "testing",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release as mirrored: channel plus the verbatim tag name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Release {
    pub channel: Channel,
    pub name: String,
}

impl Release {
    pub fn new(channel: Channel, name: impl Into<String>) -> Self {
        Self {
            channel,
            name: name.into(),
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.channel)
    }
}

/// One downloadable file attached to a remote release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// API URL of the asset; fetched with `Accept: application/octet-stream`
    pub url: String,
    pub name: String,
    pub size: u64,
}

/// A release as reported by the remote release source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
    pub tag_name: String,
    pub prerelease: bool,
    pub assets: Vec<ReleaseAsset>,
}

/// Outcome of classifying a remote release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// At or below [`LEGACY_CUTOVER`]; skipped entirely
    Legacy,
    Active(Release),
}

impl RemoteRelease {
    /// Parse the tag as a semantic version.
    pub fn version(&self) -> Result<Version> {
        Version::parse(&self.tag_name).map_err(|source| SyncError::InvalidTag {
            tag: self.tag_name.clone(),
            source,
        })
    }

    /// Decide whether the release is processed, and on which channel.
    ///
    /// Both the remote prerelease flag and semver prerelease identifiers
    /// put a release on the testing channel.
    pub fn classify(&self) -> Result<Classification> {
        let version = self.version()?;
        if version <= LEGACY_CUTOVER {
            return Ok(Classification::Legacy);
        }

        let channel = if self.prerelease || !version.pre.is_empty() {
            Channel::Testing
        } else {
            Channel::Stable
        };

        Ok(Classification::Active(Release::new(
            channel,
            self.tag_name.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(tag: &str, prerelease: bool) -> RemoteRelease {
        RemoteRelease {
            tag_name: tag.to_string(),
            prerelease,
            assets: vec![],
        }
    }

    #[test]
    fn test_stable_channel() {
        assert_eq!(
            remote("0.32.0", false).classify().unwrap(),
            Classification::Active(Release::new(Channel::Stable, "0.32.0"))
        );
    }

    #[test]
    fn test_semver_prerelease_is_testing() {
        assert_eq!(
            remote("0.32.0-beta.20250421", false).classify().unwrap(),
            Classification::Active(Release::new(Channel::Testing, "0.32.0-beta.20250421"))
        );
    }

    #[test]
    fn test_prerelease_flag_is_testing() {
        assert_eq!(
            remote("0.33.0", true).classify().unwrap(),
            Classification::Active(Release::new(Channel::Testing, "0.33.0"))
        );
    }

    #[test]
    fn test_legacy_cutover() {
        for tag in ["0.6.0", "0.5.9", "0.1.0", "0.6.0-alpha.1"] {
            assert_eq!(
                remote(tag, false).classify().unwrap(),
                Classification::Legacy,
                "{} should be legacy",
                tag
            );
        }
        assert!(matches!(
            remote("0.6.1", false).classify().unwrap(),
            Classification::Active(_)
        ));
    }

    #[test]
    fn test_unparseable_tag_is_error() {
        let err = remote("v0.32.0", false).classify().unwrap_err();
        assert!(matches!(err, SyncError::InvalidTag { ref tag, .. } if tag == "v0.32.0"));
    }

    #[test]
    fn test_remote_release_requires_all_fields() {
        let ok: RemoteRelease = serde_json::from_str(
            r#"{"tag_name":"0.32.0","prerelease":false,"assets":[
                {"url":"https://api.github.com/a/1","name":"ruyi-0.32.0.arm64","size":42}]}"#,
        )
        .unwrap();
        assert_eq!(ok.assets[0].size, 42);

        let missing = serde_json::from_str::<RemoteRelease>(r#"{"tag_name":"0.32.0","assets":[]}"#);
        assert!(missing.is_err());
    }
}
