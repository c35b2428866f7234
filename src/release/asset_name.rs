//! Mirror-facing names for release assets.
//!
//! Single-file distributions are published on GitHub as `ruyi-<ver>.<platform>`,
//! while the mirror historically served them without the version segment.
//! Tarballs keep their versioned name.

use regex::Regex;
use std::sync::OnceLock;

fn tarball_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.tar(?:\.Z|\.gz|\.bz2|\.lz|\.lzma|\.xz|\.zst)?$").expect("valid regex")
    })
}

fn onefile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ruyi-(?P<ver>[0-9a-z.-]+?)\.(?P<platform>[0-9a-z-]+)(?P<exe>\.exe)?$")
            .expect("valid regex")
    })
}

/// Whether the name looks like a (possibly compressed) tar archive.
pub fn is_tarball(name: &str) -> bool {
    tarball_re().is_match(name)
}

/// Map a release asset filename to its version-independent mirror name.
///
/// Unrecognized names are returned unchanged.
pub fn transform_asset_name(name: &str) -> String {
    if is_tarball(name) {
        return name.to_string();
    }

    match onefile_re().captures(name) {
        Some(caps) => format!(
            "ruyi.{}{}",
            &caps["platform"],
            caps.name("exe").map_or("", |m| m.as_str())
        ),
        None => name.to_string(),
    }
}
