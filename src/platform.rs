//! Host platform detection
//!
//! Identifies the OS family from `/etc/os-release` so each step can pick the
//! right package-manager command set.
//!
//! # Design
//!
//! - **Never fails**: unreadable or unrecognized metadata yields `Unknown`
//! - **Pure core**: `parse_os_release` does no I/O and is unit-tested directly
//! - **Derived once**: the orchestrator detects at construction and never again

use std::path::Path;
use strum::{Display, EnumIter};

/// Canonical location of the OS identification file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PlatformFamily {
    /// Debian, Ubuntu and derivatives (apt-get)
    #[strum(serialize = "debian-like")]
    DebianLike,
    /// RHEL, CentOS, Fedora and derivatives (yum/dnf)
    #[strum(serialize = "rhel-like")]
    RhelLike,
    /// Anything else; OS-specific actions are skipped
    #[strum(serialize = "unknown")]
    Unknown,
}

impl PlatformFamily {
    /// Returns true if the family is recognized.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Map a single os-release identifier to a family.
    fn from_id(id: &str) -> Option<Self> {
        match id {
            "ubuntu" | "debian" => Some(Self::DebianLike),
            "centos" | "rhel" | "fedora" => Some(Self::RhelLike),
            _ => None,
        }
    }
}

/// Detect the host platform from the canonical os-release file.
pub fn detect() -> PlatformFamily {
    detect_from(Path::new(OS_RELEASE_PATH))
}

/// Detect the platform from an arbitrary os-release file.
///
/// A missing or unreadable file logs a warning and yields `Unknown`.
pub fn detect_from(path: &Path) -> PlatformFamily {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let family = parse_os_release(&content);
            tracing::info!("Detected platform {} from {}", family, path.display());
            family
        }
        Err(e) => {
            tracing::warn!("Cannot read {}: {}; platform unknown", path.display(), e);
            PlatformFamily::Unknown
        }
    }
}

/// Parse os-release content into a platform family.
///
/// `ID` wins when it is recognized; otherwise each entry of `ID_LIKE` is tried
/// in order.
pub fn parse_os_release(content: &str) -> PlatformFamily {
    let mut id = None;
    let mut id_like = None;

    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = unquote(value);
        match key {
            "ID" => id = Some(value),
            "ID_LIKE" => id_like = Some(value),
            _ => {}
        }
    }

    if let Some(family) = id.and_then(|id| PlatformFamily::from_id(&id.to_lowercase())) {
        return family;
    }

    id_like
        .into_iter()
        .flat_map(|like| {
            like.split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
        })
        .find_map(|candidate| PlatformFamily::from_id(&candidate))
        .unwrap_or(PlatformFamily::Unknown)
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}
