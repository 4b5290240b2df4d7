//! Filesystem layout of the installed stack.
//!
//! Every path a run reads or writes lives here so steps never hard-code
//! locations. `Layout::rooted` re-bases the whole tree, which is how tests and
//! staging runs point artifacts at a scratch directory.

use std::path::{Path, PathBuf};

use crate::platform::PlatformFamily;

/// OS account that owns the panel files.
pub const PANEL_USER: &str = "pterodactyl";

/// OS account the daemon runs as.
pub const DAEMON_USER: &str = "pterodactylwings";

/// Paths used by provisioning steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Panel checkout (`/var/www/pterodactyl`)
    pub panel_dir: PathBuf,
    /// Reverse-proxy site file
    pub proxy_site: PathBuf,
    /// Symlink that enables the site, when the distro uses sites-enabled
    pub proxy_enabled_link: Option<PathBuf>,
    /// Default site to remove once ours is enabled
    pub proxy_default_site: Option<PathBuf>,
    /// php-fpm socket the proxy forwards to
    pub php_fpm_socket: PathBuf,
    /// Daemon configuration directory (`/etc/pterodactyl`)
    pub daemon_config_dir: PathBuf,
    /// Daemon state directory (`/var/lib/pterodactyl`)
    pub daemon_data_dir: PathBuf,
    /// Installed daemon binary
    pub daemon_binary: PathBuf,
    /// Process-supervisor unit for the daemon
    pub daemon_unit: PathBuf,
    /// Installed compose binary
    pub compose_binary: PathBuf,
    /// Where transient SQL scripts are created
    pub tmp_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            panel_dir: PathBuf::from("/var/www/pterodactyl"),
            proxy_site: PathBuf::from("/etc/nginx/sites-available/pterodactyl.conf"),
            proxy_enabled_link: Some(PathBuf::from("/etc/nginx/sites-enabled/pterodactyl.conf")),
            proxy_default_site: Some(PathBuf::from("/etc/nginx/sites-enabled/default")),
            php_fpm_socket: PathBuf::from("/var/run/php/php8.2-fpm.sock"),
            daemon_config_dir: PathBuf::from("/etc/pterodactyl"),
            daemon_data_dir: PathBuf::from("/var/lib/pterodactyl"),
            daemon_binary: PathBuf::from("/usr/local/bin/wings"),
            daemon_unit: PathBuf::from("/etc/systemd/system/wings.service"),
            compose_binary: PathBuf::from("/usr/local/bin/docker-compose"),
            tmp_dir: PathBuf::from("/tmp"),
        }
    }
}

impl Layout {
    /// Layout matching the conventions of a platform family.
    ///
    /// RHEL-like nginx has no sites-enabled directory and php-fpm listens on a
    /// different socket.
    pub fn for_platform(family: PlatformFamily) -> Self {
        let mut layout = Self::default();
        if family == PlatformFamily::RhelLike {
            layout.proxy_site = PathBuf::from("/etc/nginx/conf.d/pterodactyl.conf");
            layout.proxy_enabled_link = None;
            layout.proxy_default_site = None;
            layout.php_fpm_socket = PathBuf::from("/run/php-fpm/www.sock");
        }
        layout
    }

    /// Re-base every path under `root`.
    pub fn rooted(mut self, root: &Path) -> Self {
        let rebase = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));

        self.panel_dir = rebase(&self.panel_dir);
        self.proxy_site = rebase(&self.proxy_site);
        self.proxy_enabled_link = self.proxy_enabled_link.as_deref().map(rebase);
        self.proxy_default_site = self.proxy_default_site.as_deref().map(rebase);
        self.daemon_config_dir = rebase(&self.daemon_config_dir);
        self.daemon_data_dir = rebase(&self.daemon_data_dir);
        self.daemon_binary = rebase(&self.daemon_binary);
        self.daemon_unit = rebase(&self.daemon_unit);
        self.compose_binary = rebase(&self.compose_binary);
        self.tmp_dir = rebase(&self.tmp_dir);
        self
    }

    /// Panel environment file.
    pub fn env_file(&self) -> PathBuf {
        self.panel_dir.join(".env")
    }

    /// Document root served by the proxy.
    pub fn panel_public_dir(&self) -> PathBuf {
        self.panel_dir.join("public")
    }

    /// Daemon configuration document.
    pub fn daemon_config_file(&self) -> PathBuf {
        self.daemon_config_dir.join("config.yml")
    }

    /// Daemon server volumes.
    pub fn daemon_volumes_dir(&self) -> PathBuf {
        self.daemon_data_dir.join("volumes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let layout = Layout::default();
        assert_eq!(layout.env_file(), PathBuf::from("/var/www/pterodactyl/.env"));
        assert_eq!(
            layout.daemon_config_file(),
            PathBuf::from("/etc/pterodactyl/config.yml")
        );
        assert!(layout.proxy_enabled_link.is_some());
    }

    #[test]
    fn test_rhel_layout_uses_conf_d() {
        let layout = Layout::for_platform(PlatformFamily::RhelLike);
        assert!(layout.proxy_site.starts_with("/etc/nginx/conf.d"));
        assert!(layout.proxy_enabled_link.is_none());
        assert_eq!(Layout::for_platform(PlatformFamily::Unknown), Layout::default());
    }

    #[test]
    fn test_rooted_rebases_everything() {
        let layout = Layout::default().rooted(Path::new("/srv/stage"));
        assert_eq!(layout.env_file(), PathBuf::from("/srv/stage/var/www/pterodactyl/.env"));
        assert_eq!(layout.tmp_dir, PathBuf::from("/srv/stage/tmp"));
        assert_eq!(
            layout.proxy_enabled_link,
            Some(PathBuf::from("/srv/stage/etc/nginx/sites-enabled/pterodactyl.conf"))
        );
        // The socket is a runtime endpoint, not an artifact
        assert_eq!(layout.php_fpm_socket, Layout::default().php_fpm_socket);
    }
}
