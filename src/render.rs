//! Configuration artifact rendering
//!
//! Fills the four fixed templates the stack needs from `ConfigState` and
//! writes them to disk with the right owner:
//!
//! | Template       | Artifact                                  |
//! |----------------|-------------------------------------------|
//! | `EnvFile`      | panel `.env` (app, database, cache, mail) |
//! | `DaemonUnit`   | systemd unit for the daemon               |
//! | `ProxySite`    | nginx server block for the panel          |
//! | `DaemonConfig` | daemon `config.yml`                       |
//!
//! Substitution is literal; templates have no conditionals or loops. A
//! template that needs a secret which has not been generated yet fails with
//! `RenderError::MissingSecret` instead of rendering an empty credential.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use strum::{Display, EnumIter};
use thiserror::Error;

use crate::error::{InstallError, Result};
use crate::layout::{DAEMON_USER, Layout};
use crate::runner::CommandRunner;
use crate::state::{ConfigState, SecretKind};

/// Panel database name.
pub const PANEL_DATABASE: &str = "panel";

/// Panel database user.
pub const PANEL_DB_USER: &str = "pterodactyl";

/// Port the daemon API listens on.
pub const DAEMON_API_PORT: u16 = 8080;

/// Port the daemon SFTP server binds.
pub const DAEMON_SFTP_PORT: u16 = 2022;

/// Errors from template rendering
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("{template} needs {secret}, which has not been generated")]
    MissingSecret {
        template: TemplateKind,
        secret: SecretKind,
    },

    #[error("failed to serialize {template}: {reason}")]
    Serialize {
        template: TemplateKind,
        reason: String,
    },
}

/// The fixed artifact templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TemplateKind {
    #[strum(serialize = "panel environment file")]
    EnvFile,
    #[strum(serialize = "daemon service unit")]
    DaemonUnit,
    #[strum(serialize = "proxy site")]
    ProxySite,
    #[strum(serialize = "daemon configuration")]
    DaemonConfig,
}

/// File owner applied after writing an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user: String,
    pub group: String,
}

impl Owner {
    /// Owner whose group has the same name as the user.
    pub fn user(name: &str) -> Self {
        Self {
            user: name.to_string(),
            group: name.to_string(),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.group)
    }
}

/// Render a template from the current state.
pub fn render(kind: TemplateKind, state: &ConfigState, layout: &Layout) -> std::result::Result<String, RenderError> {
    match kind {
        TemplateKind::EnvFile => render_env(state),
        TemplateKind::DaemonUnit => Ok(render_unit(layout)),
        TemplateKind::ProxySite => Ok(render_proxy_site(state, layout)),
        TemplateKind::DaemonConfig => render_daemon_config(state, layout),
    }
}

fn require(state: &ConfigState, template: TemplateKind, secret: SecretKind) -> std::result::Result<&str, RenderError> {
    state
        .secret(secret)
        .ok_or(RenderError::MissingSecret { template, secret })
}

fn render_env(state: &ConfigState) -> std::result::Result<String, RenderError> {
    let app_key = require(state, TemplateKind::EnvFile, SecretKind::AppKey)?;
    let db_password = require(state, TemplateKind::EnvFile, SecretKind::PanelDbPassword)?;

    Ok(format!(
        "APP_NAME=Pterodactyl
APP_ENV=production
APP_KEY={app_key}
APP_DEBUG=false
APP_URL=http://{domain}
APP_TIMEZONE={timezone}

DB_CONNECTION=mysql
DB_HOST=127.0.0.1
DB_PORT=3306
DB_DATABASE={database}
DB_USERNAME={db_user}
DB_PASSWORD={db_password}

REDIS_HOST=127.0.0.1
REDIS_PASSWORD=null
REDIS_PORT=6379

MAIL_MAILER=smtp
MAIL_HOST=mailhog
MAIL_PORT=1025
MAIL_ADDRESS=null
MAIL_USERNAME=null
MAIL_PASSWORD=null
MAIL_ENCRYPTION=null
",
        domain = state.domain(),
        timezone = state.timezone,
        database = PANEL_DATABASE,
        db_user = PANEL_DB_USER,
    ))
}

fn render_unit(layout: &Layout) -> String {
    format!(
        "[Unit]
Description=Pterodactyl Wings Daemon
After=docker.service
Requires=docker.service

[Service]
User={user}
Group={user}
ExecStart={binary}
Restart=on-failure
StartLimitBurst=3
StartLimitInterval=60s

[Install]
WantedBy=multi-user.target
",
        user = DAEMON_USER,
        binary = layout.daemon_binary.display(),
    )
}

fn render_proxy_site(state: &ConfigState, layout: &Layout) -> String {
    format!(
        r#"server {{
    listen 80;
    server_name {domain};
    root {root};
    index index.php index.html;

    location / {{
        try_files $uri $uri/ /index.php?$query_string;
    }}

    location ~ \.php$ {{
        include fastcgi_params;
        fastcgi_pass unix:{socket};
        fastcgi_index index.php;
        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;
        fastcgi_buffer_size 128k;
        fastcgi_buffers 4 256k;
        fastcgi_busy_buffers_size 256k;
    }}

    location ~ /\. {{
        deny all;
    }}

    client_max_body_size 100m;
}}
"#,
        domain = state.domain(),
        root = layout.panel_public_dir().display(),
        socket = layout.php_fpm_socket.display(),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DaemonConfigDoc<'a> {
    log_level: &'a str,
    api: ApiSection,
    system: SystemSection,
    remote: RemoteSection<'a>,
}

#[derive(Serialize)]
struct ApiSection {
    host: &'static str,
    port: u16,
    ssl: SslSection,
}

#[derive(Serialize)]
struct SslSection {
    enabled: bool,
}

#[derive(Serialize)]
struct SystemSection {
    data: String,
    sftp: SftpSection,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SftpSection {
    bind_port: u16,
}

#[derive(Serialize)]
struct RemoteSection<'a> {
    base: String,
    key: &'a str,
}

fn render_daemon_config(state: &ConfigState, layout: &Layout) -> std::result::Result<String, RenderError> {
    let key = require(state, TemplateKind::DaemonConfig, SecretKind::DaemonApiKey)?;

    let doc = DaemonConfigDoc {
        log_level: "info",
        api: ApiSection {
            host: "0.0.0.0",
            port: DAEMON_API_PORT,
            ssl: SslSection { enabled: false },
        },
        system: SystemSection {
            data: layout.daemon_volumes_dir().display().to_string(),
            sftp: SftpSection {
                bind_port: DAEMON_SFTP_PORT,
            },
        },
        remote: RemoteSection {
            base: format!("http://{}", state.domain()),
            key,
        },
    };

    // JSON is a YAML subset, so the daemon reads this as config.yml
    serde_json::to_string_pretty(&doc)
        .map(|mut text| {
            text.push('\n');
            text
        })
        .map_err(|e| RenderError::Serialize {
            template: TemplateKind::DaemonConfig,
            reason: e.to_string(),
        })
}

/// Write an artifact, then hand it to `owner`.
///
/// The parent directory is created if needed. Ownership is applied through the
/// command runner so a failed `chown` is reported like any other action.
pub fn write(path: &Path, text: &str, owner: Option<&Owner>, runner: &dyn CommandRunner) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    tracing::debug!("Wrote {} ({} bytes)", path.display(), text.len());

    if let Some(owner) = owner {
        let outcome = runner.run(
            &format!("chown {} {}", owner, path.display()),
            &format!("Set owner of {}", path.display()),
        );
        if !outcome.ok {
            return Err(InstallError::command(
                outcome
                    .error_message
                    .unwrap_or_else(|| format!("chown {} failed", path.display())),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutcome;
    use std::cell::RefCell;

    fn state_with_secrets() -> ConfigState {
        let mut state = ConfigState::new("panel.example.com", "admin@example.com", "UTC", true, true)
            .expect("state");
        state
            .set_secret(SecretKind::PanelDbPassword, "0123456789abcdef01234567".into())
            .expect("set");
        state
            .set_secret(SecretKind::AppKey, "base64:AAAA".into())
            .expect("set");
        state
            .set_secret(SecretKind::DaemonApiKey, "fedcba9876543210fedcba9876543210".into())
            .expect("set");
        state
    }

    struct RecordingRunner {
        commands: RefCell<Vec<String>>,
        ok: bool,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &str, description: &str) -> CommandOutcome {
            self.commands.borrow_mut().push(command.to_string());
            if self.ok {
                CommandOutcome::success()
            } else {
                CommandOutcome::failure(format!("{} failed (exit code 1)", description))
            }
        }
    }

    #[test]
    fn test_env_file_embeds_secrets() {
        let state = state_with_secrets();
        let env = render(TemplateKind::EnvFile, &state, &Layout::default()).expect("render");
        assert!(env.contains("DB_PASSWORD=0123456789abcdef01234567\n"));
        assert!(env.contains("APP_KEY=base64:AAAA\n"));
        assert!(env.contains("APP_URL=http://panel.example.com\n"));
        assert!(env.contains("DB_DATABASE=panel\n"));
    }

    #[test]
    fn test_env_file_requires_db_password() {
        let mut state = ConfigState::new("panel.example.com", "a@b.c", "UTC", false, false)
            .expect("state");
        state
            .set_secret(SecretKind::AppKey, "base64:AAAA".into())
            .expect("set");
        let err = render(TemplateKind::EnvFile, &state, &Layout::default()).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingSecret {
                template: TemplateKind::EnvFile,
                secret: SecretKind::PanelDbPassword,
            }
        );
    }

    #[test]
    fn test_proxy_site_uses_layout() {
        let state = state_with_secrets();
        let site = render(TemplateKind::ProxySite, &state, &Layout::default()).expect("render");
        assert!(site.contains("server_name panel.example.com;"));
        assert!(site.contains("root /var/www/pterodactyl/public;"));
        assert!(site.contains("fastcgi_pass unix:/var/run/php/php8.2-fpm.sock;"));
    }

    #[test]
    fn test_unit_runs_as_daemon_user() {
        let state = state_with_secrets();
        let unit = render(TemplateKind::DaemonUnit, &state, &Layout::default()).expect("render");
        assert!(unit.contains("User=pterodactylwings"));
        assert!(unit.contains("ExecStart=/usr/local/bin/wings"));
        assert!(unit.contains("Requires=docker.service"));
    }

    #[test]
    fn test_daemon_config_document() {
        let state = state_with_secrets();
        let text = render(TemplateKind::DaemonConfig, &state, &Layout::default()).expect("render");
        let doc: serde_json::Value = serde_json::from_str(&text).expect("valid json");

        assert_eq!(doc["logLevel"], "info");
        assert_eq!(doc["api"]["port"], 8080);
        assert_eq!(doc["api"]["ssl"]["enabled"], false);
        assert_eq!(doc["system"]["sftp"]["bindPort"], 2022);
        assert_eq!(doc["system"]["data"], "/var/lib/pterodactyl/volumes");
        assert_eq!(doc["remote"]["base"], "http://panel.example.com");
        assert_eq!(doc["remote"]["key"], "fedcba9876543210fedcba9876543210");
    }

    #[test]
    fn test_write_creates_file_and_chowns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/.env");
        let runner = RecordingRunner {
            commands: RefCell::new(Vec::new()),
            ok: true,
        };

        write(&path, "A=1\n", Some(&Owner::user("pterodactyl")), &runner).expect("write");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "A=1\n");
        let commands = runner.commands.borrow();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("chown pterodactyl:pterodactyl "));
    }

    #[test]
    fn test_write_reports_chown_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        let runner = RecordingRunner {
            commands: RefCell::new(Vec::new()),
            ok: false,
        };

        let err = write(&path, "{}", Some(&Owner::user("nobody")), &runner).unwrap_err();
        assert!(matches!(err, InstallError::Command(_)));
        // The file itself is still written
        assert!(path.exists());
    }

    #[test]
    fn test_write_without_owner_runs_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner {
            commands: RefCell::new(Vec::new()),
            ok: true,
        };
        write(&dir.path().join("x"), "x", None, &runner).expect("write");
        assert!(runner.commands.borrow().is_empty());
    }
}
