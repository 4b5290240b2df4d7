//! Provisioning plan
//!
//! The whole install is a fixed, ordered list of `StepDescriptor`s. Each one
//! declares what it is (name, phase), when it is unnecessary (idempotency
//! `Guard`), when it is unwanted (`Gate`) and what it does per platform
//! (`ActionTable`). The orchestrator owns the execution semantics; nothing in
//! this module touches the host.
//!
//! # Plan
//!
//! | Phase                | Steps                          | Guard / Gate            |
//! |----------------------|--------------------------------|-------------------------|
//! | SystemPreparation    | system-update                  |                         |
//! | Firewall             | firewall                       |                         |
//! | Timezone             | timezone                       |                         |
//! | ContainerRuntime     | docker, docker-compose         | tool on PATH            |
//! | ReverseProxy         | nginx                          | tool on PATH            |
//! | LanguageRuntime      | php, composer                  | `php -v` / tool on PATH |
//! | DatabaseEngine       | mariadb                        | tool on PATH            |
//! | PanelDatabase        | panel-database                 |                         |
//! | PanelUser            | panel-user                     | user exists             |
//! | PanelSource .. PanelStorage | one step each           |                         |
//! | PeriodicTasks        | queue-worker                   |                         |
//! | ProxyVirtualHost     | nginx-vhost                    |                         |
//! | Tls                  | tls-certificate                | gate: TLS               |
//! | Daemon*              | daemon-database .. daemon-config | gate: daemon          |

use std::fmt;
use std::path::PathBuf;
use strum::{Display, EnumIter};

use crate::layout::{DAEMON_USER, Layout, PANEL_USER};
use crate::platform::PlatformFamily;
use crate::render::{Owner, PANEL_DATABASE, PANEL_DB_USER, TemplateKind};
use crate::state::{ConfigState, SecretKind};

/// Compose release installed when the tool is missing.
pub const COMPOSE_VERSION: &str = "v2.21.0";

/// Repository the daemon binary is released from.
pub const DAEMON_REPO: &str = "pterodactyl/wings";

/// Release asset of the daemon binary.
pub const DAEMON_ASSET: &str = "wings_linux_amd64";

/// Panel release archive.
pub const PANEL_ARCHIVE_URL: &str =
    "https://github.com/pterodactyl/panel/releases/latest/download/panel.tar.gz";

/// Daemon database and user.
pub const DAEMON_DATABASE: &str = "wings";
pub const DAEMON_DB_USER: &str = "wings";

/// Step names, for lookups in the run report.
pub mod steps {
    pub const SYSTEM_UPDATE: &str = "system-update";
    pub const FIREWALL: &str = "firewall";
    pub const TIMEZONE: &str = "timezone";
    pub const DOCKER: &str = "docker";
    pub const DOCKER_COMPOSE: &str = "docker-compose";
    pub const NGINX: &str = "nginx";
    pub const PHP: &str = "php";
    pub const COMPOSER: &str = "composer";
    pub const MARIADB: &str = "mariadb";
    pub const PANEL_DATABASE: &str = "panel-database";
    pub const PANEL_USER: &str = "panel-user";
    pub const PANEL_SOURCE: &str = "panel-source";
    pub const PANEL_ENV: &str = "panel-env";
    pub const PANEL_DEPENDENCIES: &str = "panel-dependencies";
    pub const PANEL_MIGRATIONS: &str = "panel-migrations";
    pub const PANEL_SEED: &str = "panel-seed";
    pub const PANEL_STORAGE: &str = "panel-storage";
    pub const QUEUE_WORKER: &str = "queue-worker";
    pub const NGINX_VHOST: &str = "nginx-vhost";
    pub const TLS_CERTIFICATE: &str = "tls-certificate";
    pub const DAEMON_DATABASE: &str = "daemon-database";
    pub const DAEMON_USER: &str = "daemon-user";
    pub const DAEMON_BINARY: &str = "daemon-binary";
    pub const DAEMON_CONFIG: &str = "daemon-config";

    /// Steps that only run when the daemon is requested.
    pub const DAEMON_STEPS: [&str; 4] = [DAEMON_DATABASE, DAEMON_USER, DAEMON_BINARY, DAEMON_CONFIG];
}

// ============================================================================
// Phases
// ============================================================================

/// Ordered provisioning phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[repr(u8)]
pub enum Phase {
    #[strum(serialize = "System preparation")]
    SystemPreparation = 0,
    #[strum(serialize = "Firewall")]
    Firewall = 1,
    #[strum(serialize = "Timezone")]
    Timezone = 2,
    #[strum(serialize = "Container runtime")]
    ContainerRuntime = 3,
    #[strum(serialize = "Reverse proxy")]
    ReverseProxy = 4,
    #[strum(serialize = "Language runtime")]
    LanguageRuntime = 5,
    #[strum(serialize = "Database engine")]
    DatabaseEngine = 6,
    #[strum(serialize = "Panel database")]
    PanelDatabase = 7,
    #[strum(serialize = "Panel user")]
    PanelUser = 8,
    #[strum(serialize = "Panel source")]
    PanelSource = 9,
    #[strum(serialize = "Panel configuration")]
    PanelConfiguration = 10,
    #[strum(serialize = "Panel dependencies")]
    PanelDependencies = 11,
    #[strum(serialize = "Panel migrations")]
    PanelMigrations = 12,
    #[strum(serialize = "Panel seed data")]
    PanelSeed = 13,
    #[strum(serialize = "Panel storage")]
    PanelStorage = 14,
    #[strum(serialize = "Periodic tasks")]
    PeriodicTasks = 15,
    #[strum(serialize = "Proxy virtual host")]
    ProxyVirtualHost = 16,
    #[strum(serialize = "TLS issuance")]
    Tls = 17,
    #[strum(serialize = "Daemon database")]
    DaemonDatabase = 18,
    #[strum(serialize = "Daemon user")]
    DaemonUser = 19,
    #[strum(serialize = "Daemon binary")]
    DaemonBinary = 20,
    #[strum(serialize = "Daemon configuration")]
    DaemonConfiguration = 21,
}

impl Phase {
    /// Position of this phase in the run (0-based)
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Guards and gates
// ============================================================================

/// Idempotency predicate: when satisfied the step has nothing to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The tool resolves on PATH
    CommandPresent(&'static str),
    /// The command succeeds and its stdout contains `needle`
    CommandOutputContains {
        command: &'static str,
        needle: &'static str,
    },
    /// The OS user exists
    UserExists(&'static str),
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandPresent(cmd) => write!(f, "{} is installed", cmd),
            Self::CommandOutputContains { command, needle } => {
                write!(f, "`{}` reports {}", command, needle)
            }
            Self::UserExists(user) => write!(f, "user {} exists", user),
        }
    }
}

/// Condition over the operator's choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Only when the daemon was requested
    SecondaryDaemon,
    /// Only when a TLS certificate was requested
    Tls,
}

impl Gate {
    /// Returns true if the step should run for `state`.
    pub fn allows(self, state: &ConfigState) -> bool {
        match self {
            Self::SecondaryDaemon => state.install_secondary_daemon,
            Self::Tls => state.install_tls,
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Databases the run provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseTarget {
    Panel,
    Daemon,
}

impl DatabaseTarget {
    pub fn database(self) -> &'static str {
        match self {
            Self::Panel => PANEL_DATABASE,
            Self::Daemon => DAEMON_DATABASE,
        }
    }

    pub fn user(self) -> &'static str {
        match self {
            Self::Panel => PANEL_DB_USER,
            Self::Daemon => DAEMON_DB_USER,
        }
    }

    /// Secret holding this database user's password.
    pub fn secret(self) -> SecretKind {
        match self {
            Self::Panel => SecretKind::PanelDbPassword,
            Self::Daemon => SecretKind::DaemonDbPassword,
        }
    }

    /// Provisioning script for this database.
    ///
    /// Removes anonymous users and the test database, then creates the
    /// database and user. `ALTER USER` makes a re-run apply its new password.
    pub fn sql(self, password: &str) -> String {
        let db = self.database();
        let user = self.user();
        format!(
            "DELETE FROM mysql.user WHERE User='';
DELETE FROM mysql.user WHERE User='root' AND Host NOT IN ('localhost', '127.0.0.1', '::1');
DROP DATABASE IF EXISTS test;
DELETE FROM mysql.db WHERE Db='test' OR Db='test\\_%';
FLUSH PRIVILEGES;
CREATE DATABASE IF NOT EXISTS {db} CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;
CREATE USER IF NOT EXISTS '{user}'@'127.0.0.1' IDENTIFIED BY '{password}';
ALTER USER '{user}'@'127.0.0.1' IDENTIFIED BY '{password}';
GRANT ALL PRIVILEGES ON {db}.* TO '{user}'@'127.0.0.1' WITH GRANT OPTION;
FLUSH PRIVILEGES;
"
        )
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panel => write!(f, "panel database"),
            Self::Daemon => write!(f, "daemon database"),
        }
    }
}

/// One unit of work inside a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a shell command
    Shell {
        command: String,
        description: String,
    },
    /// Generate a secret into the run state (kept if already present)
    GenerateSecret(SecretKind),
    /// Write the provisioning SQL to a temp file, feed it to mysql, delete it
    SqlScript(DatabaseTarget),
    /// Render a template and write it
    Render {
        template: TemplateKind,
        path: PathBuf,
        owner: Option<Owner>,
    },
    /// Resolve the latest release tag and install one of its assets
    InstallLatestRelease {
        repo: &'static str,
        asset: &'static str,
        dest: PathBuf,
    },
}

impl Action {
    /// Shorthand for a shell action.
    pub fn shell(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Shell {
            command: command.into(),
            description: description.into(),
        }
    }

    /// Operator-facing description.
    pub fn describe(&self) -> String {
        match self {
            Self::Shell { description, .. } => description.clone(),
            Self::GenerateSecret(kind) => format!("Generate {}", kind),
            Self::SqlScript(target) => format!("Provision {}", target),
            Self::Render { template, path, .. } => {
                format!("Write {} to {}", template, path.display())
            }
            Self::InstallLatestRelease { repo, asset, .. } => {
                format!("Install latest {} from {}", asset, repo)
            }
        }
    }
}

/// Inputs available when a step builds its action list.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub state: &'a ConfigState,
    pub layout: &'a Layout,
}

/// Builds the ordered action list for a step.
pub type ActionBuilder = fn(&StepContext<'_>) -> Vec<Action>;

/// Platform-keyed lookup of action builders.
#[derive(Debug, Clone, Copy)]
pub enum ActionTable {
    /// Same actions everywhere
    Shared(ActionBuilder),
    /// Distinct command sets per OS family; nothing for `Unknown`
    PerPlatform {
        debian: ActionBuilder,
        rhel: ActionBuilder,
    },
}

impl ActionTable {
    /// Select the builder for `family`.
    ///
    /// `None` means the step is OS-specific and the platform is unknown.
    pub fn lookup(&self, family: PlatformFamily) -> Option<ActionBuilder> {
        match (self, family) {
            (Self::Shared(builder), _) => Some(*builder),
            (Self::PerPlatform { debian, .. }, PlatformFamily::DebianLike) => Some(*debian),
            (Self::PerPlatform { rhel, .. }, PlatformFamily::RhelLike) => Some(*rhel),
            (Self::PerPlatform { .. }, PlatformFamily::Unknown) => None,
        }
    }
}

/// Declarative description of one provisioning step.
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub name: &'static str,
    pub phase: Phase,
    pub guard: Option<Guard>,
    pub gate: Option<Gate>,
    pub actions: ActionTable,
}

impl StepDescriptor {
    fn new(name: &'static str, phase: Phase, actions: ActionTable) -> Self {
        Self {
            name,
            phase,
            guard: None,
            gate: None,
            actions,
        }
    }

    fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Single-quote a value for `bash -c`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

// ============================================================================
// The standard plan
// ============================================================================

/// The full ordered plan for a panel + daemon install.
pub fn standard_plan() -> Vec<StepDescriptor> {
    use ActionTable::{PerPlatform, Shared};

    vec![
        StepDescriptor::new(
            steps::SYSTEM_UPDATE,
            Phase::SystemPreparation,
            PerPlatform {
                debian: system_update_debian,
                rhel: system_update_rhel,
            },
        ),
        StepDescriptor::new(
            steps::FIREWALL,
            Phase::Firewall,
            PerPlatform {
                debian: firewall_ufw,
                rhel: firewall_firewalld,
            },
        ),
        StepDescriptor::new(steps::TIMEZONE, Phase::Timezone, Shared(timezone)),
        StepDescriptor::new(
            steps::DOCKER,
            Phase::ContainerRuntime,
            PerPlatform {
                debian: docker_debian,
                rhel: docker_rhel,
            },
        )
        .guarded(Guard::CommandPresent("docker")),
        StepDescriptor::new(steps::DOCKER_COMPOSE, Phase::ContainerRuntime, Shared(docker_compose))
            .guarded(Guard::CommandPresent("docker-compose")),
        StepDescriptor::new(
            steps::NGINX,
            Phase::ReverseProxy,
            PerPlatform {
                debian: nginx_debian,
                rhel: nginx_rhel,
            },
        )
        .guarded(Guard::CommandPresent("nginx")),
        StepDescriptor::new(
            steps::PHP,
            Phase::LanguageRuntime,
            PerPlatform {
                debian: php_debian,
                rhel: php_rhel,
            },
        )
        .guarded(Guard::CommandOutputContains {
            command: "php -v",
            needle: "8.2",
        }),
        StepDescriptor::new(steps::COMPOSER, Phase::LanguageRuntime, Shared(composer))
            .guarded(Guard::CommandPresent("composer")),
        StepDescriptor::new(
            steps::MARIADB,
            Phase::DatabaseEngine,
            PerPlatform {
                debian: mariadb_debian,
                rhel: mariadb_rhel,
            },
        )
        .guarded(Guard::CommandPresent("mysql")),
        StepDescriptor::new(steps::PANEL_DATABASE, Phase::PanelDatabase, Shared(panel_database)),
        StepDescriptor::new(steps::PANEL_USER, Phase::PanelUser, Shared(panel_user))
            .guarded(Guard::UserExists(PANEL_USER)),
        StepDescriptor::new(steps::PANEL_SOURCE, Phase::PanelSource, Shared(panel_source)),
        StepDescriptor::new(steps::PANEL_ENV, Phase::PanelConfiguration, Shared(panel_env)),
        StepDescriptor::new(
            steps::PANEL_DEPENDENCIES,
            Phase::PanelDependencies,
            Shared(panel_dependencies),
        ),
        StepDescriptor::new(
            steps::PANEL_MIGRATIONS,
            Phase::PanelMigrations,
            Shared(panel_migrations),
        ),
        StepDescriptor::new(steps::PANEL_SEED, Phase::PanelSeed, Shared(panel_seed)),
        StepDescriptor::new(steps::PANEL_STORAGE, Phase::PanelStorage, Shared(panel_storage)),
        StepDescriptor::new(steps::QUEUE_WORKER, Phase::PeriodicTasks, Shared(queue_worker)),
        StepDescriptor::new(steps::NGINX_VHOST, Phase::ProxyVirtualHost, Shared(nginx_vhost)),
        StepDescriptor::new(
            steps::TLS_CERTIFICATE,
            Phase::Tls,
            PerPlatform {
                debian: tls_debian,
                rhel: tls_rhel,
            },
        )
        .gated(Gate::Tls),
        StepDescriptor::new(steps::DAEMON_DATABASE, Phase::DaemonDatabase, Shared(daemon_database))
            .gated(Gate::SecondaryDaemon),
        StepDescriptor::new(steps::DAEMON_USER, Phase::DaemonUser, Shared(daemon_user))
            .guarded(Guard::UserExists(DAEMON_USER))
            .gated(Gate::SecondaryDaemon),
        StepDescriptor::new(steps::DAEMON_BINARY, Phase::DaemonBinary, Shared(daemon_binary))
            .gated(Gate::SecondaryDaemon),
        StepDescriptor::new(
            steps::DAEMON_CONFIG,
            Phase::DaemonConfiguration,
            Shared(daemon_config),
        )
        .gated(Gate::SecondaryDaemon),
    ]
}

// ----------------------------------------------------------------------------
// System
// ----------------------------------------------------------------------------

fn system_update_debian(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("apt-get update", "Update package lists"),
        Action::shell("DEBIAN_FRONTEND=noninteractive apt-get upgrade -y", "Upgrade system"),
        Action::shell(
            "apt-get install -y curl wget git unzip zip tar ca-certificates",
            "Install base utilities",
        ),
    ]
}

fn system_update_rhel(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("yum update -y", "Update system"),
        Action::shell("yum install -y curl wget git unzip tar", "Install base utilities"),
    ]
}

fn firewall_ufw(ctx: &StepContext<'_>) -> Vec<Action> {
    let mut actions = vec![
        Action::shell("ufw allow OpenSSH", "Allow SSH"),
        Action::shell("ufw allow 80/tcp", "Allow HTTP"),
        Action::shell("ufw allow 443/tcp", "Allow HTTPS"),
    ];
    if ctx.state.install_secondary_daemon {
        actions.push(Action::shell("ufw allow 8080/tcp", "Allow daemon API"));
        actions.push(Action::shell("ufw allow 2022/tcp", "Allow daemon SFTP"));
    }
    actions.push(Action::shell("ufw --force enable", "Enable UFW"));
    actions
}

fn firewall_firewalld(ctx: &StepContext<'_>) -> Vec<Action> {
    let mut actions = vec![
        Action::shell("firewall-cmd --permanent --add-service=ssh", "Allow SSH"),
        Action::shell("firewall-cmd --permanent --add-service=http", "Allow HTTP"),
        Action::shell("firewall-cmd --permanent --add-service=https", "Allow HTTPS"),
    ];
    if ctx.state.install_secondary_daemon {
        actions.push(Action::shell(
            "firewall-cmd --permanent --add-port=8080/tcp",
            "Allow daemon API",
        ));
        actions.push(Action::shell(
            "firewall-cmd --permanent --add-port=2022/tcp",
            "Allow daemon SFTP",
        ));
    }
    actions.push(Action::shell("firewall-cmd --reload", "Reload firewall"));
    actions
}

fn timezone(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![Action::shell(
        format!("timedatectl set-timezone {}", shell_quote(&ctx.state.timezone)),
        format!("Set timezone to {}", ctx.state.timezone),
    )]
}

// ----------------------------------------------------------------------------
// Container runtime
// ----------------------------------------------------------------------------

fn docker_debian(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("install -m 0755 -d /etc/apt/keyrings", "Docker keyring directory"),
        Action::shell(
            r#"curl -fsSL "https://download.docker.com/linux/$(. /etc/os-release && echo "$ID")/gpg" -o /etc/apt/keyrings/docker.asc"#,
            "Docker GPG key",
        ),
        Action::shell(
            r#"echo "deb [arch=$(dpkg --print-architecture) signed-by=/etc/apt/keyrings/docker.asc] https://download.docker.com/linux/$(. /etc/os-release && echo "$ID") $(. /etc/os-release && echo "$VERSION_CODENAME") stable" > /etc/apt/sources.list.d/docker.list"#,
            "Docker repository",
        ),
        Action::shell("apt-get update", "Update package lists"),
        Action::shell(
            "apt-get install -y docker-ce docker-ce-cli containerd.io",
            "Install Docker CE",
        ),
        Action::shell("systemctl start docker", "Start Docker"),
        Action::shell("systemctl enable docker", "Enable Docker at boot"),
    ]
}

fn docker_rhel(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("yum install -y yum-utils", "Install yum-utils"),
        Action::shell(
            "yum-config-manager --add-repo https://download.docker.com/linux/centos/docker-ce.repo",
            "Docker repository",
        ),
        Action::shell(
            "yum install -y docker-ce docker-ce-cli containerd.io",
            "Install Docker CE",
        ),
        Action::shell("systemctl start docker", "Start Docker"),
        Action::shell("systemctl enable docker", "Enable Docker at boot"),
    ]
}

fn docker_compose(ctx: &StepContext<'_>) -> Vec<Action> {
    let dest = ctx.layout.compose_binary.display();
    vec![
        Action::shell(
            format!(
                r#"curl -fL "https://github.com/docker/compose/releases/download/{}/docker-compose-$(uname -s)-$(uname -m)" -o {}"#,
                COMPOSE_VERSION, dest
            ),
            format!("Download Docker Compose {}", COMPOSE_VERSION),
        ),
        Action::shell(format!("chmod +x {}", dest), "Make Docker Compose executable"),
        Action::shell(
            format!("ln -sf {} /usr/bin/docker-compose", dest),
            "Link Docker Compose into /usr/bin",
        ),
    ]
}

// ----------------------------------------------------------------------------
// Web stack
// ----------------------------------------------------------------------------

fn nginx_debian(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("apt-get install -y nginx", "Install Nginx"),
        Action::shell("systemctl start nginx", "Start Nginx"),
        Action::shell("systemctl enable nginx", "Enable Nginx at boot"),
    ]
}

fn nginx_rhel(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("yum install -y nginx", "Install Nginx"),
        Action::shell("systemctl start nginx", "Start Nginx"),
        Action::shell("systemctl enable nginx", "Enable Nginx at boot"),
    ]
}

fn php_debian(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell(
            "apt-get install -y software-properties-common",
            "Install add-apt-repository",
        ),
        Action::shell("add-apt-repository -y ppa:ondrej/php", "PHP repository"),
        Action::shell("apt-get update", "Update package lists"),
        Action::shell(
            "apt-get install -y php8.2 php8.2-cli php8.2-common php8.2-curl php8.2-gd \
             php8.2-intl php8.2-mbstring php8.2-mysql php8.2-xml php8.2-zip php8.2-bcmath \
             php8.2-redis php8.2-fpm",
            "Install PHP 8.2",
        ),
    ]
}

fn php_rhel(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("yum install -y epel-release", "Install EPEL"),
        Action::shell(
            "yum install -y https://rpms.remirepo.net/enterprise/remi-release-$(rpm -E %rhel).rpm",
            "PHP repository",
        ),
        Action::shell("yum module reset -y php", "Reset PHP module"),
        Action::shell("yum module enable -y php:remi-8.2", "Enable PHP 8.2 module"),
        Action::shell(
            "yum install -y php php-cli php-common php-gd php-intl php-mbstring php-mysqlnd \
             php-xml php-zip php-bcmath php-pecl-redis5 php-fpm",
            "Install PHP 8.2",
        ),
        Action::shell("systemctl enable --now php-fpm", "Start php-fpm"),
    ]
}

fn composer(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell(
            "cd /tmp && curl -sS https://getcomposer.org/installer | php",
            "Download Composer",
        ),
        Action::shell("mv /tmp/composer.phar /usr/local/bin/composer", "Install Composer"),
        Action::shell("chmod +x /usr/local/bin/composer", "Make Composer executable"),
    ]
}

fn mariadb_debian(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("apt-get install -y mariadb-server mariadb-client", "Install MariaDB"),
        Action::shell("systemctl start mariadb", "Start MariaDB"),
        Action::shell("systemctl enable mariadb", "Enable MariaDB at boot"),
    ]
}

fn mariadb_rhel(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("yum install -y mariadb-server mariadb", "Install MariaDB"),
        Action::shell("systemctl start mariadb", "Start MariaDB"),
        Action::shell("systemctl enable mariadb", "Enable MariaDB at boot"),
    ]
}

// ----------------------------------------------------------------------------
// Panel
// ----------------------------------------------------------------------------

fn panel_database(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::GenerateSecret(SecretKind::PanelDbPassword),
        Action::SqlScript(DatabaseTarget::Panel),
    ]
}

fn panel_user(ctx: &StepContext<'_>) -> Vec<Action> {
    let dir = ctx.layout.panel_dir.display();
    vec![
        Action::shell(
            format!("useradd -r -s /sbin/nologin {}", PANEL_USER),
            format!("Create user {}", PANEL_USER),
        ),
        Action::shell(format!("mkdir -p {}", dir), "Create panel directory"),
        Action::shell(
            format!("chown -R {0}:{0} {1}", PANEL_USER, dir),
            "Set panel directory owner",
        ),
    ]
}

/// Replace the panel directory with a fresh release.
///
/// Unguarded: every run empties the directory first, `.env` and `storage/`
/// uploads included.
fn panel_source(ctx: &StepContext<'_>) -> Vec<Action> {
    let dir = ctx.layout.panel_dir.display();
    vec![
        Action::shell(format!("mkdir -p {}", dir), "Create panel directory"),
        Action::shell(format!("find {} -mindepth 1 -delete", dir), "Clean panel directory"),
        Action::shell(
            format!("curl -fL -o {}/panel.tar.gz {}", dir, PANEL_ARCHIVE_URL),
            "Download panel release",
        ),
        Action::shell(
            format!("tar -xzf {0}/panel.tar.gz -C {0}", dir),
            "Extract panel release",
        ),
        Action::shell(format!("rm -f {}/panel.tar.gz", dir), "Remove panel archive"),
        Action::shell(
            format!("chown -R {0}:{0} {1}", PANEL_USER, dir),
            "Set panel file owner",
        ),
    ]
}

fn panel_env(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::GenerateSecret(SecretKind::AppKey),
        Action::Render {
            template: TemplateKind::EnvFile,
            path: ctx.layout.env_file(),
            owner: Some(Owner::user(PANEL_USER)),
        },
    ]
}

fn artisan(ctx: &StepContext<'_>, args: &str, description: &str) -> Action {
    Action::shell(
        format!("cd {} && php artisan {}", ctx.layout.panel_dir.display(), args),
        description,
    )
}

fn panel_dependencies(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![Action::shell(
        format!(
            "cd {} && COMPOSER_ALLOW_SUPERUSER=1 composer install --no-dev --optimize-autoloader",
            ctx.layout.panel_dir.display()
        ),
        "Install panel dependencies",
    )]
}

fn panel_migrations(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![artisan(ctx, "migrate --force", "Run database migrations")]
}

fn panel_seed(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![artisan(ctx, "db:seed --force", "Seed panel data")]
}

fn panel_storage(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![
        artisan(ctx, "storage:link", "Link public storage"),
        Action::shell(
            format!(
                "cd {} && chmod -R 755 storage bootstrap/cache",
                ctx.layout.panel_dir.display()
            ),
            "Set storage permissions",
        ),
    ]
}

fn queue_worker(ctx: &StepContext<'_>) -> Vec<Action> {
    let entry = format!(
        "* * * * * cd {} && php artisan queue:work --sleep=3 --tries=3 --max-time=3600 >> /dev/null 2>&1",
        ctx.layout.panel_dir.display()
    );
    vec![Action::shell(
        format!("echo {} | crontab -u {} -", shell_quote(&entry), PANEL_USER),
        "Register queue worker crontab",
    )]
}

fn nginx_vhost(ctx: &StepContext<'_>) -> Vec<Action> {
    let site = &ctx.layout.proxy_site;
    let mut actions = vec![Action::Render {
        template: TemplateKind::ProxySite,
        path: site.clone(),
        owner: None,
    }];
    if let Some(link) = &ctx.layout.proxy_enabled_link {
        actions.push(Action::shell(
            format!("ln -sf {} {}", site.display(), link.display()),
            "Enable panel site",
        ));
    }
    if let Some(default_site) = &ctx.layout.proxy_default_site {
        actions.push(Action::shell(
            format!("rm -f {}", default_site.display()),
            "Remove default site",
        ));
    }
    actions.push(Action::shell("nginx -t", "Test Nginx configuration"));
    actions.push(Action::shell("systemctl reload nginx", "Reload Nginx"));
    actions
}

// ----------------------------------------------------------------------------
// TLS
// ----------------------------------------------------------------------------

fn certbot_request(ctx: &StepContext<'_>) -> Action {
    Action::shell(
        format!(
            "certbot --nginx -d {} --non-interactive --agree-tos --email {}",
            shell_quote(ctx.state.domain()),
            shell_quote(&ctx.state.admin_email)
        ),
        format!("Request certificate for {}", ctx.state.domain()),
    )
}

fn tls_debian(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell(
            "apt-get install -y certbot python3-certbot-nginx",
            "Install Certbot",
        ),
        certbot_request(ctx),
    ]
}

fn tls_rhel(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::shell("yum install -y certbot python3-certbot-nginx", "Install Certbot"),
        certbot_request(ctx),
    ]
}

// ----------------------------------------------------------------------------
// Daemon
// ----------------------------------------------------------------------------

fn daemon_database(_: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::GenerateSecret(SecretKind::DaemonDbPassword),
        Action::SqlScript(DatabaseTarget::Daemon),
    ]
}

fn daemon_user(ctx: &StepContext<'_>) -> Vec<Action> {
    let data = ctx.layout.daemon_data_dir.display();
    let config = ctx.layout.daemon_config_dir.display();
    vec![
        Action::shell(
            format!("useradd -r -s /sbin/nologin {}", DAEMON_USER),
            format!("Create user {}", DAEMON_USER),
        ),
        Action::shell(format!("mkdir -p {}", data), "Create daemon data directory"),
        Action::shell(format!("mkdir -p {}", config), "Create daemon config directory"),
        Action::shell(
            format!("chown -R {0}:{0} {1}", DAEMON_USER, data),
            "Set daemon data owner",
        ),
        Action::shell(
            format!("chown -R {0}:{0} {1}", DAEMON_USER, config),
            "Set daemon config owner",
        ),
    ]
}

fn daemon_binary(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![Action::InstallLatestRelease {
        repo: DAEMON_REPO,
        asset: DAEMON_ASSET,
        dest: ctx.layout.daemon_binary.clone(),
    }]
}

fn daemon_config(ctx: &StepContext<'_>) -> Vec<Action> {
    vec![
        Action::GenerateSecret(SecretKind::DaemonApiKey),
        Action::Render {
            template: TemplateKind::DaemonConfig,
            path: ctx.layout.daemon_config_file(),
            owner: Some(Owner::user(DAEMON_USER)),
        },
        Action::Render {
            template: TemplateKind::DaemonUnit,
            path: ctx.layout.daemon_unit.clone(),
            owner: None,
        },
        Action::shell("systemctl daemon-reload", "Reload systemd"),
        Action::shell("systemctl enable wings", "Enable Wings at boot"),
    ]
}
