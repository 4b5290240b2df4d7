//! Run configuration state
//!
//! `ConfigState` is the one mutable record threaded through a run: the
//! operator's answers plus the secrets generated along the way. It is passed
//! as `&mut` into the orchestrator and never shared or persisted whole; only
//! individual fields are embedded into rendered artifacts.
//!
//! # Invariants
//!
//! - `domain` is non-empty (enforced by the collector and `ConfigState::new`)
//! - Each secret is written at most once; a second write is rejected and the
//!   stored value is left untouched, so every artifact sees the same bytes

use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter};
use thiserror::Error;

use crate::credentials::{self, CredentialError};

/// Generated credentials tracked by the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum SecretKind {
    /// Password of the panel's database user
    PanelDbPassword,
    /// Password of the daemon's database user
    DaemonDbPassword,
    /// Panel application encryption key (`APP_KEY`)
    AppKey,
    /// Key the daemon presents to the panel API
    DaemonApiKey,
}

impl SecretKind {
    /// Generate a fresh value with the shape this secret requires.
    pub fn generate(self) -> Result<String, CredentialError> {
        match self {
            Self::PanelDbPassword | Self::DaemonDbPassword => {
                credentials::password(credentials::DB_PASSWORD_LEN)
            }
            Self::AppKey => credentials::encryption_key(),
            Self::DaemonApiKey => credentials::password(credentials::API_KEY_LEN),
        }
    }
}

/// Errors from state mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("secret {0} was already generated for this run")]
    SecretAlreadySet(SecretKind),

    #[error("domain must not be empty")]
    EmptyDomain,
}

/// The operator's choices and the secrets generated for this run.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigState {
    domain: String,
    pub admin_email: String,
    pub timezone: String,
    pub install_secondary_daemon: bool,
    pub install_tls: bool,
    secrets: BTreeMap<SecretKind, String>,
}

impl ConfigState {
    /// Create a state with no secrets.
    ///
    /// # Errors
    ///
    /// `StateError::EmptyDomain` if `domain` is blank.
    pub fn new(
        domain: impl Into<String>,
        admin_email: impl Into<String>,
        timezone: impl Into<String>,
        install_secondary_daemon: bool,
        install_tls: bool,
    ) -> Result<Self, StateError> {
        let domain = domain.into();
        if domain.trim().is_empty() {
            return Err(StateError::EmptyDomain);
        }
        Ok(Self {
            domain,
            admin_email: admin_email.into(),
            timezone: timezone.into(),
            install_secondary_daemon,
            install_tls,
            secrets: BTreeMap::new(),
        })
    }

    /// Panel domain name.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Look up a generated secret.
    pub fn secret(&self, kind: SecretKind) -> Option<&str> {
        self.secrets.get(&kind).map(String::as_str)
    }

    /// Store a secret. Write-once.
    ///
    /// # Errors
    ///
    /// `StateError::SecretAlreadySet` if `kind` already holds a value.
    pub fn set_secret(&mut self, kind: SecretKind, value: String) -> Result<&str, StateError> {
        use std::collections::btree_map::Entry;

        match self.secrets.entry(kind) {
            Entry::Occupied(_) => Err(StateError::SecretAlreadySet(kind)),
            Entry::Vacant(slot) => Ok(slot.insert(value).as_str()),
        }
    }
}

impl fmt::Debug for ConfigState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let generated: Vec<SecretKind> = self.secrets.keys().copied().collect();
        f.debug_struct("ConfigState")
            .field("domain", &self.domain)
            .field("admin_email", &self.admin_email)
            .field("timezone", &self.timezone)
            .field("install_secondary_daemon", &self.install_secondary_daemon)
            .field("install_tls", &self.install_tls)
            .field("secrets", &generated)
            .finish()
    }
}
