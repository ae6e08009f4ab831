//! Startup override resolution.
//!
//! Environment variables are applied first, then the command-line tokens
//! left to right, so the command line wins and a later flag beats an earlier
//! one. Nothing here aborts startup: bad or unknown tokens become
//! [`ArgumentWarning`]s that are logged once logging is up.
//!
//! A value-taking flag (`--cryptkey`, `--network-group`, `--path`) arms a
//! pending slot. While a slot is armed the next token is taken verbatim as
//! its value, even if it looks like a flag.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ArgumentError;

pub const ENV_CRYPTKEY: &str = "FLEETKEEPER_CRYPTKEY";
pub const ENV_NETWORK_GROUP: &str = "FLEETKEEPER_NETWORK_GROUP";
pub const ENV_PATH: &str = "FLEETKEEPER_PATH";

const CRYPTKEY_PREFIX: &str = "--cryptkey=";
const NETWORK_GROUP_PREFIX: &str = "--network-group=";
const PATH_PREFIX: &str = "--path=";

/// Encryption key supplied at startup. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct CryptKey(String);

impl CryptKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CryptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CryptKey(<redacted>)")
    }
}

/// Overrides gathered from the environment and command line.
///
/// Built once and shared read-only for the rest of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupOverrides {
    pub crypt_key: Option<CryptKey>,
    pub network_group: Option<String>,
    pub working_directory: Option<PathBuf>,
    /// Live config-file watching.
    pub watch_config: bool,
    /// Whether the process may relaunch itself.
    pub allow_restart: bool,
    pub ignore_unsupported_environment: bool,
    /// Stay resident after the last worker stops.
    pub process_required: bool,
    /// Ask the OS to keep the system awake.
    pub system_required: bool,
}

impl Default for StartupOverrides {
    fn default() -> Self {
        Self {
            crypt_key: None,
            network_group: None,
            working_directory: None,
            watch_config: true,
            allow_restart: true,
            ignore_unsupported_environment: false,
            process_required: false,
            system_required: false,
        }
    }
}

/// A non-fatal problem found while resolving overrides.
#[derive(Debug)]
pub enum ArgumentWarning {
    Unrecognized(String),
    Invalid(ArgumentError),
}

impl fmt::Display for ArgumentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(token) => write!(f, "unrecognized command-line argument: {token}"),
            Self::Invalid(e) => write!(f, "{e}"),
        }
    }
}

/// Output of [`ArgumentResolver::resolve`].
#[derive(Debug)]
pub struct Resolution {
    pub overrides: StartupOverrides,
    pub warnings: Vec<ArgumentWarning>,
}

impl Resolution {
    /// Emit every collected warning.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!(%warning, "Ignoring startup argument");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    CryptKey,
    NetworkGroup,
    Path,
}

impl Slot {
    const fn argument(self) -> &'static str {
        match self {
            Self::CryptKey => "--cryptkey",
            Self::NetworkGroup => "--network-group",
            Self::Path => "--path",
        }
    }
}

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + 'a>;

/// Turns environment variables and argument tokens into [`StartupOverrides`].
pub struct ArgumentResolver<'a> {
    env: EnvLookup<'a>,
    apply_directory: bool,
}

impl ArgumentResolver<'static> {
    /// Resolver over the real process environment that changes the working
    /// directory as soon as a path override is seen.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            env: Box::new(|name| std::env::var(name).ok()),
            apply_directory: true,
        }
    }
}

impl<'a> ArgumentResolver<'a> {
    /// Resolver over a custom environment lookup. Path overrides are only
    /// recorded, not applied.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        Self {
            env: Box::new(env),
            apply_directory: false,
        }
    }

    /// Whether a path override changes the current directory immediately.
    #[must_use]
    pub fn apply_directory(mut self, apply: bool) -> Self {
        self.apply_directory = apply;
        self
    }

    pub fn resolve<I, S>(&self, tokens: I) -> Resolution
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = ResolveState {
            overrides: StartupOverrides::default(),
            warnings: Vec::new(),
            apply_directory: self.apply_directory,
        };

        for (slot, name) in [
            (Slot::CryptKey, ENV_CRYPTKEY),
            (Slot::NetworkGroup, ENV_NETWORK_GROUP),
            (Slot::Path, ENV_PATH),
        ] {
            if let Some(value) = (self.env)(name).filter(|v| !v.is_empty()) {
                state.assign(slot, &value);
            }
        }

        let mut pending: Option<Slot> = None;
        for token in tokens {
            let token = token.as_ref();
            if let Some(slot) = pending.take() {
                state.assign(slot, token);
                continue;
            }

            match token {
                "--cryptkey" => pending = Some(Slot::CryptKey),
                "--network-group" => pending = Some(Slot::NetworkGroup),
                "--path" => pending = Some(Slot::Path),
                "--ignore-unsupported-environment" => {
                    state.overrides.ignore_unsupported_environment = true;
                }
                "--no-config-watch" => state.overrides.watch_config = false,
                "--no-restart" => state.overrides.allow_restart = false,
                "--process-required" => state.overrides.process_required = true,
                "--system-required" => state.overrides.system_required = true,
                other => match inline_value(other) {
                    Some((slot, value)) => state.assign(slot, value),
                    None => state
                        .warnings
                        .push(ArgumentWarning::Unrecognized(other.to_string())),
                },
            }
        }

        Resolution {
            overrides: state.overrides,
            warnings: state.warnings,
        }
    }
}

/// Split `--flag=value`. The value must be non-empty.
fn inline_value(token: &str) -> Option<(Slot, &str)> {
    [
        (Slot::NetworkGroup, NETWORK_GROUP_PREFIX),
        (Slot::CryptKey, CRYPTKEY_PREFIX),
        (Slot::Path, PATH_PREFIX),
    ]
    .into_iter()
    .find_map(|(slot, prefix)| {
        if token.len() > prefix.len() {
            token.strip_prefix(prefix).map(|value| (slot, value))
        } else {
            None
        }
    })
}

struct ResolveState {
    overrides: StartupOverrides,
    warnings: Vec<ArgumentWarning>,
    apply_directory: bool,
}

impl ResolveState {
    fn assign(&mut self, slot: Slot, value: &str) {
        if let Err(e) = self.try_assign(slot, value) {
            self.warnings.push(ArgumentWarning::Invalid(e));
        }
    }

    fn try_assign(&mut self, slot: Slot, value: &str) -> Result<(), ArgumentError> {
        if value.is_empty() {
            return Err(ArgumentError::EmptyValue {
                argument: slot.argument(),
            });
        }

        match slot {
            Slot::CryptKey => self.overrides.crypt_key = Some(CryptKey::new(value)),
            Slot::NetworkGroup => self.overrides.network_group = Some(value.to_string()),
            Slot::Path => {
                let path = Path::new(value);
                if self.apply_directory {
                    std::env::set_current_dir(path).map_err(|source| {
                        ArgumentError::WorkingDirectory {
                            path: path.to_path_buf(),
                            source,
                        }
                    })?;
                }
                self.overrides.working_directory = Some(path.to_path_buf());
            }
        }
        Ok(())
    }
}
