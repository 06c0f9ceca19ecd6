//! Configuration loading.
//!
//! Loads from `$INJEST_CONFIG_PATH` or `./config.toml`. A missing file means
//! defaults. Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::host::DispatchOptions;
use crate::slot::SlotNamespace;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InjestConfig {
    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,
    /// Adapter naming (`[adapter]`).
    pub adapter: AdapterConfig,
    /// Host dispatch settings (`[dispatch]`).
    pub dispatch: DispatchConfig,
    #[serde(skip)]
    rejected: Vec<RejectedOverride>,
}

/// An env override that was present but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOverride {
    /// Name of the env var.
    pub var: &'static str,
    /// Value it held.
    pub value: String,
}

impl InjestConfig {
    /// Load configuration: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Env overrides ignored during [`InjestConfig::load`].
    ///
    /// Loading runs before logging is installed, so the caller reports these
    /// once a subscriber exists.
    pub fn rejected_overrides(&self) -> &[RejectedOverride] {
        &self.rejected
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("INJEST_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Apply env var overrides through `env` (a resolver, so tests avoid `set_var`).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("INJEST_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("INJEST_LOG_DIR") {
            self.logging.dir = Some(v);
        }
        if let Some(v) = env("INJEST_NAMESPACE") {
            self.adapter.namespace = v;
        }
        if let Some(v) = env("INJEST_WORKERS") {
            match v.parse() {
                Ok(n) => self.dispatch.workers = n,
                Err(_) => self.rejected.push(RejectedOverride {
                    var: "INJEST_WORKERS",
                    value: v,
                }),
            }
        }
        if let Some(v) = env("INJEST_MAX_ATTEMPTS") {
            match v.parse() {
                Ok(n) => self.dispatch.max_attempts = n,
                Err(_) => self.rejected.push(RejectedOverride {
                    var: "INJEST_MAX_ATTEMPTS",
                    value: v,
                }),
            }
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }
}

// ── Logging ─────────────────────────────────────────────────────

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; stderr only when absent.
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

// ── Adapter ─────────────────────────────────────────────────────

/// `[adapter]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Namespace that owns the slots.
    pub namespace: String,
    /// Adapter class name within the namespace.
    pub class: String,
}

impl AdapterConfig {
    /// Slot namespace described by this section.
    pub fn slot_namespace(&self) -> SlotNamespace {
        SlotNamespace::new(self.namespace.clone(), self.class.clone())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        let ns = SlotNamespace::default();
        Self {
            namespace: ns.namespace().to_owned(),
            class: ns.class().to_owned(),
        }
    }
}

// ── Dispatch ────────────────────────────────────────────────────

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Concurrent deliveries.
    pub workers: usize,
    /// Delivery attempts per event, including the first.
    pub max_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
        }
    }
}

impl From<&DispatchConfig> for DispatchOptions {
    fn from(config: &DispatchConfig) -> Self {
        DispatchOptions {
            workers: config.workers,
            max_attempts: config.max_attempts,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
