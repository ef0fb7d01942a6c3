use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub execution_mode: ExecutionMode,
    pub databases: Vec<String>,
    pub remote: RemoteConfig,
    pub containers: ContainersConfig,
    pub paths: PathsConfig,
}

impl Config {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Default config location: `<platform config dir>/pgward/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pgward")
            .join("config.toml")
    }

    /// Write a commented starter config. Refuses to overwrite an existing file.
    pub fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PGWARD_EXECUTION_MODE") {
            match v.as_str() {
                "local" => self.execution_mode = ExecutionMode::Local,
                "remote" => self.execution_mode = ExecutionMode::Remote,
                other => tracing::warn!("Ignoring unknown PGWARD_EXECUTION_MODE: {}", other),
            }
        }
        if let Ok(v) = std::env::var("PGWARD_REMOTE_HOST") {
            self.remote.host = v;
        }
        if let Ok(v) = std::env::var("PGWARD_REMOTE_USER") {
            self.remote.user = v;
        }
        if let Ok(v) = std::env::var("PGWARD_REMOTE_PORT") {
            match v.parse() {
                Ok(n) => self.remote.port = n,
                Err(_) => tracing::warn!("Ignoring unparsable PGWARD_REMOTE_PORT: {}", v),
            }
        }
        if let Ok(v) = std::env::var("PGWARD_SSH_KEY_PATH") {
            self.remote.ssh_key_path = v;
        }
        if let Ok(v) = std::env::var("PGWARD_BACKUP_DIR") {
            self.paths.backup_dir = v;
        }
    }

    /// The single check the executor layer performs before opening a transport.
    pub fn validate(&self) -> bool {
        self.validation_errors().is_empty()
    }

    /// Everything wrong with this config, for CLI diagnostics.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.containers.postgres.is_empty() {
            errors.push("containers.postgres is not set".to_string());
        }
        if self.containers.backup.is_empty() {
            errors.push("containers.backup is not set".to_string());
        }
        if self.execution_mode == ExecutionMode::Remote {
            if self.remote.host.is_empty() {
                errors.push("remote.host is required in remote mode".to_string());
            }
            if self.remote.user.is_empty() {
                errors.push("remote.user is required in remote mode".to_string());
            }
            if self.remote.port == 0 {
                errors.push("remote.port must be non-zero".to_string());
            }
            if self.remote.ssh_key_path.is_empty() {
                errors.push("remote.ssh_key_path is required in remote mode".to_string());
            }
        }
        errors
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Spawn processes directly on this host.
    #[default]
    Local,
    /// Run every command over an SSH session.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub ssh_key_path: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            port: 22,
            ssh_key_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContainersConfig {
    pub postgres: String,
    pub backup: String,
}

impl Default for ContainersConfig {
    fn default() -> Self {
        Self {
            postgres: "postgres".to_string(),
            backup: "db-backup".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub docker_compose: String,
    pub backup_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            docker_compose: "/opt/stack/docker-compose.yml".to_string(),
            backup_dir: "/var/backups/postgres".to_string(),
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"# pgward configuration

# Where commands run: "local" (direct docker on this host) or "remote" (over SSH).
execution_mode = "local"

# Databases covered by logical backups.
databases = ["app"]

[remote]
host = ""
user = ""
port = 22
ssh_key_path = ""

[containers]
postgres = "postgres"
backup = "db-backup"

[paths]
docker_compose = "/opt/stack/docker-compose.yml"
backup_dir = "/var/backups/postgres"
"#;
