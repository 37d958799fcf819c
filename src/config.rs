use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Public client application id registered for the device-code flow.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Identity platform authority, e.g. the common tenant.
    #[serde(default = "default_authority")]
    pub authority: String,
    /// OAuth scopes. `offline_access` is required for a refresh token.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Where the serialized token cache lives.
    #[serde(default = "default_token_cache")]
    pub token_cache: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            authority: default_authority(),
            scopes: default_scopes(),
            token_cache: default_token_cache(),
        }
    }
}

fn default_client_id() -> String {
    "1f511e95-ec2f-49b9-a52d-0f164d091f05".to_string()
}
fn default_authority() -> String {
    "https://login.microsoftonline.com/common".to_string()
}
fn default_scopes() -> Vec<String> {
    vec!["Notes.Read".to_string(), "offline_access".to_string()]
}
fn default_token_cache() -> PathBuf {
    PathBuf::from("token_cache.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    /// Graph API root. Overridable so tests can point at a local server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("notes.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    /// Default filter level; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            level: default_log_level(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("gnotes.log")
}
fn default_log_level() -> String {
    "warn".to_string()
}

/// Load configuration from a TOML file. A missing file is not an error —
/// the built-in defaults cover every field, so the binary runs without any
/// config on disk.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.auth.client_id.is_empty() {
        anyhow::bail!("auth.client_id must not be empty");
    }
    if config.auth.scopes.is_empty() {
        anyhow::bail!("auth.scopes must list at least one scope");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = load_config(Path::new("/nonexistent/gnotes.toml")).unwrap();
        assert_eq!(cfg.graph.base_url, "https://graph.microsoft.com/v1.0");
        assert_eq!(cfg.auth.scopes, vec!["Notes.Read", "offline_access"]);
        assert_eq!(cfg.log.level, "warn");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[db]
path = "/tmp/custom.sqlite"
"#,
        )
        .unwrap();
        assert_eq!(cfg.db.path, PathBuf::from("/tmp/custom.sqlite"));
        assert_eq!(
            cfg.auth.authority,
            "https://login.microsoftonline.com/common"
        );
    }
}
