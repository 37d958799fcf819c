//! Access tokens for the Graph API.
//!
//! Acquisition order mirrors what the operator expects: a cached account is
//! offered first and refreshed silently; when that yields nothing, the
//! OAuth2 device-code flow runs interactively (verification URL + short
//! code, with the code copied to the clipboard as a convenience).
//!
//! The token cache is a small JSON file holding one refresh token per
//! account. It is loaded into a [`CacheFile`] guard whose `Drop` writes the
//! cache back whenever its content changed, so every exit path of
//! acquisition — success, error, early return — persists the refreshed
//! state.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Marker phrase in the device-flow instruction text that precedes the code.
const CODE_MARKER: &str = "enter the code ";

/// One account entry in the serialized cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAccount {
    pub username: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenCache {
    #[serde(default)]
    accounts: Vec<CachedAccount>,
}

/// Scoped handle on the on-disk token cache. Mutations set a dirty flag;
/// `Drop` persists a dirty cache so a refreshed token survives the run even
/// when acquisition bails out half-way.
pub struct CacheFile {
    path: PathBuf,
    cache: TokenCache,
    dirty: bool,
}

impl CacheFile {
    /// Load the cache, treating a missing or unreadable file as empty.
    pub fn load(path: &Path) -> Self {
        let cache = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            cache,
            dirty: false,
        }
    }

    fn accounts(&self) -> &[CachedAccount] {
        &self.cache.accounts
    }

    fn upsert_account(&mut self, username: &str, refresh_token: String) {
        match self
            .cache
            .accounts
            .iter_mut()
            .find(|a| a.username == username)
        {
            Some(account) => {
                if account.refresh_token != refresh_token {
                    account.refresh_token = refresh_token;
                    self.dirty = true;
                }
            }
            None => {
                self.cache.accounts.push(CachedAccount {
                    username: username.to_string(),
                    refresh_token,
                });
                self.dirty = true;
            }
        }
    }

    fn persist(&mut self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.cache)?;
        std::fs::write(&self.path, serialized)?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for CacheFile {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.persist() {
                tracing::warn!(error = %e, path = %self.path.display(), "failed to persist token cache");
            }
        }
    }
}

/// A successful token grant.
#[derive(Debug)]
struct Grant {
    access_token: String,
    refresh_token: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    correlation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    message: String,
    #[serde(default = "default_poll_interval")]
    interval: u64,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_expiry() -> u64 {
    900
}

/// Obtain a bearer token: silent refresh of a cached account when possible,
/// the interactive device-code flow otherwise.
pub async fn acquire_token(config: &AuthConfig) -> Result<String> {
    let mut cache = CacheFile::load(&config.token_cache);
    let http = reqwest::Client::new();
    let scope = config.scopes.join(" ");

    if !cache.accounts().is_empty() {
        let chosen = pick_account(cache.accounts())?.cloned();
        if let Some(account) = chosen {
            match refresh_grant(&http, config, &scope, &account).await {
                Ok(grant) => {
                    cache.upsert_account(&grant.username, grant.refresh_token);
                    return Ok(grant.access_token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "silent token acquisition failed, falling back to device flow");
                }
            }
        }
    }

    println!("Trying to get token...");
    let grant = device_code_grant(&http, config, &scope).await?;
    cache.upsert_account(&grant.username, grant.refresh_token);
    Ok(grant.access_token)
}

/// Print the cached accounts as a stable-ordered indexed list and read the
/// operator's pick from stdin. An unparsable or out-of-range answer skips
/// silent acquisition instead of failing the run.
fn pick_account(accounts: &[CachedAccount]) -> Result<Option<&CachedAccount>> {
    println!("Pick the account you want to use to proceed:");
    for (index, account) in accounts.iter().enumerate() {
        println!("{} {}", index, account.username);
    }
    print!("Type number: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let chosen = line
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|i| accounts.get(i));
    if chosen.is_none() {
        tracing::warn!(answer = %line.trim(), "account pick not understood");
    }
    Ok(chosen)
}

async fn refresh_grant(
    http: &reqwest::Client,
    config: &AuthConfig,
    scope: &str,
    account: &CachedAccount,
) -> Result<Grant> {
    let response: TokenResponse = http
        .post(token_endpoint(&config.authority))
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", account.refresh_token.as_str()),
            ("scope", scope),
        ])
        .send()
        .await?
        .json()
        .await?;

    into_grant(response, &account.refresh_token, &account.username)
}

async fn device_code_grant(
    http: &reqwest::Client,
    config: &AuthConfig,
    scope: &str,
) -> Result<Grant> {
    let flow: DeviceCodeResponse = http
        .post(devicecode_endpoint(&config.authority))
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("scope", scope),
        ])
        .send()
        .await?
        .json()
        .await?;

    println!("{}", flow.message);
    if let Some(code) = extract_user_code(&flow.message) {
        copy_to_clipboard(code);
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(flow.expires_in);
    let mut interval = flow.interval.max(1);

    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_secs(interval)).await;

        let response: TokenResponse = http
            .post(token_endpoint(&config.authority))
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", flow.device_code.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        match response.error.as_deref() {
            Some("authorization_pending") => continue,
            Some("slow_down") => {
                interval += 5;
                continue;
            }
            _ => return into_grant(response, "", "default"),
        }
    }

    Err(Error::DeviceCodeExpired)
}

/// Turn a token response into a grant, or into the Auth error carrying the
/// service diagnostics. The fallbacks cover responses that omit a rotated
/// refresh token or an id_token.
fn into_grant(
    response: TokenResponse,
    fallback_refresh: &str,
    fallback_username: &str,
) -> Result<Grant> {
    let Some(access_token) = response.access_token else {
        return Err(Error::Auth {
            code: response.error.unwrap_or_else(|| "unknown_error".to_string()),
            description: response.error_description.unwrap_or_default(),
            correlation_id: response.correlation_id,
        });
    };

    let username = response
        .id_token
        .as_deref()
        .and_then(username_from_id_token)
        .unwrap_or_else(|| fallback_username.to_string());

    Ok(Grant {
        access_token,
        refresh_token: response
            .refresh_token
            .unwrap_or_else(|| fallback_refresh.to_string()),
        username,
    })
}

/// Read `preferred_username` out of an id_token without validating it; the
/// claim is only used as a cache key.
fn username_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("preferred_username")?
        .as_str()
        .map(str::to_string)
}

/// Pull the short user code out of the flow's instruction text.
fn extract_user_code(message: &str) -> Option<&str> {
    message.split(CODE_MARKER).nth(1)?.split_whitespace().next()
}

/// Best-effort clipboard copy; headless environments have no clipboard and
/// that must not fail authentication.
fn copy_to_clipboard(code: &str) {
    let copied = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(code.to_string()));
    match copied {
        Ok(()) => println!("Code {} has been copied to clipboard.", code),
        Err(e) => tracing::warn!(error = %e, "could not copy device code to clipboard"),
    }
}

fn token_endpoint(authority: &str) -> String {
    format!("{}/oauth2/v2.0/token", authority.trim_end_matches('/'))
}

fn devicecode_endpoint(authority: &str) -> String {
    format!("{}/oauth2/v2.0/devicecode", authority.trim_end_matches('/'))
}
