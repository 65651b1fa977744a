//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SIGNWAY_USER_ID`: Credential user id (required)
//! - `SIGNWAY_SESSION_ID`: Credential session id (required)
//! - `SIGNWAY_RSA_KEY_PEM`: RSA private key PEM
//! - `SIGNWAY_ED25519_SEED`: Ed25519 seed, hex or base64 (used when no RSA
//!   key is set; one of the two is required)
//! - `SIGNWAY_HOSTS`: Comma-separated primary base URLs (required)
//! - `SIGNWAY_ALTERNATE_HOSTS`: Comma-separated alternate-region base URLs
//! - `SIGNWAY_PREFER_ALTERNATE_REGION`: Use the alternate hosts (true/false)
//! - `SIGNWAY_DEBUG_LOGGING`: Verbose wire logging (true/false)
//! - `SIGNWAY_AUTO_SWITCH`: Switch hosts on unreachable-host failures
//!   (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./signway.toml` or `./signway.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use signway_domain::{ApiError, ClientConfig, Credential, KeyMaterial, Result};

pub const ENV_USER_ID: &str = "SIGNWAY_USER_ID";
pub const ENV_SESSION_ID: &str = "SIGNWAY_SESSION_ID";
pub const ENV_RSA_KEY_PEM: &str = "SIGNWAY_RSA_KEY_PEM";
pub const ENV_ED25519_SEED: &str = "SIGNWAY_ED25519_SEED";
pub const ENV_HOSTS: &str = "SIGNWAY_HOSTS";
pub const ENV_ALTERNATE_HOSTS: &str = "SIGNWAY_ALTERNATE_HOSTS";
pub const ENV_PREFER_ALTERNATE_REGION: &str = "SIGNWAY_PREFER_ALTERNATE_REGION";
pub const ENV_DEBUG_LOGGING: &str = "SIGNWAY_DEBUG_LOGGING";
pub const ENV_AUTO_SWITCH: &str = "SIGNWAY_AUTO_SWITCH";

const CONFIG_FILE_NAMES: [&str; 4] = ["signway.toml", "signway.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `ApiError::Config` if required variables are missing or the
/// resulting configuration is invalid.
pub fn load_from_env() -> Result<ClientConfig> {
    let user_id = env_var(ENV_USER_ID)?;
    let session_id = env_var(ENV_SESSION_ID)?;

    let key = if let Some(pem) = optional_env_var(ENV_RSA_KEY_PEM) {
        KeyMaterial::Rsa { private_key_pem: pem }
    } else if let Some(seed) = optional_env_var(ENV_ED25519_SEED) {
        KeyMaterial::Ed25519 { seed }
    } else {
        return Err(ApiError::Config(format!(
            "Missing key material: set {ENV_RSA_KEY_PEM} or {ENV_ED25519_SEED}"
        )));
    };

    let hosts = split_hosts(&env_var(ENV_HOSTS)?);
    let mut config = ClientConfig::new(Credential::new(user_id, session_id, key), hosts);
    config.hosts.alternate =
        optional_env_var(ENV_ALTERNATE_HOSTS).map(|v| split_hosts(&v)).unwrap_or_default();
    config.prefer_alternate_region = env_bool(ENV_PREFER_ALTERNATE_REGION, false);
    config.debug_logging = env_bool(ENV_DEBUG_LOGGING, false);
    config.auto_switch_on_host_failure = env_bool(ENV_AUTO_SWITCH, false);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ApiError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ApiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ApiError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `ApiError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ApiError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory first, then the directory of
/// the running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `ApiError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    optional_env_var(key)
        .ok_or_else(|| ApiError::Config(format!("Missing required environment variable: {key}")))
}

fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_hosts(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
