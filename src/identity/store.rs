use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::Token;
use crate::error::{KeygateError, Result};

const TOKEN_FILE_VERSION: u32 = 1;

/// Durable storage for identity-provider tokens.
pub trait TokenStore: Send + Sync {
    fn load(&self, provider: &str, profile: &str) -> Result<Option<Token>>;
    fn save(&self, provider: &str, profile: &str, token: &Token) -> Result<()>;
    fn clear(&self, provider: &str, profile: &str) -> Result<()>;
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_keygate_dir()
    }
}

/// File-backed token store using TOML files.
///
/// # Example
/// ```no_run
/// use keygate::identity::{FileTokenStore, Token, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     id_token: None,
///     expires_at: None,
///     last_refresh: None,
/// };
/// store.save("cognito", "default", &token)?;
/// # Ok::<(), keygate::error::KeygateError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_keygate_dir(),
        }
    }

    fn token_path(&self, provider: &str, profile: &str) -> PathBuf {
        let provider = normalize_label(provider);
        let profile = normalize_label(profile);
        let name = if profile == "default" {
            format!("{provider}.toml")
        } else {
            format!("{provider}.{profile}.toml")
        };
        self.base_dir.join(name)
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, provider: &str, profile: &str) -> Result<Option<Token>> {
        let path = self.token_path(provider, profile);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(KeygateError::Io(err)),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        if file.version != TOKEN_FILE_VERSION {
            return Err(KeygateError::Storage(format!(
                "Unsupported token file version {} at {}",
                file.version,
                path.display()
            )));
        }
        Ok(Some(file.token))
    }

    fn save(&self, provider: &str, profile: &str, token: &Token) -> Result<()> {
        let path = self.token_path(provider, profile);
        Self::ensure_parent(&path)?;
        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            provider: provider.to_string(),
            profile: profile.to_string(),
            token: token.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!(provider, profile, "token saved");
        Ok(())
    }

    fn clear(&self, provider: &str, profile: &str) -> Result<()> {
        let path = self.token_path(provider, profile);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(KeygateError::Io(err)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    provider: String,
    profile: String,
    token: Token,
    saved_at: DateTime<Utc>,
}

fn default_keygate_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".keygate"))
        .unwrap_or_else(|| PathBuf::from(".keygate"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
