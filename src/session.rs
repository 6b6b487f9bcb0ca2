//! Signed-in session, its on-disk store and login validation

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::format::parse_timestamp;
use crate::types::{DashError, Result};

/// Authenticated user as returned by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

impl AuthUser {
    fn metadata(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn email_parts(&self) -> Option<(&str, &str)> {
        self.email.as_deref().and_then(|e| e.split_once('@'))
    }

    pub fn profile(&self) -> UserProfile {
        let display_name = self
            .metadata("full_name")
            .or_else(|| self.metadata("name"))
            .or_else(|| self.email_parts().map(|(local, _)| local))
            .filter(|s| !s.is_empty())
            .unwrap_or("User")
            .to_string();

        let account_name = self
            .metadata("organization")
            .map(String::from)
            .or_else(|| {
                self.email_parts()
                    .and_then(|(_, domain)| domain.split('.').next())
                    .filter(|label| !label.is_empty())
                    .map(str::to_uppercase)
            })
            .unwrap_or_else(|| "ORGANIZATION".to_string());

        let account_number = self
            .metadata("account_number")
            .map(String::from)
            .unwrap_or_else(|| {
                let prefix: String = self.id.chars().take(6).collect();
                if prefix.is_empty() {
                    "#SD1123".to_string()
                } else {
                    format!("#SD{}", prefix)
                }
            });

        let last_login = self
            .last_sign_in_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|dt| dt.format("%b %-d, %Y, %I:%M %p").to_string())
            .unwrap_or_else(|| "Just now".to_string());

        UserProfile {
            display_name,
            account_name,
            account_number,
            last_login,
            email: self.email.clone().unwrap_or_default(),
        }
    }
}

/// Display fields derived from the auth user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub display_name: String,
    pub account_name: String,
    pub account_number: String,
    pub last_login: String,
    pub email: String,
}

/// Tokens for a signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > 0 && self.expires_at <= now.timestamp()
    }

    pub fn profile(&self) -> UserProfile {
        self.user.profile()
    }
}

/// Persists the session as JSON under an exclusive file lock
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session. Missing, unreadable and expired sessions are all `None`.
    pub fn load(&self) -> Option<Session> {
        let session = self.load_stored()?;
        if session.is_expired(Utc::now()) {
            tracing::info!("Stored session expired");
            return None;
        }
        Some(session)
    }

    /// Load the stored session even when its access token has expired
    pub fn load_stored(&self) -> Option<Session> {
        let file = File::open(&self.path).ok()?;
        if let Err(e) = file.lock_shared() {
            tracing::warn!(error = %e, "Failed to lock session file");
            return None;
        }

        let mut content = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut content);
        let _ = file.unlock();
        if let Err(e) = read {
            tracing::warn!(error = %e, "Failed to read session file");
            return None;
        }

        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Corrupted session file");
                None
            }
        }
    }

    /// Atomic write: temp file, then rename under an exclusive lock.
    /// The file holds tokens, so it is created readable by the owner only.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = serde_json::to_string_pretty(session)
            .map_err(|e| DashError::Session(format!("Serialization failed: {}", e)))?;
        let temp_path = self.path.with_extension("json.tmp");
        // A leftover temp file would keep its old mode
        let _ = fs::remove_file(&temp_path);
        {
            let mut file = private_options()
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| DashError::Session(format!("Failed to create temp file: {}", e)))?;
            file.write_all(content.as_bytes())
                .map_err(|e| DashError::Session(format!("Failed to write temp file: {}", e)))?;
            file.sync_all()
                .map_err(|e| DashError::Session(format!("Failed to sync temp file: {}", e)))?;
        }

        let target = private_options().truncate(false).open(&self.path)?;
        target
            .lock_exclusive()
            .map_err(|e| DashError::Session(format!("Failed to acquire write lock: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| DashError::Session(format!("Failed to rename temp file: {}", e)))?;
        let _ = target.unlock();
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Write-create options with owner-only permissions on unix
fn private_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

/// Email + password pair entered at login
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checked before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(DashError::Validation(
                "Email and password are required".into(),
            ));
        }
        if !email_pattern().is_match(self.email.trim()) {
            return Err(DashError::Validation("Invalid email format".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn user(value: Value) -> AuthUser {
        serde_json::from_value(value).unwrap()
    }

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at,
            user: user(json!({"id": "abc123def", "email": "amna@sudatel.sd"})),
        }
    }

    #[test]
    fn test_profile_from_metadata() {
        let profile = user(json!({
            "id": "u-1",
            "email": "amna@sudatel.sd",
            "user_metadata": {
                "full_name": "Amna Osman",
                "organization": "Sudatel",
                "account_number": "#SD9000"
            },
            "last_sign_in_at": "2024-02-01T09:05:00Z"
        }))
        .profile();

        assert_eq!(profile.display_name, "Amna Osman");
        assert_eq!(profile.account_name, "Sudatel");
        assert_eq!(profile.account_number, "#SD9000");
        assert_eq!(profile.last_login, "Feb 1, 2024, 09:05 AM");
    }

    #[test]
    fn test_profile_fallbacks_from_email_and_id() {
        let profile = user(json!({
            "id": "abc123def",
            "email": "amna@sudatel.sd",
            "user_metadata": {"name": "  "}
        }))
        .profile();

        assert_eq!(profile.display_name, "amna");
        assert_eq!(profile.account_name, "SUDATEL");
        assert_eq!(profile.account_number, "#SDabc123");
        assert_eq!(profile.last_login, "Just now");
    }

    #[test]
    fn test_profile_bare_defaults() {
        let profile = AuthUser::default().profile();
        assert_eq!(profile.display_name, "User");
        assert_eq!(profile.account_name, "ORGANIZATION");
        assert_eq!(profile.account_number, "#SD1123");
    }

    #[test]
    fn test_store_round_trip_and_clear() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        assert!(store.load().is_none());

        let saved = session(Utc::now().timestamp() + 3600);
        store.save(&saved).unwrap();
        assert_eq!(store.load(), Some(saved));

        store.clear().unwrap();
        assert!(store.load().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_store_ignores_expired_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        store.save(&session(Utc::now().timestamp() - 10)).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_stored_keeps_expired_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let expired = session(Utc::now().timestamp() - 10);
        store.save(&expired).unwrap();
        assert_eq!(store.load_stored(), Some(expired));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        // Stale temp file from an interrupted save
        fs::write(store.path().with_extension("json.tmp"), "old").unwrap();

        store.save(&session(Utc::now().timestamp() + 3600)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_store_ignores_corrupted_file() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_credentials_validation() {
        let err = Credentials::new("", "secret").validate().unwrap_err();
        assert_eq!(err.to_string(), "Email and password are required");

        let err = Credentials::new("amna@sudatel.sd", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "Email and password are required");

        let err = Credentials::new("amna@sudatel", "secret").validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");

        let err = Credentials::new("am na@x.sd", "secret").validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");

        assert!(Credentials::new("amna@sudatel.sd", "secret").validate().is_ok());
    }
}
