//! Identity collaborator: who the current user is and how to authenticate.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Claims checked, in order, for the user id inside a bearer token.
const USER_ID_CLAIMS: &[&str] = &["userId", "sub", "id"];

/// Source of the current user and their bearer credential.
pub trait Identity: Send + Sync {
    /// The signed-in user's id, or `None` when no usable credential is stored.
    fn current_user_id(&self) -> Option<String>;

    /// The bearer credential to attach to remote calls.
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed identity, mostly for tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: Option<String>,
    token: Option<String>,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            token: Some(token.into()),
        }
    }

    /// An identity with no signed-in user.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl Identity for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Identity derived from a stored JWT-style bearer token.
///
/// The user id is read from the token payload. The signature is not checked;
/// the remote store does that.
#[derive(Debug, Default)]
pub struct TokenIdentity {
    token: RwLock<Option<String>>,
}

impl TokenIdentity {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Load the token from a credential store. A missing file means signed out.
    pub fn from_store(store: &FileCredentialStore) -> io::Result<Self> {
        Ok(Self::new(store.load()?))
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }
}

impl Identity for TokenIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.token().as_deref().and_then(user_id_from_token)
    }

    fn bearer_token(&self) -> Option<String> {
        self.token().filter(|t| !t.is_empty())
    }
}

/// Extract the user id claim from a `header.payload.signature` token.
pub fn user_id_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    USER_ID_CLAIMS.iter().find_map(|claim| match claims.get(*claim)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Bearer token persisted as a single file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Credential file in the default location.
    ///
    /// On Unix: `~/.local/share/linkboard/token`
    /// On Windows: `%LOCALAPPDATA%\linkboard\token`
    pub fn default_location() -> io::Result<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Could not determine home directory"))?;
        Ok(Self::new(base.join("linkboard").join("token")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. Returns `None` if nothing is stored.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    pub fn clear(&self) -> io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
