//! Session context: the bearer token and who gets told when it goes away.
//!
//! A single [`Session`] is created at startup and shared as
//! `Arc<Session>`. It is the only code that touches the persisted token.
//! Components that must react to a logout (the chat loop, for example)
//! hold a [`watch::Receiver`] from [`Session::subscribe`] instead of
//! polling storage.
//!
//! ```text
//! login ──sign_in──▶ Authenticated ──sign_out───▶ SignedOut(Logout)
//!                         │
//!                         └──invalidate──▶ SignedOut(Unauthorized)
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;

/// Persistence for the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token kept in a single file, created with its parent directories.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read token file: {}", self.path.display())),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create token directory: {}", parent.display())
                })?;
            }
        }
        std::fs::write(&self.path, token)
            .with_context(|| format!("Failed to write token file: {}", self.path.display()))?;
        restrict_permissions(&self.path)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove token file: {}", self.path.display())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Token held in memory only.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?
            .clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))? = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// No token was ever stored.
    NeverSignedIn,
    /// The user logged out.
    Logout,
    /// The backend rejected the token.
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    SignedOut(SignOutReason),
}

/// How auth failures are handled by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// Clear the token and send the user back to login.
    #[default]
    Redirect,
    /// Embedded / back-navigable preview: leave the token alone.
    Suppress,
}

pub struct Session {
    store: Box<dyn TokenStore>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        let initial = match store.load() {
            Ok(Some(_)) => SessionState::Authenticated,
            Ok(None) => SessionState::SignedOut(SignOutReason::NeverSignedIn),
            Err(e) => {
                tracing::warn!("cannot read stored token: {:#}", e);
                SessionState::SignedOut(SignOutReason::NeverSignedIn)
            }
        };
        let (state, _) = watch::channel(initial);
        Self { store, state }
    }

    /// Session backed by the token file at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(FileTokenStore::new(path)))
    }

    /// Session that never touches disk.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryTokenStore::new()))
    }

    /// The current token, read from the store on every call.
    pub fn token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("cannot read stored token: {:#}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn sign_in(&self, token: &str) -> Result<()> {
        self.store.save(token)?;
        self.state.send_replace(SessionState::Authenticated);
        tracing::debug!("session signed in");
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        self.end(SignOutReason::Logout)
    }

    /// Drop a token the backend no longer accepts.
    pub fn invalidate(&self) -> Result<()> {
        self.end(SignOutReason::Unauthorized)
    }

    fn end(&self, reason: SignOutReason) -> Result<()> {
        self.store.clear()?;
        self.state.send_replace(SessionState::SignedOut(reason));
        tracing::debug!(?reason, "session signed out");
        Ok(())
    }
}
