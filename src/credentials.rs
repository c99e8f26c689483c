//! Session credentials used to authenticate every socket (re)connect

use crate::error::SdkError;
use std::sync::{Arc, RwLock};

/// Identity/token pair issued by the login endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identity: String,
    token: String,
}

impl Credentials {
    /// Create a pair, rejecting empty fields
    pub fn new(identity: &str, token: &str) -> Result<Self, SdkError> {
        if identity.is_empty() || token.is_empty() {
            return Err(SdkError::misuse("userID and token are required"));
        }

        Ok(Self {
            identity: identity.to_string(),
            token: token.to_string(),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("token", &format!("{}...", &self.token.chars().take(6).collect::<String>()))
            .finish()
    }
}

/// Shared, replaceable credential cell.
///
/// Both fields live behind one lock and are swapped as a unit, so a reader
/// always sees a pair that was stored together.
#[derive(Debug, Clone, Default)]
pub struct CredentialsHolder {
    current: Arc<RwLock<Option<Credentials>>>,
}

impl CredentialsHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current pair, `None` until the first `set`
    pub fn get(&self) -> Option<Credentials> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the stored pair
    pub fn set(&self, identity: &str, token: &str) -> Result<(), SdkError> {
        let credentials = Credentials::new(identity, token)?;
        self.replace(credentials);
        Ok(())
    }

    pub fn replace(&self, credentials: Credentials) {
        match self.current.write() {
            Ok(mut guard) => *guard = Some(credentials),
            Err(poisoned) => *poisoned.into_inner() = Some(credentials),
        }
    }

    pub fn clear(&self) {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}
