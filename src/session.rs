// src/session.rs

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::info;
use thiserror::Error;

use crate::auth::AuthGateway;
use crate::error::{CredentialError, SignInError};

/// Key under which the signed-in email is persisted on the device.
pub const EMAIL_KEY: &str = "userEmail";

/// The locally persisted record that a user has signed in. Created on
/// successful login, destroyed on logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    email: String,
}

impl UserSession {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Device-scoped persistent key/value storage for credentials.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;
    fn remove(&self, key: &str) -> Result<(), CredentialError>;
}

/// `CredentialStore` backed by a small JSON file. A missing file reads as
/// an empty store.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, CredentialError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(CredentialError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CredentialError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, contents).map_err(|e| CredentialError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// A login attempt that did not produce a session, tied to the form field
/// the failure should be shown next to.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("email is required")]
    EmailRequired,
    #[error("password is required")]
    PasswordRequired,
    #[error(transparent)]
    SignIn(#[from] SignInError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl LoginError {
    /// The login form field this failure belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            LoginError::EmailRequired => "email",
            LoginError::SignIn(SignInError::InvalidEmail | SignInError::UserNotFound) => "email",
            _ => "password",
        }
    }

    /// User-facing message for the field.
    pub fn message(&self) -> &'static str {
        match self {
            LoginError::EmailRequired => "Email is required",
            LoginError::PasswordRequired => "Password is required",
            LoginError::SignIn(SignInError::InvalidEmail | SignInError::UserNotFound) => {
                "Invalid or non-existing email."
            }
            LoginError::SignIn(SignInError::WrongPassword) => "Incorrect password.",
            LoginError::SignIn(SignInError::TooManyRequests) => {
                "Too many attempts. Try again later."
            }
            LoginError::SignIn(SignInError::NetworkFailure) => {
                "Network error. Please check your connection."
            }
            LoginError::SignIn(SignInError::Other) | LoginError::Credential(_) => {
                "Login failed. Try again."
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            LoginError::EmailRequired | LoginError::PasswordRequired => 400,
            LoginError::SignIn(
                SignInError::InvalidEmail | SignInError::UserNotFound | SignInError::WrongPassword,
            ) => 401,
            LoginError::SignIn(SignInError::TooManyRequests) => 429,
            LoginError::SignIn(SignInError::NetworkFailure) => 502,
            LoginError::SignIn(SignInError::Other) | LoginError::Credential(_) => 500,
        }
    }
}

/// Decides at launch whether the task list or the login form is shown, and
/// owns the login/logout lifecycle around the [`AuthGateway`] and the
/// [`CredentialStore`].
pub struct SessionGate<G, C> {
    gateway: G,
    credentials: C,
}

impl<G: AuthGateway, C: CredentialStore> SessionGate<G, C> {
    pub fn new(gateway: G, credentials: C) -> Self {
        Self {
            gateway,
            credentials,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Reads the persisted email. A present email is treated as a valid
    /// session without server-side verification; a stale backend session
    /// only surfaces on the first task operation.
    pub fn restore_session(&self) -> Result<Option<UserSession>, CredentialError> {
        Ok(self
            .credentials
            .get(EMAIL_KEY)?
            .map(|email| UserSession::new(&email)))
    }

    /// Checks both fields are present, delegates to the gateway, and
    /// persists the email on success. No automatic retry on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSession, LoginError> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() {
            return Err(LoginError::EmailRequired);
        }
        if password.is_empty() {
            return Err(LoginError::PasswordRequired);
        }

        let session = self.gateway.sign_in(email, password).await?;
        self.credentials.set(EMAIL_KEY, email)?;
        info!("Signed in as {}", email);
        Ok(session)
    }

    /// Clears the persisted email. The backend session is not revoked
    /// server-side.
    pub fn logout(&self) -> Result<(), CredentialError> {
        self.credentials.remove(EMAIL_KEY)?;
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::SignUpError;

    /// Gateway stub returning a canned sign-in result and counting calls.
    struct StubGateway {
        result: Result<UserSession, SignInError>,
        calls: AtomicUsize,
    }

    impl StubGateway {
        fn ok(email: &str) -> Self {
            Self {
                result: Ok(UserSession::new(email)),
                calls: AtomicUsize::new(0),
            }
        }

        fn err(err: SignInError) -> Self {
            Self {
                result: Err(err),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AuthGateway for StubGateway {
        async fn sign_in(&self, _: &str, _: &str) -> Result<UserSession, SignInError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        async fn sign_up(&self, _: &str, _: &str) -> Result<(), SignUpError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryCredentialStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl CredentialStore for MemoryCredentialStore {
        fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), CredentialError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn login_persists_the_email() {
        let gate = SessionGate::new(
            StubGateway::ok("user@example.com"),
            MemoryCredentialStore::default(),
        );
        let session = gate.login("user@example.com", "hunter22").await.unwrap();
        assert_eq!(session.email(), "user@example.com");
        assert_eq!(
            gate.credentials.get(EMAIL_KEY).unwrap().as_deref(),
            Some("user@example.com")
        );
    }

    #[tokio::test]
    async fn login_trims_its_inputs() {
        let gate = SessionGate::new(
            StubGateway::ok("user@example.com"),
            MemoryCredentialStore::default(),
        );
        gate.login("  user@example.com  ", " hunter22 ").await.unwrap();
        assert_eq!(
            gate.credentials.get(EMAIL_KEY).unwrap().as_deref(),
            Some("user@example.com")
        );
    }

    #[tokio::test]
    async fn wrong_password_maps_to_password_field_and_leaves_store_untouched() {
        let gate = SessionGate::new(
            StubGateway::err(SignInError::WrongPassword),
            MemoryCredentialStore::default(),
        );
        let err = gate.login("user@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.field(), "password");
        assert_eq!(err.message(), "Incorrect password.");
        assert_eq!(gate.credentials.get(EMAIL_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_email_maps_to_email_field() {
        let gate = SessionGate::new(
            StubGateway::err(SignInError::UserNotFound),
            MemoryCredentialStore::default(),
        );
        let err = gate.login("ghost@example.com", "pw").await.unwrap_err();
        assert_eq!(err.field(), "email");
        assert_eq!(err.message(), "Invalid or non-existing email.");
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_gateway() {
        let gate = SessionGate::new(
            StubGateway::ok("user@example.com"),
            MemoryCredentialStore::default(),
        );

        let err = gate.login("   ", "pw").await.unwrap_err();
        assert!(matches!(err, LoginError::EmailRequired));
        assert_eq!(err.field(), "email");

        let err = gate.login("user@example.com", "").await.unwrap_err();
        assert!(matches!(err, LoginError::PasswordRequired));
        assert_eq!(err.field(), "password");

        assert_eq!(gate.gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_session_reflects_the_stored_email() {
        let gate = SessionGate::new(
            StubGateway::ok("user@example.com"),
            MemoryCredentialStore::default(),
        );
        assert_eq!(gate.restore_session().unwrap(), None);

        gate.login("user@example.com", "hunter22").await.unwrap();
        let restored = gate.restore_session().unwrap().unwrap();
        assert_eq!(restored.email(), "user@example.com");
    }

    #[tokio::test]
    async fn logout_clears_the_stored_email() {
        let gate = SessionGate::new(
            StubGateway::ok("user@example.com"),
            MemoryCredentialStore::default(),
        );
        gate.login("user@example.com", "hunter22").await.unwrap();
        gate.logout().unwrap();
        assert_eq!(gate.restore_session().unwrap(), None);
    }

    #[test]
    fn file_store_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        assert_eq!(store.get(EMAIL_KEY).unwrap(), None);
        store.set(EMAIL_KEY, "user@example.com").unwrap();
        assert_eq!(
            store.get(EMAIL_KEY).unwrap().as_deref(),
            Some("user@example.com")
        );
        store.remove(EMAIL_KEY).unwrap();
        assert_eq!(store.get(EMAIL_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        FileCredentialStore::new(&path)
            .set(EMAIL_KEY, "user@example.com")
            .unwrap();
        let reopened = FileCredentialStore::new(&path);
        assert_eq!(
            reopened.get(EMAIL_KEY).unwrap().as_deref(),
            Some("user@example.com")
        );
    }

    #[test]
    fn removing_an_absent_key_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.remove("nothing").unwrap();
        assert_eq!(store.get("nothing").unwrap(), None);
    }
}
