// src/error.rs

use thiserror::Error;

/// Opaque failure from the task backend. Network loss, permission denial
/// and not-found on update/delete all land here; callers report a generic
/// failure rather than branching on the cause.
#[derive(Debug, Error)]
#[error("backend request failed: {message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl BackendError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<mongodb::error::Error> for BackendError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::with_source("task collection request failed", err)
    }
}

/// Failures of the task CRUD operations. Validation problems are caught
/// before any network call is made.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0} is required")]
    Validation(&'static str),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The known sign-in failure categories, decoded once at the gateway
/// boundary. Anything the gateway cannot classify becomes `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignInError {
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("no account exists for this email")]
    UserNotFound,
    #[error("password does not match")]
    WrongPassword,
    #[error("too many failed sign-in attempts")]
    TooManyRequests,
    #[error("could not reach the auth backend")]
    NetworkFailure,
    #[error("sign-in failed")]
    Other,
}

/// Sign-up failure categories, mirroring the sign-in set where they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignUpError {
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("an account already exists for this email")]
    EmailInUse,
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("could not reach the auth backend")]
    NetworkFailure,
    #[error("sign-up failed")]
    Other,
}

/// Failures of the on-device credential file.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credential store {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write credential store {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("credential store is corrupted: {0}")]
    Corrupt(#[from] serde_json::Error),
}
