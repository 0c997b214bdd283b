// src/auth.rs

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use actix_web::{web, HttpResponse, Responder};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info, warn};
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::{Collection, Database};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{SignInError, SignUpError};
use crate::session::UserSession;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_FAILED_ATTEMPTS: usize = 5;
const ATTEMPT_WINDOW: Duration = Duration::from_secs(60);

/// A user account document in the `users` collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    pub email: String,
    /// bcrypt hash, never the plaintext.
    pub password: String,
    pub created_at: chrono::DateTime<Utc>,
}

/// Verifies email/password pairs and issues sessions. Every failure is
/// decoded into one of the closed [`SignInError`] categories here, at the
/// boundary, so call sites never re-match backend error strings.
#[allow(async_fn_in_trait)]
pub trait AuthGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, SignInError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), SignUpError>;
}

/// Sliding window of failed sign-in attempts per email. After
/// `max_failures` failures inside `window`, further attempts are refused
/// until the window drains.
pub struct AttemptTracker {
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_failures: usize,
    window: Duration,
}

impl Default for AttemptTracker {
    fn default() -> Self {
        Self::with_limits(MAX_FAILED_ATTEMPTS, ATTEMPT_WINDOW)
    }
}

impl AttemptTracker {
    pub fn with_limits(max_failures: usize, window: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_failures,
            window,
        }
    }

    pub fn is_blocked(&self, email: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        match attempts.get_mut(email) {
            Some(failures) => {
                let cutoff = Instant::now();
                failures.retain(|at| cutoff.duration_since(*at) < self.window);
                failures.len() >= self.max_failures
            }
            None => false,
        }
    }

    pub fn record_failure(&self, email: &str) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.entry(email.to_string()).or_default().push(Instant::now());
    }

    pub fn clear(&self, email: &str) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.remove(email);
    }
}

/// `AuthGateway` backed by the `users` collection.
pub struct MongoAuthGateway {
    users: Collection<UserAccount>,
    attempts: AttemptTracker,
    email_shape: Regex,
}

impl MongoAuthGateway {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection::<UserAccount>("users"),
            attempts: AttemptTracker::default(),
            email_shape: email_shape(),
        }
    }
}

fn email_shape() -> Regex {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
}

/// Connection-class failures are the only backend errors worth telling the
/// user to check their network over.
fn is_connection_error(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
    )
}

impl AuthGateway for MongoAuthGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, SignInError> {
        if !self.email_shape.is_match(email) {
            return Err(SignInError::InvalidEmail);
        }
        if self.attempts.is_blocked(email) {
            warn!("Sign-in rate limited for {}", email);
            return Err(SignInError::TooManyRequests);
        }

        let account = match self.users.find_one(doc! { "email": email }).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                self.attempts.record_failure(email);
                return Err(SignInError::UserNotFound);
            }
            Err(e) => {
                error!("Error looking up user: {}", e);
                return Err(if is_connection_error(&e) {
                    SignInError::NetworkFailure
                } else {
                    SignInError::Other
                });
            }
        };

        if verify(password, &account.password).unwrap_or(false) {
            self.attempts.clear(email);
            Ok(UserSession::new(email))
        } else {
            self.attempts.record_failure(email);
            Err(SignInError::WrongPassword)
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), SignUpError> {
        if !self.email_shape.is_match(email) {
            return Err(SignUpError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(SignUpError::WeakPassword(MIN_PASSWORD_LEN));
        }

        match self.users.find_one(doc! { "email": email }).await {
            Ok(Some(_)) => return Err(SignUpError::EmailInUse),
            Ok(None) => {}
            Err(e) => {
                error!("Error checking for existing user: {}", e);
                return Err(if is_connection_error(&e) {
                    SignUpError::NetworkFailure
                } else {
                    SignUpError::Other
                });
            }
        }

        let hashed = hash(password, DEFAULT_COST).map_err(|e| {
            error!("Error hashing password: {}", e);
            SignUpError::Other
        })?;
        let account = UserAccount {
            user_id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: hashed,
            created_at: Utc::now(),
        };
        match self.users.insert_one(&account).await {
            Ok(_) => {
                info!("Created account {}", account.user_id);
                Ok(())
            }
            Err(e) => {
                error!("Error inserting user: {}", e);
                Err(if is_connection_error(&e) {
                    SignUpError::NetworkFailure
                } else {
                    SignUpError::Other
                })
            }
        }
    }
}

// --- JWT for the HTTP surface ---

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn create_jwt(email: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + chrono::Duration::hours(24);
    let claims = Claims {
        sub: email.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

// --- HTTP handlers ---

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn signup(
    data: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> impl Responder {
    match data
        .session
        .gateway()
        .sign_up(payload.email.trim(), &payload.password)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "User created" })),
        Err(e @ (SignUpError::InvalidEmail | SignUpError::WeakPassword(_))) => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        Err(e @ SignUpError::EmailInUse) => HttpResponse::Conflict().body(e.to_string()),
        Err(e @ SignUpError::NetworkFailure) => HttpResponse::BadGateway().body(e.to_string()),
        Err(e @ SignUpError::Other) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> impl Responder {
    match data.session.login(&payload.email, &payload.password).await {
        Ok(session) => match create_jwt(session.email(), &data.config.jwt_secret) {
            Ok(token) => HttpResponse::Ok()
                .json(serde_json::json!({ "token": token, "email": session.email() })),
            Err(e) => {
                error!("Error issuing token: {}", e);
                HttpResponse::InternalServerError().body("Error issuing token")
            }
        },
        Err(e) => {
            let body = serde_json::json!({ "field": e.field(), "message": e.message() });
            match e.status() {
                400 => HttpResponse::BadRequest().json(body),
                401 => HttpResponse::Unauthorized().json(body),
                429 => HttpResponse::TooManyRequests().json(body),
                502 => HttpResponse::BadGateway().json(body),
                _ => HttpResponse::InternalServerError().json(body),
            }
        }
    }
}

pub async fn session(data: web::Data<AppState>) -> impl Responder {
    match data.session.restore_session() {
        Ok(Some(session)) => {
            HttpResponse::Ok().json(serde_json::json!({ "email": session.email() }))
        }
        Ok(None) => HttpResponse::Unauthorized().body("No active session"),
        Err(e) => {
            error!("Error reading credential store: {}", e);
            HttpResponse::InternalServerError().body("Error reading session")
        }
    }
}

pub async fn logout(data: web::Data<AppState>) -> impl Responder {
    match data.session.logout() {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "Logged out" })),
        Err(e) => {
            error!("Error clearing credential store: {}", e);
            HttpResponse::InternalServerError().body("Error logging out")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip() {
        let token = create_jwt("user@example.com", "test-secret").unwrap();
        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "user@example.com");
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = create_jwt("user@example.com", "test-secret").unwrap();
        assert!(validate_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn email_shape_accepts_plain_addresses() {
        let re = email_shape();
        assert!(re.is_match("user@example.com"));
        assert!(re.is_match("first.last@sub.example.co"));
    }

    #[test]
    fn email_shape_rejects_malformed_addresses() {
        let re = email_shape();
        assert!(!re.is_match("not-an-email"));
        assert!(!re.is_match("user@nodot"));
        assert!(!re.is_match("user @example.com"));
        assert!(!re.is_match("@example.com"));
    }

    #[test]
    fn tracker_blocks_after_max_failures() {
        let tracker = AttemptTracker::with_limits(2, Duration::from_secs(60));
        assert!(!tracker.is_blocked("a@b.co"));
        tracker.record_failure("a@b.co");
        assert!(!tracker.is_blocked("a@b.co"));
        tracker.record_failure("a@b.co");
        assert!(tracker.is_blocked("a@b.co"));
    }

    #[test]
    fn tracker_is_per_email() {
        let tracker = AttemptTracker::with_limits(1, Duration::from_secs(60));
        tracker.record_failure("a@b.co");
        assert!(tracker.is_blocked("a@b.co"));
        assert!(!tracker.is_blocked("c@d.co"));
    }

    #[test]
    fn tracker_clears_on_success() {
        let tracker = AttemptTracker::with_limits(1, Duration::from_secs(60));
        tracker.record_failure("a@b.co");
        assert!(tracker.is_blocked("a@b.co"));
        tracker.clear("a@b.co");
        assert!(!tracker.is_blocked("a@b.co"));
    }

    #[test]
    fn tracker_failures_expire_with_the_window() {
        let tracker = AttemptTracker::with_limits(1, Duration::ZERO);
        tracker.record_failure("a@b.co");
        assert!(!tracker.is_blocked("a@b.co"));
    }
}
