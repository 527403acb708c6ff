use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{ForgotPasswordRequest, LoginRequest, PublicUser, RegisterRequest, ResetPasswordRequest, Session},
        jwt::JwtKeys,
        password::CredentialHasher,
        repo::UserStore,
        repo_types::{NewUser, UserPatch},
        reset_token,
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// Shared by unknown-email and wrong-password failures.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

const MIN_NAME_LEN: usize = 2;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Blank strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Register / login / password-reset flows over a `UserStore`.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    keys: JwtKeys,
    reset_ttl: TimeDuration,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.hasher.clone(),
            state.keys.clone(),
            state.reset_ttl,
        )
    }
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        keys: JwtKeys,
        reset_ttl: TimeDuration,
    ) -> Self {
        Self {
            users,
            hasher,
            keys,
            reset_ttl,
        }
    }

    async fn hash_password(&self, plain: String) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("hash task panicked")??;
        Ok(hash)
    }

    async fn verify_password(&self, plain: String, hash: String) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .context("verify task panicked")??;
        Ok(ok)
    }

    /// Same Argon2 work as a real check, for accounts that do not exist.
    async fn burn_verify(&self, plain: String) -> AppResult<()> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&plain))
            .await
            .context("verify task panicked")??;
        Ok(())
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<PublicUser> {
        let (Some(name), Some(email), Some(password)) =
            (present(req.name), present(req.email), present(req.password))
        else {
            return Err(AppError::Validation(
                "Name, email, and password are required".into(),
            ));
        };

        let name = name.trim().to_string();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(AppError::Validation(
                "Name must be at least 2 characters".into(),
            ));
        }

        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let password_hash = self.hash_password(password).await?;

        // A concurrent registration that slipped past the lookup lands here as DuplicateEmail.
        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(PublicUser::from(&user))
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<Session> {
        let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
            return Err(AppError::Validation("Email and password are required".into()));
        };
        let email = normalize_email(&email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.burn_verify(password).await?;
            warn!(email = %email, "login unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !self
            .verify_password(password, user.password_hash.clone())
            .await?
        {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let token = self.keys.sign(user.id, &user.email)?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(Session {
            token,
            user: PublicUser::from(&user),
        })
    }

    /// Returns the plaintext reset token when the email belongs to a user.
    /// Callers must respond identically in both cases.
    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
        now: OffsetDateTime,
    ) -> AppResult<Option<String>> {
        let Some(email) = present(req.email) else {
            return Err(AppError::Validation("Email is required".into()));
        };
        let email = normalize_email(&email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            info!("password reset requested for unknown email");
            return Ok(None);
        };

        let token = reset_token::issue()?;
        let patch = UserPatch::open_reset(token.digest, now + self.reset_ttl);
        if self.users.save(user.id, patch).await?.is_none() {
            warn!(user_id = %user.id, "user vanished before reset token was stored");
            return Ok(None);
        }

        info!(user_id = %user.id, "password reset token issued");
        Ok(Some(token.plaintext))
    }

    pub async fn reset_password(
        &self,
        token: &str,
        req: ResetPasswordRequest,
        now: OffsetDateTime,
    ) -> AppResult<()> {
        let Some(new_password) = present(req.new_password) else {
            return Err(AppError::Validation("New password is required".into()));
        };

        let digest = reset_token::digest(token);
        let new_hash = self.hash_password(new_password).await?;
        let Some(user) = self.users.consume_reset(&digest, now, &new_hash).await? else {
            warn!("invalid or expired reset token");
            return Err(AppError::InvalidOrExpired);
        };

        info!(user_id = %user.id, "password reset");
        Ok(())
    }
}
