use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Deliberately not `Serialize`: responses go
/// through `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,                                 // stored lowercase
    pub password_hash: String,                         // Argon2 PHC string
    pub password_reset_token: Option<String>,          // SHA-256 hex of the issued token
    pub password_reset_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Open a reset window. Digest and expiry are always set together.
    pub fn begin_reset(&mut self, digest: String, expires_at: OffsetDateTime) {
        self.password_reset_token = Some(digest);
        self.password_reset_expires = Some(expires_at);
    }

    pub fn clear_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }

    /// True when `digest` matches the open reset window and it has not lapsed at `now`.
    pub fn accepts_reset(&self, digest: &str, now: OffsetDateTime) -> bool {
        match (&self.password_reset_token, self.password_reset_expires) {
            (Some(stored), Some(expires)) => stored == digest && expires > now,
            _ => false,
        }
    }
}

/// Change to the reset window carried by a `UserPatch`.
#[derive(Debug, Clone)]
pub enum ResetChange {
    Open {
        digest: String,
        expires_at: OffsetDateTime,
    },
    Clear,
}

/// Partial update. `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub reset: Option<ResetChange>,
}

impl UserPatch {
    pub fn open_reset(digest: String, expires_at: OffsetDateTime) -> Self {
        Self {
            reset: Some(ResetChange::Open { digest, expires_at }),
            ..Self::default()
        }
    }
}

impl User {
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(hash) = patch.password_hash {
            self.password_hash = hash;
        }
        match patch.reset {
            Some(ResetChange::Open { digest, expires_at }) => self.begin_reset(digest, expires_at),
            Some(ResetChange::Clear) => self.clear_reset(),
            None => {}
        }
    }
}

/// Fields supplied when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
