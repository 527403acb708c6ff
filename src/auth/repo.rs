use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ResetChange, User, UserPatch};
use crate::error::StoreError;

/// Persistence for user records. Implementations own email uniqueness and
/// reset-token single use.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// Write only the fields set in `patch`. `None` if the user is gone.
    async fn save(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError>;
    /// Atomically swap in `new_hash` and close the reset window, provided
    /// `digest` matches a window still open at `now`. At most one caller wins.
    async fn consume_reset(
        &self,
        digest: &str,
        now: OffsetDateTime,
        new_hash: &str,
    ) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, password_reset_token,
                   password_reset_expires, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, password_reset_token,
                   password_reset_expires, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, password_reset_token,
                      password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_err)
    }

    async fn save(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let (touch_reset, digest, expires) = match patch.reset {
            Some(ResetChange::Open { digest, expires_at }) => (true, Some(digest), Some(expires_at)),
            Some(ResetChange::Clear) => (true, None, None),
            None => (false, None, None),
        };
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   password_hash = COALESCE($3, password_hash),
                   password_reset_token = CASE WHEN $4::boolean THEN $5 ELSE password_reset_token END,
                   password_reset_expires = CASE WHEN $4::boolean THEN $6 ELSE password_reset_expires END,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, password_reset_token,
                      password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.password_hash)
        .bind(touch_reset)
        .bind(digest)
        .bind(expires)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn consume_reset(
        &self,
        digest: &str,
        now: OffsetDateTime,
        new_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET password_hash = $3,
                   password_reset_token = NULL,
                   password_reset_expires = NULL,
                   updated_at = now()
             WHERE password_reset_token = $1
               AND password_reset_expires > $2
            RETURNING id, name, email, password_hash, password_reset_token,
                      password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(digest)
        .bind(now)
        .bind(new_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

/// In-process store used by tests and `AppState::fake`.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn save(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.apply(patch);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn consume_reset(
        &self,
        digest: &str,
        now: OffsetDateTime,
        new_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.accepts_reset(digest, now)) else {
            return Ok(None);
        };
        user.password_hash = new_hash.to_string();
        user.clear_reset();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}
