//! SQLite-backed credential store.
//!
//! The store is the only component that opens the users database. It holds
//! a single connection, so every read and write is serialized: concurrent
//! `add_user` calls for one name cannot both succeed and readers never see
//! a half-written row. Password hashing runs on the blocking pool before a
//! connection is acquired.

use chrono::{DateTime, Utc};
use inertia_access::StoreError;
use inertia_access::password;
use inertia_access::user::{User, validate_password, validate_username};
use rootcause::prelude::Report;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    username: String,
    password_hash: String,
    is_admin: bool,
    login_attempts: i64,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User::with_all_fields(
            self.username,
            self.password_hash,
            self.is_admin,
            u32::try_from(self.login_attempts).unwrap_or(u32::MAX),
            self.created_at,
        )
    }
}

/// Why a credential check failed. Internal only; callers see one generic
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownUser,
    WrongPassword,
    LockedOut,
}

impl RejectReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownUser => "unknown_user",
            Self::WrongPassword => "wrong_password",
            Self::LockedOut => "locked_out",
        }
    }

    /// Returns true for rejections an operator should see by default.
    ///
    /// Mistyped passwords and unknown names are routine; a lockout means
    /// someone kept guessing.
    #[must_use]
    pub fn is_alarming(&self) -> bool {
        matches!(self, Self::LockedOut)
    }
}

/// Outcome of checking a username and password.
#[derive(Debug)]
pub enum CredentialCheck {
    Accepted(User),
    Rejected(RejectReason),
}

/// Durable mapping of username to credential record.
#[derive(Debug)]
pub struct CredentialStore {
    pool: SqlitePool,
    path: PathBuf,
    max_login_attempts: u32,
}

impl CredentialStore {
    /// Opens (or creates) the users database at `path` and applies migrations.
    ///
    /// `max_login_attempts` consecutive failures lock an account; zero
    /// disables lockout.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StorageFailure` if the file cannot be opened or
    /// migrated.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path, max_login_attempts: u32) -> Result<Self, Report<StoreError>> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        // SQLite allows one writer; a single connection serializes all access.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_failure)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(storage_failure)?;

        // The first unknown-user check must not pay for building the dummy hash.
        tokio::task::spawn_blocking(password::prepare_burn)
            .await
            .map_err(storage_failure)?;

        info!("Opened credential store");

        Ok(Self {
            pool,
            path: path.to_path_buf(),
            max_login_attempts,
        })
    }

    /// Adds a user. The password is hashed before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unusable username or password,
    /// `DuplicateUser` if the name is taken, or `StorageFailure`.
    #[instrument(skip(self, password))]
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<(), Report<StoreError>> {
        validate_username(username)?;
        validate_password(password)?;

        let password_hash = hash_password(password.to_string()).await?;
        let user = User::new(username.to_string(), password_hash, is_admin);

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, is_admin, login_attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user.username())
        .bind(user.password_hash())
        .bind(user.is_admin())
        .bind(i64::from(user.login_attempts()))
        .bind(user.created_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("User added");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateUser {
                    username: username.to_string(),
                }
                .into())
            }
            Err(e) => Err(storage_failure(e).into()),
        }
    }

    /// Removes a user.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` if no such user exists, or `StorageFailure`.
    #[instrument(skip(self))]
    pub async fn remove_user(&self, username: &str) -> Result<(), Report<StoreError>> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(storage_failure)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownUser {
                username: username.to_string(),
            }
            .into());
        }

        info!("User removed");
        Ok(())
    }

    /// Fetches a user record.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` if no such user exists, or `StorageFailure`.
    pub async fn get_user(&self, username: &str) -> Result<User, Report<StoreError>> {
        self.find_user(username)
            .await?
            .ok_or_else(|| {
                StoreError::UnknownUser {
                    username: username.to_string(),
                }
                .into()
            })
    }

    /// Lists all usernames in ascending order. Hashes are never included.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure`.
    pub async fn list_users(&self) -> Result<Vec<String>, Report<StoreError>> {
        let usernames: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT username
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failure)?;

        Ok(usernames)
    }

    /// Returns the number of stored users.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure`.
    pub async fn user_count(&self) -> Result<u64, Report<StoreError>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_failure)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Irreversibly deletes every user. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure`.
    #[instrument(skip(self))]
    pub async fn reset_all(&self) -> Result<u64, Report<StoreError>> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(storage_failure)?;

        let removed = result.rows_affected();
        warn!(removed, "All users removed");
        Ok(removed)
    }

    /// Returns true if `candidate` is the user's password and the account is
    /// not locked.
    ///
    /// Counts as a login attempt for lockout purposes.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure`; an unknown user is `Ok(false)`.
    pub async fn verify_password(
        &self,
        username: &str,
        candidate: &str,
    ) -> Result<bool, Report<StoreError>> {
        let check = self.check_credentials(username, candidate).await?;
        Ok(matches!(check, CredentialCheck::Accepted(_)))
    }

    /// Checks credentials and records the attempt.
    ///
    /// Every failure path performs one password verification and one
    /// committed write, so an unknown user takes as long as a wrong
    /// password.
    ///
    /// The attempt is counted before the password is checked. Each
    /// concurrent call therefore sees a distinct count, and at most
    /// `max_login_attempts` guesses are ever evaluated.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure`.
    #[instrument(skip(self, candidate))]
    pub async fn check_credentials(
        &self,
        username: &str,
        candidate: &str,
    ) -> Result<CredentialCheck, Report<StoreError>> {
        let Some(user) = self.claim_attempt(username).await? else {
            self.record_unknown_attempt().await?;
            burn_password(candidate.to_string()).await?;
            debug!("Credential check for unknown user");
            return Ok(CredentialCheck::Rejected(RejectReason::UnknownUser));
        };

        let matches =
            verify_password(candidate.to_string(), user.password_hash().to_string()).await?;

        if user.is_locked_out(self.max_login_attempts) {
            warn!(attempts = user.login_attempts(), "Login attempt on locked account");
            return Ok(CredentialCheck::Rejected(RejectReason::LockedOut));
        }

        if !matches {
            return Ok(CredentialCheck::Rejected(RejectReason::WrongPassword));
        }

        self.clear_failed_attempts(username).await?;
        Ok(CredentialCheck::Accepted(User::with_all_fields(
            user.username().to_string(),
            user.password_hash().to_string(),
            user.is_admin(),
            0,
            user.created_at(),
        )))
    }

    /// Flushes the write-ahead log into the database file and closes the
    /// connection.
    ///
    /// Call once, after in-flight requests have drained. The connection is
    /// closed even if the checkpoint fails.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if the checkpoint fails.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn close(&self) -> Result<(), Report<StoreError>> {
        let checkpoint = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await;
        self.pool.close().await;

        checkpoint.map_err(storage_failure)?;
        info!("Closed credential store");
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, Report<StoreError>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT username, password_hash, is_admin, login_attempts, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failure)?;

        Ok(row.map(UserRow::into_user))
    }

    /// Increments the user's attempt counter and returns the record with
    /// the count as it was before this attempt. `None` for unknown users.
    async fn claim_attempt(&self, username: &str) -> Result<Option<User>, Report<StoreError>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users
            SET login_attempts = login_attempts + 1
            WHERE username = ?1
            RETURNING username, password_hash, is_admin,
                      login_attempts - 1 AS login_attempts, created_at
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failure)?;

        Ok(row.map(UserRow::into_user))
    }

    async fn record_unknown_attempt(&self) -> Result<(), Report<StoreError>> {
        sqlx::query(
            r#"
            UPDATE login_stats
            SET unknown_user_attempts = unknown_user_attempts + 1
            WHERE id = 1
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_failure)?;

        Ok(())
    }

    async fn clear_failed_attempts(&self, username: &str) -> Result<(), Report<StoreError>> {
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = 0
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(storage_failure)?;

        Ok(())
    }
}

fn storage_failure(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageFailure {
        details: e.to_string(),
    }
}

async fn hash_password(password: String) -> Result<String, Report<StoreError>> {
    let hashed = tokio::task::spawn_blocking(move || password::hash(&password))
        .await
        .map_err(storage_failure)?;
    hashed.map_err(|report| storage_failure(report.current_context()).into())
}

async fn verify_password(candidate: String, stored: String) -> Result<bool, Report<StoreError>> {
    let matches = tokio::task::spawn_blocking(move || password::verify(&candidate, &stored))
        .await
        .map_err(storage_failure)?;
    Ok(matches)
}

async fn burn_password(candidate: String) -> Result<(), Report<StoreError>> {
    tokio::task::spawn_blocking(move || password::burn(&candidate))
        .await
        .map_err(storage_failure)?;
    Ok(())
}
