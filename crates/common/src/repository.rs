//! User persistence on top of [`Database`]

use crate::{Database, Error, Result, User};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const USER_COLUMNS: &str = "id, email, roles, password";

/// Repository for [`User`] rows
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

/// Raw database row before parsing
struct RawUser {
    id: i64,
    email: String,
    roles: String,
    password: String,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            roles: row.get(2)?,
            password: row.get(3)?,
        })
    }

    fn parse(self) -> Result<User> {
        let roles: Vec<String> = serde_json::from_str(&self.roles)?;
        Ok(User::from_stored(self.id, self.email, roles, self.password))
    }
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new user and assign its generated id
    pub fn insert(&self, user: &mut User) -> Result<i64> {
        let conn = self.db.connection();
        let conn = conn.lock();

        let result = conn.execute(
            "INSERT INTO users (email, roles, password) VALUES (?1, ?2, ?3)",
            params![
                user.email(),
                serde_json::to_string(user.roles())?,
                user.password(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::AlreadyExists {
                    kind: "user".to_string(),
                    id: user.email().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        user.assign_id(id);

        debug!("Inserted user {} with id {}", user.email(), id);
        Ok(id)
    }

    /// Persist changes to an already stored user
    pub fn update(&self, user: &User) -> Result<()> {
        let id = user.id().ok_or_else(|| Error::NotFound {
            kind: "user".to_string(),
            id: user.email().to_string(),
        })?;

        let conn = self.db.connection();
        let conn = conn.lock();

        let rows = conn
            .execute(
                "UPDATE users SET email = ?1, roles = ?2, password = ?3 WHERE id = ?4",
                params![
                    user.email(),
                    serde_json::to_string(user.roles())?,
                    user.password(),
                    id,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists {
                        kind: "user".to_string(),
                        id: user.email().to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

        if rows == 0 {
            return Err(Error::NotFound {
                kind: "user".to_string(),
                id: id.to_string(),
            });
        }

        debug!("Updated user with id {}", id);
        Ok(())
    }

    /// Get a user by id
    pub fn get(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.connection();
        let conn = conn.lock();

        let row = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                RawUser::from_row,
            )
            .optional()?;

        row.map(RawUser::parse).transpose()
    }

    /// Get a user by login email
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.connection();
        let conn = conn.lock();

        let row = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                RawUser::from_row,
            )
            .optional()?;

        row.map(RawUser::parse).transpose()
    }

    /// List all users ordered by id
    pub fn list(&self) -> Result<Vec<User>> {
        let conn = self.db.connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
        let rows = stmt.query_map([], RawUser::from_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.parse()?);
        }

        Ok(users)
    }

    /// Delete a user
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.db.connection();
        let conn = conn.lock();
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;

        if rows > 0 {
            debug!("Deleted user with id {}", id);
        }

        Ok(rows > 0)
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
