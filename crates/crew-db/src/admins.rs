//! Admin repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crew_core::{new_v7, Admin, AdminRepository, Error, RegisterAdminRequest, Result};

use crate::workers::map_insert_error;

const ADMIN_COLUMNS: &str = "id, name, surname, email, password_hash, created_at";

/// PostgreSQL implementation of AdminRepository.
#[derive(Clone)]
pub struct PgAdminRepository {
    pool: Pool<Postgres>,
}

impl PgAdminRepository {
    /// Create a new PgAdminRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_admin_row(row: sqlx::postgres::PgRow) -> Admin {
        Admin {
            id: row.get("id"),
            name: row.get("name"),
            surname: row.get("surname"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl AdminRepository for PgAdminRepository {
    async fn insert(&self, req: &RegisterAdminRequest, password_hash: &str) -> Result<Admin> {
        let admin_id = new_v7();
        let now = Utc::now();

        let row = sqlx::query(&format!(
            "INSERT INTO admin (id, name, surname, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(admin_id)
        .bind(&req.name)
        .bind(&req.surname)
        .bind(&req.email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "email"))?;

        Ok(Self::parse_admin_row(row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Admin>> {
        let row = sqlx::query(&format!("SELECT {ADMIN_COLUMNS} FROM admin WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_admin_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let row = sqlx::query(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_admin_row))
    }
}
