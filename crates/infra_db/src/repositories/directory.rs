//! Company and user repository
//!
//! The workflow only reads these tables. The insert methods exist for
//! seeding and tests; user management itself lives outside this system.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserRow, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, company_id, role, manager_id, name, email
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", user_id))
    }

    pub async fn get_company(&self, company_id: Uuid) -> Result<CompanyRow, DatabaseError> {
        sqlx::query_as::<_, CompanyRow>(
            "SELECT company_id, name, reporting_currency FROM companies WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Company", company_id))
    }

    /// Users whose `manager_id` is the given manager
    pub async fn reports_of(&self, manager_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM users WHERE manager_id = $1 ORDER BY user_id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn insert_company(&self, company: &CompanyRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO companies (company_id, name, reporting_currency) VALUES ($1, $2, $3)",
        )
        .bind(company.company_id)
        .bind(&company.name)
        .bind(&company.reporting_currency)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &UserRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, company_id, role, manager_id, name, email)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.user_id)
        .bind(user.company_id)
        .bind(&user.role)
        .bind(user.manager_id)
        .bind(&user.name)
        .bind(&user.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: String,
    pub manager_id: Option<Uuid>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    pub company_id: Uuid,
    pub name: String,
    pub reporting_currency: String,
}
