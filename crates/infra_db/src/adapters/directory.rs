//! PostgreSQL organization directory adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{CompanyId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId};
use domain_expense::{Company, OrganizationDirectory, Principal, Role};

use crate::adapters::claims::{parse_currency, ping};
use crate::error::DatabaseError;
use crate::repositories::directory::{CompanyRow, DirectoryRepository, UserRow};

/// Reads principals and companies from the `users` and `companies` tables
#[derive(Debug, Clone)]
pub struct PostgresDirectoryAdapter {
    repository: DirectoryRepository,
    pool: PgPool,
}

impl PostgresDirectoryAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DirectoryRepository::new(pool.clone()),
            pool,
        }
    }

    /// Seeds a company; used by fixtures and local setup
    pub async fn add_company(&self, company: &Company) -> Result<(), PortError> {
        self.repository
            .insert_company(&CompanyRow {
                company_id: company.id.into(),
                name: company.name.clone(),
                reporting_currency: company.reporting_currency.code().to_string(),
            })
            .await?;
        Ok(())
    }

    /// Seeds a user; used by fixtures and local setup
    pub async fn add_principal(&self, principal: &Principal) -> Result<(), PortError> {
        self.repository
            .insert_user(&UserRow {
                user_id: principal.id.into(),
                company_id: principal.company_id.into(),
                role: principal.role.as_str().to_string(),
                manager_id: principal.manager_id.map(Into::into),
                name: principal.name.clone(),
                email: principal.email.clone(),
            })
            .await?;
        Ok(())
    }
}

impl DomainPort for PostgresDirectoryAdapter {}

#[async_trait]
impl HealthCheckable for PostgresDirectoryAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-directory-adapter").await
    }
}

#[async_trait]
impl OrganizationDirectory for PostgresDirectoryAdapter {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_principal(&self, id: UserId) -> Result<Principal, PortError> {
        let row = self.repository.get_user(id.into()).await?;
        Ok(row_to_principal(row)?)
    }

    #[instrument(skip(self), fields(company_id = %id))]
    async fn get_company(&self, id: CompanyId) -> Result<Company, PortError> {
        let row = self.repository.get_company(id.into()).await?;
        Ok(Company {
            id: CompanyId::from(row.company_id),
            name: row.name,
            reporting_currency: parse_currency(&row.reporting_currency)?,
        })
    }

    async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, PortError> {
        let ids = self.repository.reports_of(manager_id.into()).await?;
        Ok(ids.into_iter().map(UserId::from).collect())
    }
}

fn row_to_principal(row: UserRow) -> Result<Principal, DatabaseError> {
    let role: Role = row.role.parse().map_err(DatabaseError::serialization)?;
    Ok(Principal {
        id: UserId::from(row.user_id),
        company_id: CompanyId::from(row.company_id),
        role,
        manager_id: row.manager_id.map(UserId::from),
        name: row.name,
        email: row.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_row(role: &str) -> UserRow {
        UserRow {
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role: role.to_string(),
            manager_id: Some(Uuid::new_v4()),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_user_row_maps_to_principal() {
        let row = user_row("Manager");
        let manager = row.manager_id;
        let principal = row_to_principal(row).unwrap();
        assert_eq!(principal.role, Role::Manager);
        assert_eq!(principal.manager_id.map(Uuid::from), manager);
    }

    #[test]
    fn test_unknown_role_fails_mapping() {
        assert!(row_to_principal(user_row("Auditor")).is_err());
    }
}
