//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for the expense workflow: money values, fixed
//! timestamps, principals, and a fully wired in-memory organization.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{CompanyId, Currency, Money, UserId};
use domain_expense::memory::{
    InMemoryClaimRepository, InMemoryDirectory, InMemoryRuleRepository, RecordingSink,
    StaticRateConverter,
};
use domain_expense::{Company, Principal, Role, WorkflowPorts};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Above the default large-expense threshold used in the builders
    pub fn usd_large() -> Money {
        Money::new(dec!(2500.00), Currency::USD)
    }

    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    /// Zero decimal places
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The instant fixture clocks start at
    pub fn clock_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    pub fn expense_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 27).unwrap()
    }
}

/// Rates every fixture converter knows, into USD
pub fn fixture_rates() -> StaticRateConverter {
    StaticRateConverter::new()
        .with_rate(Currency::EUR, Currency::USD, dec!(1.10))
        .with_rate(Currency::GBP, Currency::USD, dec!(1.27))
        .with_rate(Currency::JPY, Currency::USD, dec!(0.0067))
}

/// A principal with a generated name and email
pub fn fake_principal(company_id: CompanyId, role: Role, manager_id: Option<UserId>) -> Principal {
    Principal {
        id: UserId::new_v7(),
        company_id,
        role,
        manager_id,
        name: Name().fake(),
        email: SafeEmail().fake(),
    }
}

pub fn fake_company(reporting_currency: Currency) -> Company {
    Company {
        id: CompanyId::new_v7(),
        name: CompanyName().fake(),
        reporting_currency,
    }
}

/// A small company wired to in-memory adapters
///
/// `employee` reports to `manager`; `outsider` is an admin of a different
/// company.
pub struct OrgFixture {
    pub company: Company,
    pub admin: Principal,
    pub manager: Principal,
    pub employee: Principal,
    pub outsider: Principal,
    pub claims: InMemoryClaimRepository,
    pub rules: InMemoryRuleRepository,
    pub directory: Arc<InMemoryDirectory>,
    pub converter: Arc<StaticRateConverter>,
    pub sink: RecordingSink,
}

impl OrgFixture {
    pub async fn new() -> Self {
        Self::with_converter(fixture_rates()).await
    }

    pub async fn with_converter(converter: StaticRateConverter) -> Self {
        let company = fake_company(Currency::USD);
        let admin = fake_principal(company.id, Role::Admin, None);
        let manager = fake_principal(company.id, Role::Manager, None);
        let employee = fake_principal(company.id, Role::Employee, Some(manager.id));
        let outsider = fake_principal(CompanyId::new_v7(), Role::Admin, None);

        let directory = InMemoryDirectory::new();
        directory.add_company(company.clone()).await;
        for principal in [&admin, &manager, &employee, &outsider] {
            directory.add_principal(principal.clone()).await;
        }

        Self {
            company,
            admin,
            manager,
            employee,
            outsider,
            claims: InMemoryClaimRepository::new(),
            rules: InMemoryRuleRepository::new(),
            directory: Arc::new(directory),
            converter: Arc::new(converter),
            sink: RecordingSink::new(),
        }
    }

    /// Adds another member of the fixture company
    pub async fn add_member(&self, role: Role, manager_id: Option<UserId>) -> Principal {
        let principal = fake_principal(self.company.id, role, manager_id);
        self.directory.add_principal(principal.clone()).await;
        principal
    }

    pub fn ports(&self) -> WorkflowPorts {
        WorkflowPorts {
            claims: Arc::new(self.claims.clone()),
            rules: Arc::new(self.rules.clone()),
            directory: self.directory.clone(),
            converter: self.converter.clone(),
            notifier: Arc::new(self.sink.clone()),
        }
    }
}
