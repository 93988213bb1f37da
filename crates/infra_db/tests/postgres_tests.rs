//! Postgres adapter integration tests
//!
//! Each test starts its own container; run with `cargo test -- --ignored`
//! on a machine with Docker.

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{ClaimId, Currency, PortError, UserId};
use domain_expense::memory::{RecordingSink, StaticRateConverter};
use domain_expense::ports::{ClaimQuery, ClaimRepository, OrganizationDirectory, RuleRepository};
use domain_expense::{ClaimStatus, ExpenseClaim, ExpenseWorkflow, RuleAdministration, Role, WorkflowPorts};
use infra_db::{PostgresClaimAdapter, PostgresDirectoryAdapter, PostgresRuleAdapter};
use sqlx::PgPool;
use test_utils::{
    assert_pending_on, assert_status, db_test, fake_company, fake_principal, ClaimRequestBuilder,
    RuleBuilder,
};

struct PgOrg {
    claims: Arc<PostgresClaimAdapter>,
    rules: Arc<PostgresRuleAdapter>,
    directory: Arc<PostgresDirectoryAdapter>,
    admin: domain_expense::Principal,
    manager: domain_expense::Principal,
    employee: domain_expense::Principal,
}

impl PgOrg {
    async fn seed(pool: &PgPool) -> Self {
        let directory = PostgresDirectoryAdapter::new(pool.clone());
        let company = fake_company(Currency::USD);
        directory.add_company(&company).await.unwrap();

        let admin = fake_principal(company.id, Role::Admin, None);
        let manager = fake_principal(company.id, Role::Manager, None);
        let employee = fake_principal(company.id, Role::Employee, Some(manager.id));
        for principal in [&admin, &manager, &employee] {
            directory.add_principal(principal).await.unwrap();
        }

        Self {
            claims: Arc::new(PostgresClaimAdapter::new(pool.clone())),
            rules: Arc::new(PostgresRuleAdapter::new(pool.clone())),
            directory: Arc::new(directory),
            admin,
            manager,
            employee,
        }
    }

    fn workflow(&self) -> ExpenseWorkflow {
        ExpenseWorkflow::new(WorkflowPorts {
            claims: self.claims.clone(),
            rules: self.rules.clone(),
            directory: self.directory.clone(),
            converter: Arc::new(
                StaticRateConverter::new().with_rate(Currency::EUR, Currency::USD, dec!(1.10)),
            ),
            notifier: Arc::new(RecordingSink::new()),
        })
    }

    fn draft(&self) -> ExpenseClaim {
        ExpenseClaim::draft(
            self.employee.company_id,
            self.employee.id,
            ClaimRequestBuilder::new().build(),
            Utc::now(),
        )
        .unwrap()
    }
}

db_test!(test_directory_resolves_principals_and_reports, |pool| {
    let org = PgOrg::seed(&pool).await;

    let employee = org.directory.get_principal(org.employee.id).await.unwrap();
    assert_eq!(employee.role, Role::Employee);
    assert_eq!(employee.manager_id, Some(org.manager.id));

    let reports = org.directory.direct_reports(org.manager.id).await.unwrap();
    assert_eq!(reports, vec![org.employee.id]);

    let missing = org.directory.get_principal(UserId::new()).await;
    assert!(matches!(missing, Err(PortError::NotFound { .. })));
});

db_test!(test_claim_insert_and_load, |pool| {
    let org = PgOrg::seed(&pool).await;
    let stored = org.claims.insert(&org.draft()).await.unwrap();
    assert_eq!(stored.version, 1);

    let loaded = org.claims.load(stored.id).await.unwrap();
    assert_eq!(loaded.id, stored.id);
    assert_eq!(loaded.amount, stored.amount);
    assert_status(&loaded, ClaimStatus::Draft);

    let missing = org.claims.load(ClaimId::new()).await;
    assert!(matches!(missing, Err(PortError::NotFound { .. })));
});

db_test!(test_stale_save_is_a_version_conflict, |pool| {
    let org = PgOrg::seed(&pool).await;
    let stored = org.claims.insert(&org.draft()).await.unwrap();

    let mut first = stored.clone();
    first.description = Some("first writer".to_string());
    let saved = org.claims.save(&first, stored.version).await.unwrap();
    assert_eq!(saved.version, 2);

    let mut second = stored.clone();
    second.description = Some("second writer".to_string());
    let result = org.claims.save(&second, stored.version).await;
    assert!(matches!(result, Err(PortError::VersionConflict { .. })));

    let loaded = org.claims.load(stored.id).await.unwrap();
    assert_eq!(loaded.description.as_deref(), Some("first writer"));
});

db_test!(test_save_of_unknown_claim_is_not_found, |pool| {
    let org = PgOrg::seed(&pool).await;
    let result = org.claims.save(&org.draft(), 1).await;
    assert!(matches!(result, Err(PortError::NotFound { .. })));
});

db_test!(test_rule_lookup_prefers_highest_threshold, |pool| {
    let org = PgOrg::seed(&pool).await;
    let admin = RuleAdministration::new(org.rules.clone(), org.directory.clone());

    admin
        .create_rule(&org.admin, RuleBuilder::for_user(org.employee.id).name("Base").build())
        .await
        .unwrap();
    let large = admin
        .create_rule(
            &org.admin,
            RuleBuilder::for_user(org.employee.id)
                .name("Large")
                .threshold(dec!(1000))
                .build(),
        )
        .await
        .unwrap();

    let applicable = org
        .rules
        .find_applicable_rules(org.employee.company_id, org.employee.id, dec!(5000))
        .await
        .unwrap();
    assert_eq!(applicable.first().map(|r| r.id), Some(large.id));

    let small = org
        .rules
        .find_applicable_rules(org.employee.company_id, org.employee.id, dec!(50))
        .await
        .unwrap();
    assert_eq!(small.len(), 1);
    assert_eq!(small[0].name, "Base");

    admin.deactivate_rule(&org.admin, large.id).await.unwrap();
    let listed = org.rules.list(org.employee.company_id).await.unwrap();
    assert_eq!(listed.len(), 1);
});

db_test!(test_workflow_round_trip_through_postgres, |pool| {
    let org = PgOrg::seed(&pool).await;
    let workflow = org.workflow();

    let draft = workflow
        .create_draft(
            &org.employee,
            ClaimRequestBuilder::new().amount(dec!(200)).currency(Currency::EUR).build(),
        )
        .await
        .unwrap();
    let submitted = workflow.submit(draft.id, &org.employee).await.unwrap();
    assert_status(&submitted, ClaimStatus::WaitingApproval);
    assert_pending_on(&submitted, &[org.manager.id]);
    assert_eq!(
        submitted.reporting_amount().map(|m| m.amount()),
        Some(dec!(220.00))
    );

    let approved = workflow
        .approve(draft.id, &org.manager, Some("ok".to_string()))
        .await
        .unwrap();
    assert_status(&approved, ClaimStatus::Approved);

    let reloaded = org.claims.load(draft.id).await.unwrap();
    assert_eq!(reloaded.approvals.len(), 1);
    assert!(reloaded.approvals[0].approved);
    assert_eq!(reloaded.approvals[0].comment.as_deref(), Some("ok"));

    let found = org
        .claims
        .find(&ClaimQuery::company(org.employee.company_id).with_status(Some(ClaimStatus::Approved)))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
});
