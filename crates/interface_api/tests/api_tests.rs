//! HTTP API tests against in-memory adapters

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use core_kernel::UserId;
use domain_expense::adapters::{CountryCatalog, CountryCatalogConfig};
use domain_expense::Principal;
use interface_api::auth::create_token;
use interface_api::config::ApiConfig;
use interface_api::dto::expenses::ExpenseResponse;
use interface_api::dto::rules::RuleResponse;
use interface_api::error::ErrorResponse;
use interface_api::{create_router, AppState};
use test_utils::OrgFixture;

struct Harness {
    server: TestServer,
    org: OrgFixture,
    config: ApiConfig,
}

impl Harness {
    async fn new() -> Self {
        let org = OrgFixture::new().await;
        let config = ApiConfig::default();
        let countries = CountryCatalog::new(CountryCatalogConfig {
            url: "http://127.0.0.1:9/all".to_string(),
            timeout_secs: 2,
            cache_ttl_secs: 60,
        })
        .unwrap();

        let state = AppState::new(org.ports(), countries, config.clone())
            .with_health_check(Arc::new(org.claims.clone()));
        let server = TestServer::new(create_router(state)).unwrap();

        Self { server, org, config }
    }

    fn bearer(&self, user_id: UserId) -> HeaderValue {
        let token = create_token(user_id, &self.config.jwt_secret, 300).unwrap();
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    async fn get(&self, path: &str, as_user: &Principal) -> TestResponse {
        self.server
            .get(path)
            .add_header(header::AUTHORIZATION, self.bearer(as_user.id))
            .await
    }

    async fn post(&self, path: &str, as_user: &Principal, body: Value) -> TestResponse {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, self.bearer(as_user.id))
            .json(&body)
            .await
    }

    async fn create_expense(&self, as_user: &Principal, body: Value) -> ExpenseResponse {
        let response = self.post("/api/v1/expenses", as_user, body).await;
        response.assert_status(StatusCode::CREATED);
        response.json::<ExpenseResponse>()
    }

    async fn submitted_expense(&self) -> ExpenseResponse {
        let created = self
            .create_expense(
                &self.org.employee,
                json!({ "amount": "120.50", "currency": "EUR", "category": "Meals" }),
            )
            .await;
        let response = self
            .post(&format!("/api/v1/expenses/{}/submit", created.id), &self.org.employee, json!({}))
            .await;
        response.assert_status_ok();
        response.json::<ExpenseResponse>()
    }
}

fn error_code(response: &TestResponse) -> String {
    response.json::<ErrorResponse>().error
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_liveness_needs_no_token() {
        let h = Harness::new().await;
        let response = h.server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reports_adapters() {
        let h = Harness::new().await;
        let response = h.server.get("/health/ready").await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["adapters"].as_array().map(Vec::len), Some(1));
    }
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = Harness::new().await;
        let response = h.server.get("/api/v1/expenses").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let h = Harness::new().await;
        let response = h
            .server
            .get("/api/v1/expenses")
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_for_unknown_user_is_unauthorized() {
        let h = Harness::new().await;
        let response = h
            .server
            .get("/api/v1/expenses")
            .add_header(header::AUTHORIZATION, h.bearer(UserId::new()))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

mod expenses {
    use super::*;

    #[tokio::test]
    async fn test_create_returns_draft() {
        let h = Harness::new().await;
        let created = h
            .create_expense(
                &h.org.employee,
                json!({ "amount": "42.00", "currency": "USD", "description": "Taxi" }),
            )
            .await;

        assert_eq!(created.status, "Draft");
        assert_eq!(created.amount, dec!(42.00));
        assert_eq!(created.submitted_by, Uuid::from(h.org.employee.id));
        assert!(created.approvers.is_empty());
        assert_eq!(created.version, 1);
    }

    #[tokio::test]
    async fn test_create_without_amount_is_rejected() {
        let h = Harness::new().await;
        let response = h
            .post("/api/v1/expenses", &h.org.employee, json!({ "currency": "USD" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(&response), "validation_error");
    }

    #[tokio::test]
    async fn test_create_with_oversized_description_is_rejected() {
        let h = Harness::new().await;
        let response = h
            .post(
                "/api/v1/expenses",
                &h.org.employee,
                json!({ "amount": "10", "currency": "USD", "description": "x".repeat(2001) }),
            )
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_submit_routes_to_manager_and_converts() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        assert_eq!(submitted.status, "WaitingApproval");
        assert_eq!(submitted.approvers, vec![Uuid::from(h.org.manager.id)]);
        assert_eq!(submitted.current_approver, Some(Uuid::from(h.org.manager.id)));
        assert_eq!(submitted.reporting_currency.as_deref(), Some("USD"));
        assert_eq!(submitted.reporting_amount, Some(dec!(132.55)));
        assert!(!submitted.conversion_degraded);
    }

    #[tokio::test]
    async fn test_manager_approves_with_comment() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let response = h
            .post(
                &format!("/api/v1/expenses/{}/approve", submitted.id),
                &h.org.manager,
                json!({ "comment": "fine" }),
            )
            .await;
        response.assert_status_ok();

        let approved = response.json::<ExpenseResponse>();
        assert_eq!(approved.status, "Approved");
        assert_eq!(approved.approvals.len(), 1);
        assert_eq!(approved.current_approver, None);
    }

    #[tokio::test]
    async fn test_approve_without_body() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let response = h
            .server
            .post(&format!("/api/v1/expenses/{}/approve", submitted.id))
            .add_header(header::AUTHORIZATION, h.bearer(h.org.manager.id))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<ExpenseResponse>().status, "Approved");
    }

    #[tokio::test]
    async fn test_claimant_cannot_approve_own_claim() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let response = h
            .post(
                &format!("/api/v1/expenses/{}/approve", submitted.id),
                &h.org.employee,
                json!({}),
            )
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(error_code(&response), "forbidden");
    }

    #[tokio::test]
    async fn test_double_submit_is_a_conflict() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let response = h
            .post(&format!("/api/v1/expenses/{}/submit", submitted.id), &h.org.employee, json!({}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(error_code(&response), "invalid_transition");
    }

    #[tokio::test]
    async fn test_reject_then_resubmit() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let rejected = h
            .post(
                &format!("/api/v1/expenses/{}/reject", submitted.id),
                &h.org.manager,
                json!({ "comment": "missing receipt" }),
            )
            .await;
        rejected.assert_status_ok();
        assert_eq!(rejected.json::<ExpenseResponse>().status, "Rejected");

        let update = h
            .server
            .put(&format!("/api/v1/expenses/{}", submitted.id))
            .add_header(header::AUTHORIZATION, h.bearer(h.org.employee.id))
            .json(&json!({ "receipts": ["receipts/2024/0042.pdf"] }))
            .await;
        update.assert_status_ok();

        let resubmitted = h
            .post(&format!("/api/v1/expenses/{}/submit", submitted.id), &h.org.employee, json!({}))
            .await;
        resubmitted.assert_status_ok();
        let body = resubmitted.json::<ExpenseResponse>();
        assert_eq!(body.status, "WaitingApproval");
        assert_eq!(body.receipts, vec!["receipts/2024/0042.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_claim() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let response = h
            .post(&format!("/api/v1/expenses/{}/cancel", submitted.id), &h.org.employee, json!({}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<ExpenseResponse>().status, "Cancelled");
    }

    #[tokio::test]
    async fn test_other_company_cannot_view() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;

        let response = h
            .get(&format!("/api/v1/expenses/{}", submitted.id), &h.org.outsider)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_claim_is_not_found() {
        let h = Harness::new().await;
        let response = h
            .get(&format!("/api/v1/expenses/{}", Uuid::new_v4()), &h.org.employee)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pending_for_me_lists_manager_queue() {
        let h = Harness::new().await;
        let submitted = h.submitted_expense().await;
        h.create_expense(&h.org.employee, json!({ "amount": "5", "currency": "USD" }))
            .await;

        let response = h
            .get("/api/v1/expenses?pending_for_me=true", &h.org.manager)
            .await;
        response.assert_status_ok();
        let queue = response.json::<Vec<ExpenseResponse>>();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, submitted.id);

        let own = h.get("/api/v1/expenses?status=Draft", &h.org.employee).await;
        own.assert_status_ok();
        assert_eq!(own.json::<Vec<ExpenseResponse>>().len(), 1);
    }
}

mod rules {
    use super::*;

    async fn create_rule(h: &Harness, body: Value) -> TestResponse {
        h.post("/api/v1/rules", &h.org.admin, body).await
    }

    #[tokio::test]
    async fn test_admin_creates_and_lists_rules() {
        let h = Harness::new().await;
        let response = create_rule(
            &h,
            json!({
                "user_id": Uuid::from(h.org.employee.id),
                "name": "Travel over 500",
                "amount_threshold": "500",
                "approvers": [Uuid::from(h.org.admin.id)],
            }),
        )
        .await;
        response.assert_status(StatusCode::CREATED);
        let rule = response.json::<RuleResponse>();
        assert!(rule.is_active);
        assert!(rule.is_manager_approver);
        assert_eq!(rule.amount_threshold, dec!(500));

        let listed = h.get("/api/v1/rules", &h.org.admin).await;
        listed.assert_status_ok();
        assert_eq!(listed.json::<Vec<RuleResponse>>().len(), 1);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_manage_rules() {
        let h = Harness::new().await;
        let response = h
            .post(
                "/api/v1/rules",
                &h.org.manager,
                json!({ "user_id": Uuid::from(h.org.employee.id), "name": "Sneaky" }),
            )
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let listed = h.get("/api/v1/rules", &h.org.employee).await;
        listed.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_percentage_over_hundred_is_rejected() {
        let h = Harness::new().await;
        let response = create_rule(
            &h,
            json!({
                "user_id": Uuid::from(h.org.employee.id),
                "name": "Parallel",
                "approval_sequence": false,
                "min_approval_percentage": 150,
            }),
        )
        .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rule_routes_next_submission() {
        let h = Harness::new().await;
        create_rule(
            &h,
            json!({
                "user_id": Uuid::from(h.org.employee.id),
                "name": "Admin sign-off",
                "approvers": [Uuid::from(h.org.admin.id)],
            }),
        )
        .await
        .assert_status(StatusCode::CREATED);

        let submitted = h.submitted_expense().await;
        assert_eq!(
            submitted.approvers,
            vec![Uuid::from(h.org.manager.id), Uuid::from(h.org.admin.id)]
        );
        assert!(submitted.rule_id.is_some());
    }

    #[tokio::test]
    async fn test_delete_deactivates() {
        let h = Harness::new().await;
        let created = create_rule(
            &h,
            json!({ "user_id": Uuid::from(h.org.employee.id), "name": "Temporary" }),
        )
        .await
        .json::<RuleResponse>();

        let response = h
            .server
            .delete(&format!("/api/v1/rules/{}", created.id))
            .add_header(header::AUTHORIZATION, h.bearer(h.org.admin.id))
            .await;
        response.assert_status_ok();
        assert!(!response.json::<RuleResponse>().is_active);
    }
}

mod reference {
    use super::*;

    #[tokio::test]
    async fn test_countries_fall_back_when_upstream_is_down() {
        let h = Harness::new().await;
        let response = h.get("/api/v1/reference/countries", &h.org.employee).await;
        response.assert_status_ok();

        let countries = response.json::<Vec<Value>>();
        assert_eq!(countries.len(), 15);
        assert!(countries.iter().all(|c| c["currency"].is_string()));
    }
}
