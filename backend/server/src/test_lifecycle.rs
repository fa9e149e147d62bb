//! End-to-end lifecycle tests: services against an in-memory ledger, and the
//! HTTP router driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use crowdfund_core::{invariants, DonationStatus, FundAction, FundStatus, PayoutStatus};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::api::{self, AppState};
use crate::auth::{issue_token, Role};
use crate::db::users::User;
use crate::db::{categories, donations, funds, now, payouts, users};
use crate::services::fundraisers::{self, FundDraft};
use crate::services::settlement::{self, DonationRequest};

fn draft(category: &str) -> FundDraft {
    FundDraft {
        category_uuid: category.to_string(),
        title: "Flood relief".into(),
        purpose: "Rebuild homes".into(),
        amount: dec!(10000),
        deadline: now() + 30 * 86_400,
        story: "After the river burst its banks...".into(),
        images: vec![],
        video: None,
    }
}

async fn count(state: &AppState, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&state.pool)
        .await
        .unwrap()
}

// ─────────────────────────────────────────────────────────
// Service-level scenario
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fund_donate_pause_resume_scenario() {
    let state = AppState::for_tests().await;
    let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, Some("card_tok_owner")).await;
    let cat = categories::fixtures::category(&state.pool, "Disaster relief", false).await;

    let fund = fundraisers::create(&state, &owner, draft(&cat.c_uuid)).await.unwrap();
    assert_eq!(fund.status, FundStatus::Pending);

    let fund = fundraisers::moderate(&state, &fund.f_uuid, FundAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(fund.status, FundStatus::Active);

    let settled = settlement::start_donation(
        &state,
        None,
        DonationRequest {
            fund_uuid: fund.f_uuid.clone(),
            amount: dec!(100),
            is_anonymous: false,
            payment_intent_id: None,
        },
    )
    .await
    .unwrap();

    let donation = donations::find(&state.pool, &settled.donation.d_uuid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(donation.amount, dec!(100));
    assert_eq!(donation.platform_fee, dec!(2.8));
    assert_eq!(donation.amount_to_owner, dec!(97.2));
    assert_eq!(donation.status, DonationStatus::Success);
    assert_eq!(donation.d_fk_f_uuid, fund.f_uuid);

    let payout = payouts::find_by_donation(&state.pool, &donation.d_uuid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payout.amount, dec!(97.2));
    assert_eq!(payout.fee, dec!(2.8));
    assert_eq!(payout.status, PayoutStatus::Sent);
    assert_eq!(payout.p_fk_uc_uuid, owner.u_uuid);
    invariants::assert_payout_matches_donation(
        donation.amount_to_owner,
        donation.platform_fee,
        payout.amount,
        payout.fee,
    );
    assert_eq!(count(&state, "payouts").await, 1);

    let paused = fundraisers::moderate(
        &state,
        &fund.f_uuid,
        FundAction::Pause,
        Some("suspicious".into()),
    )
    .await
    .unwrap();
    assert_eq!(paused.status, FundStatus::Paused);
    assert_eq!(paused.pause_reason.as_deref(), Some("suspicious"));

    fundraisers::moderate(&state, &fund.f_uuid, FundAction::Resume, None)
        .await
        .unwrap();
    let resumed = funds::find(&state.pool, &fund.f_uuid).await.unwrap().unwrap();
    assert_eq!(resumed.status, FundStatus::Active);
    invariants::assert_resumed_without_reason(resumed.status, resumed.pause_reason.as_deref());
}

#[tokio::test]
async fn test_approve_is_unconditional_when_permissive() {
    let state = AppState::for_tests().await;
    let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
    let cat = categories::fixtures::category(&state.pool, "Health", false).await;

    for prior in [FundStatus::Rejected, FundStatus::Closed, FundStatus::Paused] {
        let fund = funds::fixtures::fund(&state.pool, &owner.u_uuid, &cat.c_uuid, prior).await;
        let approved = fundraisers::moderate(&state, &fund.f_uuid, FundAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, FundStatus::Active, "from {prior}");
    }
}

// ─────────────────────────────────────────────────────────
// HTTP layer
// ─────────────────────────────────────────────────────────

struct Harness {
    app: Router,
    state: Arc<AppState>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_state(AppState::for_tests().await)
    }

    fn with_state(state: AppState) -> Self {
        let state = Arc::new(state);
        Harness {
            app: api::router(state.clone()),
            state,
        }
    }

    async fn user(&self, role: Role, card: Option<&str>) -> (User, String) {
        let user = users::fixtures::user(&self.state.pool, role, dec!(0), card).await;
        let token = issue_token(&user, &self.state.config.jwt_secret, 600).unwrap();
        (user, token)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(path, token, body.to_string(), &[]).await
    }

    async fn send(
        &self,
        path: &str,
        token: Option<&str>,
        body: String,
        headers: &[(&str, String)],
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }
        let resp = self
            .app
            .clone()
            .oneshot(req.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

#[tokio::test]
async fn test_http_health() {
    let h = Harness::new().await;
    let resp = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_http_donation_without_payout_card() {
    let h = Harness::new().await;
    let (owner, _) = h.user(Role::User, None).await;
    let cat = categories::fixtures::category(&h.state.pool, "Medical", false).await;
    let fund = funds::fixtures::fund(&h.state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Active).await;

    let (status, body) = h
        .post(
            "/private/donation-start",
            None,
            json!({ "fund_uuid": fund.f_uuid, "amount": 25, "is_anonymous": true }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);
    assert_eq!(body["code"], "DON-E1003");
    assert_eq!(body["message"], "Requester payout card not found. Donation stopped.");
    assert_eq!(count(&h.state, "donations").await, 0);
    assert_eq!(count(&h.state, "payouts").await, 0);
}

#[tokio::test]
async fn test_http_admin_flow() {
    let h = Harness::new().await;
    let (admin, admin_token) = h.user(Role::Admin, None).await;
    let (_, owner_token) = h.user(Role::User, Some("card_tok")).await;
    let (_, donor_token) = h.user(Role::User, None).await;
    let cat = categories::fixtures::category(&h.state.pool, "Community", false).await;

    let (status, body) = h
        .post(
            "/private/fundraiser-create",
            Some(&owner_token),
            json!({
                "category_uuid": cat.c_uuid,
                "title": "Library books",
                "purpose": "Stock the village library",
                "amount": 1500,
                "deadline": now() + 86_400,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payload"]["status"], "PENDING");
    let fund_uuid = body["payload"]["f_uuid"].as_str().unwrap().to_string();

    let (status, body) = h
        .post(
            "/admin/private/fundraiser-approve",
            Some(&admin_token),
            json!({ "fund_uuid": fund_uuid }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payload"]["status"], "ACTIVE");

    let (status, body) = h
        .post(
            "/private/donation-start",
            Some(&donor_token),
            json!({ "fund_uuid": fund_uuid, "amount": 100, "is_anonymous": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], true);
    assert_eq!(body["payload"]["donation"]["platform_fee"].as_f64(), Some(2.8));
    assert_eq!(body["payload"]["payout"]["amount"].as_f64(), Some(97.2));
    assert_eq!(body["payload"]["payout"]["status"], "SENT");
    let p_uuid = body["payload"]["payout"]["p_uuid"].as_str().unwrap().to_string();

    let (status, body) = h
        .post(
            "/admin/private/updatePayoutStatus",
            Some(&admin_token),
            json!({ "p_uuid": p_uuid, "status": "REFUNDED" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAY-E1002");

    let (status, body) = h
        .post(
            "/admin/private/updatePayoutStatus",
            Some(&admin_token),
            json!({ "p_uuid": p_uuid, "status": "PENDING" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payload"]["status"], "PENDING");

    let (status, body) = h
        .post(
            "/admin/private/rejectPayout",
            Some(&admin_token),
            json!({ "p_uuid": p_uuid, "reason": "Card closed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payload"]["status"], "FAILED");
    assert_eq!(body["payload"]["meta"]["reason"], "Card closed");

    let (status, body) = h
        .post(
            "/public/fundraiser-detail",
            None,
            json!({ "fund_uuid": fund_uuid }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"]["raised"].as_f64(), Some(100.0));

    let (status, body) = h
        .post("/admin/private/donation-list", Some(&admin_token), json!({ "limit": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["limit"], 5);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert!(!admin.u_uuid.is_empty());
}

#[tokio::test]
async fn test_http_permissions() {
    let h = Harness::new().await;
    let (_, user_token) = h.user(Role::User, None).await;
    let (_, finance_token) = h.user(Role::Finance, None).await;

    let (status, body) = h
        .post("/admin/private/payout-list", None, json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], false);

    let (status, _) = h
        .post("/admin/private/payout-list", Some(&user_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h
        .post("/admin/private/payout-list", Some(&finance_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .post(
            "/admin/private/fundraiser-approve",
            Some(&finance_token),
            json!({ "fund_uuid": "whatever" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Missing permission: fundraisers");

    let (status, _) = h
        .post("/private/profile", Some("not-a-jwt"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_http_withdrawal_reject_refunds() {
    let h = Harness::new().await;
    let (admin, admin_token) = h.user(Role::Finance, None).await;
    let owner = users::fixtures::user(&h.state.pool, Role::User, dec!(250), None).await;
    let owner_token = issue_token(&owner, &h.state.config.jwt_secret, 600).unwrap();

    let (status, body) = h
        .post(
            "/private/withdrawal-request",
            Some(&owner_token),
            json!({
                "amount": 300,
                "account_holder_name": "Lena",
                "account_number": "12345678",
                "ifsc_code": "HDFC0000001",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "WDR-E1004");

    let (status, body) = h
        .post(
            "/private/withdrawal-request",
            Some(&owner_token),
            json!({
                "amount": 100,
                "account_holder_name": "Lena",
                "account_number": "12345678",
                "ifsc_code": "HDFC0000001",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let w_uuid = body["payload"]["w_uuid"].as_str().unwrap().to_string();

    let (_, body) = h.post("/private/profile", Some(&owner_token), json!({})).await;
    assert_eq!(body["payload"]["balance"].as_f64(), Some(150.0));

    let (status, body) = h
        .post(
            "/admin/private/rejectWithdrawal",
            Some(&admin_token),
            json!({ "w_uuid": w_uuid, "reason": "Bank details mismatch" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payload"]["status"], "REJECTED");

    let stored = users::find(&h.state.pool, &owner.u_uuid).await.unwrap().unwrap();
    assert_eq!(stored.balance, dec!(250));
    assert_ne!(admin.u_uuid, owner.u_uuid);
}

#[tokio::test]
async fn test_http_category_delete_guard() {
    let h = Harness::new().await;
    let (owner, _) = h.user(Role::User, None).await;
    let (_, mod_token) = h.user(Role::Moderator, None).await;
    let cat = categories::fixtures::category(&h.state.pool, "Arts", false).await;
    funds::fixtures::fund(&h.state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Active).await;
    funds::fixtures::fund(&h.state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Pending).await;

    let (status, body) = h
        .post(
            "/admin/private/category-delete",
            Some(&mod_token),
            json!({ "c_uuid": cat.c_uuid }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAT-E1004");
    assert!(body["message"].as_str().unwrap().contains('2'));
}

#[tokio::test]
async fn test_http_payment_webhook() {
    let mut state = AppState::for_tests().await;
    state.config.stripe_webhook_secret = Some("whsec_test".into());
    let h = Harness::with_state(state);

    let owner = users::fixtures::user(&h.state.pool, Role::User, dec!(0), Some("card")).await;
    let cat = categories::fixtures::category(&h.state.pool, "Pets", false).await;
    let fund = funds::fixtures::fund(&h.state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Active).await;
    let settled = settlement::start_donation(
        &h.state,
        None,
        DonationRequest {
            fund_uuid: fund.f_uuid,
            amount: dec!(20),
            is_anonymous: true,
            payment_intent_id: Some("pi_123".into()),
        },
    )
    .await
    .unwrap();

    let payload = json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_123" } },
    })
    .to_string();

    let (status, _) = h
        .send(
            "/webhook/stripe",
            None,
            payload.clone(),
            &[("stripe-signature", "t=1,v1=00".to_string())],
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let signature = api::webhook::sign(payload.as_bytes(), "whsec_test", now());
    let (status, body) = h
        .send("/webhook/stripe", None, payload, &[("stripe-signature", signature)])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let donation = donations::find(&h.state.pool, &settled.donation.d_uuid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(donation.status, DonationStatus::Failed);
}
