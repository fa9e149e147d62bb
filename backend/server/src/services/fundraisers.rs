//! Fundraiser creation, owner edits and admin moderation.

use crowdfund_core::lifecycle::{plan_fund_transition, ReasonUpdate};
use crowdfund_core::{round_money, CategoryStatus, FundAction, FundError, FundStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::AppState;
use crate::db::funds::{self, Fund};
use crate::db::users::User;
use crate::db::{self, categories, donations, new_uuid, now};
use crate::errors::ApiResult;

pub const MAX_IMAGES: usize = 5;

/// Owner-supplied fields for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct FundDraft {
    pub category_uuid: String,
    pub title: String,
    pub purpose: String,
    pub amount: Decimal,
    pub deadline: i64,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
}

/// Fund plus the sum of its successful donations.
#[derive(Debug, Clone, Serialize)]
pub struct FundDetail {
    #[serde(flatten)]
    pub fund: Fund,
    pub raised: Decimal,
}

async fn validate_draft(state: &AppState, draft: &FundDraft) -> ApiResult<()> {
    if draft.title.trim().is_empty() {
        return Err(FundError::MissingField("title").into());
    }
    if draft.purpose.trim().is_empty() {
        return Err(FundError::MissingField("purpose").into());
    }
    if draft.amount <= Decimal::ZERO {
        return Err(FundError::InvalidAmount.into());
    }
    if draft.deadline <= now() {
        return Err(FundError::DeadlineInPast.into());
    }
    if draft.images.len() > MAX_IMAGES {
        return Err(FundError::TooManyImages {
            max: MAX_IMAGES,
            got: draft.images.len(),
        }
        .into());
    }
    match categories::find(&state.pool, &draft.category_uuid).await? {
        Some(c) if c.status == CategoryStatus::Active => Ok(()),
        _ => Err(FundError::CategoryUnavailable.into()),
    }
}

/// New fundraisers start PENDING and wait for moderation.
pub async fn create(state: &AppState, owner: &User, draft: FundDraft) -> ApiResult<Fund> {
    validate_draft(state, &draft).await?;

    let ts = now();
    let fund = Fund {
        f_uuid: new_uuid(),
        f_fk_uc_uuid: owner.u_uuid.clone(),
        f_fk_c_uuid: draft.category_uuid,
        title: draft.title.trim().to_string(),
        purpose: draft.purpose.trim().to_string(),
        amount: round_money(draft.amount),
        deadline: draft.deadline,
        story: draft.story,
        images: draft.images,
        video: draft.video.filter(|v| !v.trim().is_empty()),
        status: FundStatus::Pending,
        pause_reason: None,
        approved_at: None,
        created_at: ts,
        updated_at: ts,
    };
    funds::insert(&state.pool, &fund).await?;
    info!("Fundraiser {} created by {}", fund.f_uuid, owner.u_uuid);
    Ok(fund)
}

/// Owner edit. Status and moderation fields are not touched.
pub async fn update(state: &AppState, owner: &User, f_uuid: &str, draft: FundDraft) -> ApiResult<Fund> {
    let mut fund = funds::find(&state.pool, f_uuid)
        .await?
        .ok_or(FundError::NotFound)?;
    if fund.f_fk_uc_uuid != owner.u_uuid {
        return Err(FundError::NotOwner.into());
    }
    validate_draft(state, &draft).await?;

    fund.f_fk_c_uuid = draft.category_uuid;
    fund.title = draft.title.trim().to_string();
    fund.purpose = draft.purpose.trim().to_string();
    fund.amount = round_money(draft.amount);
    fund.deadline = draft.deadline;
    fund.story = draft.story;
    fund.images = draft.images;
    fund.video = draft.video.filter(|v| !v.trim().is_empty());
    fund.updated_at = now();

    funds::update_details(&state.pool, &fund).await?;
    Ok(fund)
}

pub async fn detail(state: &AppState, f_uuid: &str) -> ApiResult<FundDetail> {
    let fund = funds::find(&state.pool, f_uuid)
        .await?
        .ok_or(FundError::NotFound)?;
    let raised = donations::raised_total(&state.pool, f_uuid).await?;
    Ok(FundDetail { fund, raised })
}

/// Apply an admin moderation action.
///
/// An unknown fund fails with `FUND-E1002` before anything is written.
pub async fn moderate(
    state: &AppState,
    f_uuid: &str,
    action: FundAction,
    reason: Option<String>,
) -> ApiResult<Fund> {
    let mut fund = funds::find(&state.pool, f_uuid)
        .await?
        .ok_or(FundError::NotFound)?;

    let plan = plan_fund_transition(fund.status, action, reason, state.config.transition_policy)?;
    if !plan.transition.on_table {
        warn!(
            "Fundraiser {f_uuid}: {} applied outside the transition table ({} -> {})",
            action.as_str(),
            plan.transition.from,
            plan.transition.to
        );
    }

    match plan.reason {
        ReasonUpdate::Keep => {}
        ReasonUpdate::Set(r) => fund.pause_reason = Some(r),
        ReasonUpdate::Clear => fund.pause_reason = None,
    }
    fund.status = plan.transition.to;
    fund.updated_at = now();
    let approved_at = (action == FundAction::Approve).then_some(fund.updated_at);
    if let Some(ts) = approved_at {
        fund.approved_at = Some(ts);
    }

    funds::set_status(
        &state.pool,
        f_uuid,
        fund.status,
        fund.pause_reason.as_deref(),
        approved_at,
        fund.updated_at,
    )
    .await?;
    info!(
        "Fundraiser {f_uuid} {} -> {} ({})",
        plan.transition.from,
        fund.status,
        action.as_str()
    );

    notify_owner(state, &fund, action).await;
    Ok(fund)
}

async fn notify_owner(state: &AppState, fund: &Fund, action: FundAction) {
    let (subject, body) = match action {
        FundAction::Approve => (
            "Your fundraiser is live",
            format!("\"{}\" was approved and is now accepting donations.", fund.title),
        ),
        FundAction::Reject => (
            "Your fundraiser was not approved",
            format!(
                "\"{}\" was rejected: {}",
                fund.title,
                fund.pause_reason.as_deref().unwrap_or_default()
            ),
        ),
        _ => return,
    };

    match db::users::find(&state.pool, &fund.f_fk_uc_uuid).await {
        Ok(Some(owner)) => state.outbox.mail(&owner.email, subject, body),
        Ok(None) => warn!("Fundraiser {} has no owner record", fund.f_uuid),
        Err(e) => warn!("Owner lookup for fundraiser {} failed: {e}", fund.f_uuid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::users;
    use crate::errors::ApiError;
    use crate::notify::testing::RecordingNotifier;
    use crowdfund_core::TransitionPolicy;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn draft(category: &str) -> FundDraft {
        FundDraft {
            category_uuid: category.to_string(),
            title: "School roof".into(),
            purpose: "Rebuild after storm".into(),
            amount: dec!(2500),
            deadline: now() + 86_400,
            story: String::new(),
            images: vec!["a.jpg".into()],
            video: None,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let state = AppState::for_tests().await;
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&state.pool, "Education", false).await;

        let fund = create(&state, &owner, draft(&cat.c_uuid)).await.unwrap();
        assert_eq!(fund.status, FundStatus::Pending);
        assert!(fund.approved_at.is_none());
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let state = AppState::for_tests().await;
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&state.pool, "Education", false).await;

        let mut d = draft(&cat.c_uuid);
        d.images = vec!["x".into(); 6];
        let err = create(&state, &owner, d).await.unwrap_err();
        assert!(matches!(err, ApiError::Fund(FundError::TooManyImages { max: 5, got: 6 })));

        let mut d = draft(&cat.c_uuid);
        d.deadline = now() - 1;
        let err = create(&state, &owner, d).await.unwrap_err();
        assert!(matches!(err, ApiError::Fund(FundError::DeadlineInPast)));

        let err = create(&state, &owner, draft("nope")).await.unwrap_err();
        assert!(matches!(err, ApiError::Fund(FundError::CategoryUnavailable)));
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let state = AppState::for_tests().await;
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let other = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&state.pool, "Education", false).await;
        let fund = create(&state, &owner, draft(&cat.c_uuid)).await.unwrap();

        let err = update(&state, &other, &fund.f_uuid, draft(&cat.c_uuid)).await.unwrap_err();
        assert!(matches!(err, ApiError::Fund(FundError::NotOwner)));

        let mut d = draft(&cat.c_uuid);
        d.title = "New roof".into();
        let updated = update(&state, &owner, &fund.f_uuid, d).await.unwrap();
        assert_eq!(updated.title, "New roof");
    }

    #[tokio::test]
    async fn test_moderation_sets_and_clears_reason() {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::for_tests_with(notifier.clone()).await;
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&state.pool, "Education", false).await;
        let fund = funds::fixtures::fund(&state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Pending).await;

        let approved = moderate(&state, &fund.f_uuid, FundAction::Approve, None).await.unwrap();
        assert_eq!(approved.status, FundStatus::Active);
        assert!(approved.approved_at.is_some());

        let paused = moderate(&state, &fund.f_uuid, FundAction::Pause, None).await.unwrap();
        assert_eq!(paused.pause_reason.as_deref(), Some("Paused by admin"));

        moderate(&state, &fund.f_uuid, FundAction::Resume, None).await.unwrap();
        let stored = funds::find(&state.pool, &fund.f_uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, FundStatus::Active);
        assert!(stored.pause_reason.is_none());
        assert_eq!(stored.approved_at, approved.approved_at);
        state.outbox.drain().await;
        assert_eq!(notifier.subjects(), vec!["Your fundraiser is live".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_fund_writes_nothing() {
        let state = AppState::for_tests().await;
        let err = moderate(&state, "missing", FundAction::Approve, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Fund(FundError::NotFound)));
    }

    #[tokio::test]
    async fn test_strict_policy_refuses_off_table_moves() {
        let mut state = AppState::for_tests().await;
        state.config.transition_policy = TransitionPolicy::Strict;
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&state.pool, "Education", false).await;
        let fund = funds::fixtures::fund(&state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Closed).await;

        let err = moderate(&state, &fund.f_uuid, FundAction::Resume, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Fund(FundError::InvalidTransition { .. })));
        let stored = funds::find(&state.pool, &fund.f_uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, FundStatus::Closed);
    }

    #[tokio::test]
    async fn test_permissive_policy_applies_off_table_moves() {
        let state = AppState::for_tests().await;
        let owner = users::fixtures::user(&state.pool, Role::User, Decimal::ZERO, None).await;
        let cat = categories::fixtures::category(&state.pool, "Education", false).await;
        let fund = funds::fixtures::fund(&state.pool, &owner.u_uuid, &cat.c_uuid, FundStatus::Closed).await;

        let resumed = moderate(&state, &fund.f_uuid, FundAction::Resume, None).await.unwrap();
        assert_eq!(resumed.status, FundStatus::Active);
    }
}
