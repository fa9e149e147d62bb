//! Categories and FAQs managed from the admin panel.

use crowdfund_core::category::check_deletable;
use crowdfund_core::{CategoryError, CategoryStatus};
use serde::Deserialize;
use tracing::info;

use crate::api::AppState;
use crate::db::categories::{self, Category};
use crate::db::faqs::{self, Faq};
use crate::db::{funds, new_uuid, now};
use crate::errors::{ApiError, ApiResult};

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<CategoryStatus>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

pub async fn create_category(state: &AppState, input: CategoryInput) -> ApiResult<Category> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(CategoryError::NameRequired.into());
    }
    if categories::name_taken(&state.pool, &name, None).await? {
        return Err(CategoryError::DuplicateName.into());
    }

    let ts = now();
    let category = Category {
        c_uuid: new_uuid(),
        name,
        description: input.description.trim().to_string(),
        status: input.status.unwrap_or(CategoryStatus::Active),
        is_default: input.is_default.unwrap_or(false),
        is_deleted: false,
        created_at: ts,
        updated_at: ts,
    };
    categories::insert(&state.pool, &category).await?;
    info!("Category {} ({}) created", category.c_uuid, category.name);
    Ok(category)
}

pub async fn update_category(state: &AppState, c_uuid: &str, input: CategoryInput) -> ApiResult<Category> {
    let mut category = categories::find(&state.pool, c_uuid)
        .await?
        .ok_or(CategoryError::NotFound)?;

    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(CategoryError::NameRequired.into());
    }
    if categories::name_taken(&state.pool, &name, Some(c_uuid)).await? {
        return Err(CategoryError::DuplicateName.into());
    }

    category.name = name;
    category.description = input.description.trim().to_string();
    if let Some(status) = input.status {
        category.status = status;
    }
    if let Some(is_default) = input.is_default {
        category.is_default = is_default;
    }
    category.updated_at = now();
    categories::update(&state.pool, &category).await?;
    Ok(category)
}

/// Soft delete. Refused for the default category and while any ACTIVE or
/// PENDING fundraiser still uses it.
pub async fn delete_category(state: &AppState, c_uuid: &str) -> ApiResult<()> {
    let category = categories::find(&state.pool, c_uuid)
        .await?
        .ok_or(CategoryError::NotFound)?;
    let blocking = funds::count_blocking_category(&state.pool, c_uuid).await?;
    check_deletable(category.is_default, blocking)?;

    categories::soft_delete(&state.pool, c_uuid, now()).await?;
    info!("Category {c_uuid} deleted");
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqInput {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn check_faq(input: &FaqInput) -> ApiResult<()> {
    if input.question.trim().is_empty() || input.answer.trim().is_empty() {
        return Err(ApiError::Validation(
            "Question and answer are required".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_faq(state: &AppState, input: FaqInput) -> ApiResult<Faq> {
    check_faq(&input)?;
    let ts = now();
    let faq = Faq {
        faq_uuid: new_uuid(),
        question: input.question.trim().to_string(),
        answer: input.answer.trim().to_string(),
        sort_order: input.sort_order,
        is_active: input.is_active,
        is_deleted: false,
        created_at: ts,
        updated_at: ts,
    };
    faqs::insert(&state.pool, &faq).await?;
    Ok(faq)
}

pub async fn update_faq(state: &AppState, faq_uuid: &str, input: FaqInput) -> ApiResult<Faq> {
    check_faq(&input)?;
    let mut faq = faqs::find(&state.pool, faq_uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("FAQ not found".to_string()))?;
    faq.question = input.question.trim().to_string();
    faq.answer = input.answer.trim().to_string();
    faq.sort_order = input.sort_order;
    faq.is_active = input.is_active;
    faq.updated_at = now();
    faqs::update(&state.pool, &faq).await?;
    Ok(faq)
}

pub async fn delete_faq(state: &AppState, faq_uuid: &str) -> ApiResult<()> {
    if !faqs::soft_delete(&state.pool, faq_uuid, now()).await? {
        return Err(ApiError::NotFound("FAQ not found".to_string()));
    }
    Ok(())
}
