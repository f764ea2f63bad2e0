//! Budgets API endpoints
//!
//! Every budget in a response carries its status against the expenses
//! stored at the time of the request.

use api_types::budget::{
    BudgetNew, BudgetQuery, BudgetUpdate, BudgetView, BudgetWarning as WarningView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{
    BudgetFilter, BudgetOrdering, BudgetReport, BudgetUpdateCmd, BudgetWarning, MoneyCents,
    NewBudgetCmd, User,
};

fn budget_view(report: BudgetReport) -> BudgetView {
    let BudgetReport { budget, status } = report;
    BudgetView {
        id: budget.id,
        category: budget.category_id,
        name: budget.name,
        amount: budget.amount.to_string(),
        start_date: budget.start_date,
        end_date: budget.end_date,
        created_at: budget.created_at,
        total_spent: status.total_spent.to_string(),
        exceeded: status.is_exceeded,
        exceeded_amount: status.exceeded_amount.to_string(),
    }
}

fn warning_view(warning: BudgetWarning) -> WarningView {
    WarningView {
        budget_id: warning.budget_id,
        budget_name: warning.budget_name,
        budget_amount: warning.budget_amount.to_string(),
        total_expense: warning.total_expense.to_string(),
        exceeded_by: warning.exceeded_by.to_string(),
        category: warning.category,
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<Vec<BudgetView>>, ServerError> {
    let ordering = match query.ordering.as_deref() {
        Some(value) => BudgetOrdering::parse(value)
            .ok_or_else(|| ServerError::Generic(format!("invalid ordering: {value}")))?,
        None => BudgetOrdering::default(),
    };
    let filter = BudgetFilter {
        category_id: query.category,
        start_date: query.start_date,
        end_date: query.end_date,
        month: query.month,
        year: query.year,
        exceeded_only: query.exceeded.unwrap_or(false),
        ordering,
    };

    let reports = state.engine.list_budgets(user.id, &filter).await?;
    Ok(Json(reports.into_iter().map(budget_view).collect()))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let amount: MoneyCents = payload.amount.parse()?;
    let report = state
        .engine
        .create_budget(
            user.id,
            NewBudgetCmd {
                category_id: payload.category,
                name: payload.name,
                amount,
                start_date: payload.start_date,
                end_date: payload.end_date,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(budget_view(report))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    let report = state.engine.budget(user.id, id).await?;
    Ok(Json(budget_view(report)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let amount = payload
        .amount
        .as_deref()
        .map(str::parse::<MoneyCents>)
        .transpose()?;
    let report = state
        .engine
        .update_budget(
            user.id,
            id,
            BudgetUpdateCmd {
                category_id: payload.category,
                name: payload.name,
                amount,
                start_date: payload.start_date,
                end_date: payload.end_date,
            },
        )
        .await?;
    Ok(Json(budget_view(report)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Exceeded budgets of the caller.
pub async fn warnings(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<WarningView>>, ServerError> {
    let warnings = state.engine.budget_warnings(user.id).await?;
    Ok(Json(warnings.into_iter().map(warning_view).collect()))
}
