//! Income and expense API endpoints

use api_types::transaction::{
    Balance, RecurrenceType as ApiRecurrenceType, TransactionCreated,
    TransactionKind as ApiKind, TransactionNew, TransactionQuery, TransactionUpdate,
    TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{
    MoneyCents, NewTransactionCmd, Recurrence, RecurrenceType, Transaction, TransactionFilter,
    TransactionKind, TransactionUpdateCmd, User,
};

pub(crate) fn kind_from_api(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
    }
}

pub(crate) fn kind_to_api(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

fn map_recurrence_type(recurrence_type: ApiRecurrenceType) -> RecurrenceType {
    match recurrence_type {
        ApiRecurrenceType::Weekly => RecurrenceType::Weekly,
        ApiRecurrenceType::Monthly => RecurrenceType::Monthly,
    }
}

fn transaction_view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: kind_to_api(tx.kind),
        category: tx.category_id,
        amount: tx.amount.to_string(),
        description: tx.description,
        date: tx.date,
        created_at: tx.created_at,
        is_recurring: tx.recurrence.is_some(),
        recurrence_type: tx.recurrence.map(|r| match r.recurrence_type {
            RecurrenceType::Weekly => ApiRecurrenceType::Weekly,
            RecurrenceType::Monthly => ApiRecurrenceType::Monthly,
        }),
        recurrence_count: tx.recurrence.map(Recurrence::count),
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(kind): Path<ApiKind>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let filter = TransactionFilter {
        category_id: query.category,
        date: query.date,
        month: query.month,
        year: query.year,
    };
    let txs = state
        .engine
        .list_transactions(user.id, kind_from_api(kind), &filter)
        .await?;
    Ok(Json(txs.into_iter().map(transaction_view).collect()))
}

/// Create a record; a recurring one also creates the rest of its series.
pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(kind): Path<ApiKind>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let amount: MoneyCents = payload.amount.parse()?;
    let recurrence = Recurrence::from_parts(
        payload.is_recurring,
        payload.recurrence_type.map(map_recurrence_type),
        payload.recurrence_count,
    )?;

    let mut cmd = NewTransactionCmd::new(user.id, kind_from_api(kind), amount, payload.date)
        .description(payload.description);
    if let Some(category_id) = payload.category {
        cmd = cmd.category_id(category_id);
    }
    if let Some(recurrence) = recurrence {
        cmd = cmd.recurrence(recurrence);
    }

    let created = state.engine.create_transaction(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated {
            transaction: transaction_view(created.transaction),
            generated: created.generated.into_iter().map(transaction_view).collect(),
        }),
    ))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(ApiKind, Uuid)>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .transaction(user.id, kind_from_api(kind), id)
        .await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(ApiKind, Uuid)>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let amount = payload
        .amount
        .as_deref()
        .map(str::parse::<MoneyCents>)
        .transpose()?;
    let tx = state
        .engine
        .update_transaction(
            user.id,
            kind_from_api(kind),
            id,
            TransactionUpdateCmd {
                amount,
                category_id: payload.category,
                description: payload.description,
                date: payload.date,
            },
        )
        .await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(ApiKind, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(user.id, kind_from_api(kind), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn balance(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Balance>, ServerError> {
    let balance = state.engine.balance(user.id).await?;
    Ok(Json(Balance {
        total_income: balance.total_income.to_string(),
        total_expense: balance.total_expense.to_string(),
        balance: balance.balance.to_string(),
    }))
}
