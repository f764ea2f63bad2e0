use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{AuthConfig, ServerState, router, run, run_with_listener};

mod auth;
mod budgets;
mod categories;
mod server;
mod transactions;
mod users;

pub mod types {
    pub mod auth {
        pub use api_types::auth::{
            AccessToken, LoggedIn, Login, PasswordResetConfirm, PasswordResetRequest,
            RefreshToken, Register, Registered, Tokens,
        };
    }

    pub mod user {
        pub use api_types::user::{Profile, ProfileUpdate};
    }

    pub mod category {
        pub use api_types::category::{CategoryNew, CategoryUpdate, CategoryView};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            Balance, RecurrenceType, TransactionCreated, TransactionKind, TransactionNew,
            TransactionQuery, TransactionUpdate, TransactionView,
        };
    }

    pub mod budget {
        pub use api_types::budget::{
            BudgetNew, BudgetQuery, BudgetUpdate, BudgetView, BudgetWarning,
        };
    }

    pub use api_types::Message;
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Malformed request the engine never saw.
    Generic(String),
    /// Missing, invalid, expired or revoked token.
    Unauthorized(String),
    /// Failure unrelated to the request (e.g. token signing); logged, never
    /// shown to the client.
    Internal(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

const INTERNAL_ERROR: &str = "internal server error";

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::InvalidOtp(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidRecurrence(_)
        | EngineError::InvalidDate(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidKind(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::PasswordHash(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            INTERNAL_ERROR.to_string()
        }
        EngineError::PasswordHash(hash_err) => {
            tracing::error!("password hashing error: {hash_err}");
            INTERNAL_ERROR.to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err),
            ServerError::Internal(err) => {
                tracing::error!("internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
