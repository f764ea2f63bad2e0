//! JSON request and response bodies of the HTTP API.
//!
//! Money travels as decimal strings with two places (`"100.00"`), dates as
//! `YYYY-MM-DD`, ids as UUID strings.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a field that distinguishes "absent" (`None`) from an explicit
/// `null` (`Some(None)`). Use together with `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Plain `{"msg": ...}` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub msg: String,
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub email: String,
        #[serde(default)]
        pub full_name: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Tokens {
        pub access: String,
        pub refresh: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Registered {
        pub msg: String,
        pub tokens: Tokens,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoggedIn {
        pub tokens: Tokens,
    }

    /// Body of `/auth/refresh` and `/auth/logout`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshToken {
        pub refresh: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccessToken {
        pub access: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordResetRequest {
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordResetConfirm {
        pub email: String,
        pub otp: String,
        pub new_password: String,
    }
}

pub mod user {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Profile {
        pub id: Uuid,
        pub email: String,
        pub full_name: String,
        pub currency: String,
        pub notify_on_budget_exceed: bool,
        pub created_at: DateTime<Utc>,
    }

    /// Partial update: absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub full_name: Option<String>,
        pub currency: Option<String>,
        pub notify_on_budget_exceed: Option<bool>,
    }
}

pub mod transaction {
    use chrono::{DateTime, NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    /// Path segment of `/transactions/{kind}`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RecurrenceType {
        Weekly,
        Monthly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        /// Decimal string, must be > 0.
        pub amount: String,
        pub date: NaiveDate,
        pub category: Option<Uuid>,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub is_recurring: bool,
        pub recurrence_type: Option<RecurrenceType>,
        /// Total occurrences, the created record included.
        pub recurrence_count: Option<u32>,
    }

    /// Partial update of one record. `"category": null` clears the category.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub category: Option<Option<Uuid>>,
        pub description: Option<String>,
        pub date: Option<NaiveDate>,
    }

    /// Query string of the listing. `month` without `year` matches that
    /// month in every year.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub category: Option<Uuid>,
        pub date: Option<NaiveDate>,
        pub month: Option<u32>,
        pub year: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub category: Option<Uuid>,
        pub amount: String,
        pub description: String,
        pub date: NaiveDate,
        pub created_at: DateTime<Utc>,
        pub is_recurring: bool,
        pub recurrence_type: Option<RecurrenceType>,
        pub recurrence_count: Option<u32>,
    }

    /// Response of a create: the record plus the generated siblings of its
    /// recurring series.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub transaction: TransactionView,
        pub generated: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub total_income: String,
        pub total_expense: String,
        pub balance: String,
    }
}

pub mod category {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::{transaction::TransactionKind, *};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: TransactionKind,
        pub description: Option<String>,
    }

    /// `"description": null` clears the description.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub kind: Option<TransactionKind>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub description: Option<Option<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: TransactionKind,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod budget {
    use chrono::{DateTime, NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub category: Uuid,
        pub name: Option<String>,
        pub amount: String,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub category: Option<Uuid>,
        pub name: Option<String>,
        pub amount: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
    }

    /// Query string of the listing.
    ///
    /// `ordering` is one of `start_date`, `created_at`, optionally prefixed
    /// with `-` for descending order.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetQuery {
        pub category: Option<Uuid>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub month: Option<u32>,
        pub year: Option<i32>,
        pub exceeded: Option<bool>,
        pub ordering: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category: Uuid,
        pub name: String,
        pub amount: String,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub created_at: DateTime<Utc>,
        pub total_spent: String,
        pub exceeded: bool,
        pub exceeded_amount: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetWarning {
        pub budget_id: Uuid,
        pub budget_name: String,
        pub budget_amount: String,
        pub total_expense: String,
        pub exceeded_by: String,
        pub category: String,
    }
}
