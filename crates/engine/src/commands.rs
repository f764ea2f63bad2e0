//! Command structs for engine operations.
//!
//! These types group parameters for write operations and list filters,
//! keeping call sites readable and avoiding long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{MoneyCents, Recurrence, TransactionKind};

/// Create a user account.
#[derive(Clone, Debug)]
pub struct NewUserCmd {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdateCmd {
    pub full_name: Option<String>,
    pub currency: Option<String>,
    pub notify_on_budget_exceed: Option<bool>,
}

/// Create an income or expense record, optionally the first of a recurring
/// series.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub category_id: Option<Uuid>,
    pub description: String,
    pub recurrence: Option<Recurrence>,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(user_id: Uuid, kind: TransactionKind, amount: MoneyCents, date: NaiveDate) -> Self {
        Self {
            user_id,
            kind,
            amount,
            date,
            category_id: None,
            description: String::new(),
            recurrence: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }
}

/// Update a single record. Siblings of a recurring series are not touched.
///
/// `category_id: Some(None)` clears the category.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdateCmd {
    pub amount: Option<MoneyCents>,
    pub category_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Filters for listing income or expense records.
///
/// `month` without `year` matches that month in every year.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub category_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Clone, Debug)]
pub struct NewCategoryCmd {
    pub name: String,
    pub kind: TransactionKind,
    pub description: Option<String>,
}

/// `description: Some(None)` clears the description.
#[derive(Clone, Debug, Default)]
pub struct CategoryUpdateCmd {
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub category_id: Uuid,
    /// Defaults to `"Budget"`.
    pub name: Option<String>,
    pub amount: MoneyCents,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone, Debug, Default)]
pub struct BudgetUpdateCmd {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub amount: Option<MoneyCents>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BudgetOrderField {
    StartDate,
    #[default]
    CreatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BudgetOrdering {
    pub field: BudgetOrderField,
    pub descending: bool,
}

impl BudgetOrdering {
    /// Parse `start_date`, `created_at`, optionally prefixed by `-` for
    /// descending order.
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, field) = match value.trim().strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.trim()),
        };
        let field = match field {
            "start_date" => BudgetOrderField::StartDate,
            "created_at" => BudgetOrderField::CreatedAt,
            _ => return None,
        };
        Some(Self { field, descending })
    }
}

/// Filters for listing budgets. `month`/`year` apply to `start_date`.
#[derive(Clone, Debug, Default)]
pub struct BudgetFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    /// Keep only budgets whose spend is above their amount.
    pub exceeded_only: bool,
    pub ordering: BudgetOrdering,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_parses_direction_prefix() {
        assert_eq!(
            BudgetOrdering::parse("-start_date"),
            Some(BudgetOrdering {
                field: BudgetOrderField::StartDate,
                descending: true,
            })
        );
        assert_eq!(
            BudgetOrdering::parse("created_at"),
            Some(BudgetOrdering {
                field: BudgetOrderField::CreatedAt,
                descending: false,
            })
        );
        assert_eq!(BudgetOrdering::parse("amount"), None);
    }
}
