//! Budgets and their exceedance evaluation.
//!
//! A budget caps the spend of one expense category over an inclusive date
//! range. Its status is never stored: [`evaluate`] derives it from the
//! matching expense records every time it is read.

use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{MoneyCents, Transaction};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub amount: MoneyCents,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    /// Dates covered by the budget, both ends inclusive.
    ///
    /// A range with `start_date > end_date` is empty rather than an error.
    pub fn period(&self) -> RangeInclusive<NaiveDate> {
        self.start_date..=self.end_date
    }

    pub fn evaluate(&self, matching_expenses: &[Transaction]) -> BudgetStatus {
        evaluate(self, matching_expenses)
    }
}

/// Derived state of a budget against its matching expenses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetStatus {
    pub total_spent: MoneyCents,
    pub is_exceeded: bool,
    /// `total_spent - amount` when exceeded, zero otherwise.
    pub exceeded_amount: MoneyCents,
}

/// Compare the summed `matching_expenses` against `budget.amount`.
///
/// The caller selects the expenses (same owner, same category, date inside
/// [`Budget::period`]); this function only does the arithmetic. Spending
/// exactly the budgeted amount is not an exceedance. Totals saturate at
/// `i64::MAX` cents.
pub fn evaluate(budget: &Budget, matching_expenses: &[Transaction]) -> BudgetStatus {
    let total_spent: MoneyCents = matching_expenses.iter().map(|tx| tx.amount).sum();
    let is_exceeded = total_spent > budget.amount;
    let exceeded_amount = if is_exceeded {
        total_spent.saturating_sub(budget.amount)
    } else {
        MoneyCents::ZERO
    };

    BudgetStatus {
        total_spent,
        is_exceeded,
        exceeded_amount,
    }
}

/// A budget together with its evaluated status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetReport {
    pub budget: Budget,
    pub status: BudgetStatus,
}

/// One entry of the warnings listing: an exceeded budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetWarning {
    pub budget_id: Uuid,
    pub budget_name: String,
    pub budget_amount: MoneyCents,
    pub total_expense: MoneyCents,
    pub exceeded_by: MoneyCents,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub start_date: Date,
    pub end_date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id),
            user_id: ActiveValue::Set(budget.user_id),
            category_id: ActiveValue::Set(budget.category_id),
            name: ActiveValue::Set(budget.name.clone()),
            amount_minor: ActiveValue::Set(budget.amount.cents()),
            start_date: ActiveValue::Set(budget.start_date),
            end_date: ActiveValue::Set(budget.end_date),
            created_at: ActiveValue::Set(budget.created_at),
        }
    }
}

impl From<Model> for Budget {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            name: model.name,
            amount: MoneyCents::new(model.amount_minor),
            start_date: model.start_date,
            end_date: model.end_date,
            created_at: model.created_at,
        }
    }
}
