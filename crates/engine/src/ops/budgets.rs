use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Budget, BudgetFilter, BudgetOrderField, BudgetReport, BudgetUpdateCmd, BudgetWarning,
    EngineError, MoneyCents, NewBudgetCmd, ResultEngine, TransactionStore, budgets, categories,
    util::{in_month, normalize_budget_name, period_bounds, validate_month},
};

use super::{Engine, with_tx};

const DEFAULT_BUDGET_NAME: &str = "Budget";

fn validate_budget(budget: &Budget) -> ResultEngine<()> {
    budget.amount.positive_amount()?;
    if budget.start_date > budget.end_date {
        return Err(EngineError::InvalidDate(
            "start_date must not be after end_date".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Evaluate `budget` against the expenses currently stored.
    async fn report(&self, budget: Budget) -> ResultEngine<BudgetReport> {
        let expenses = self
            .find_expenses(budget.user_id, budget.category_id, budget.period())
            .await?;
        let status = budget.evaluate(&expenses);
        Ok(BudgetReport { budget, status })
    }

    /// Budgets of `user_id` with their current status.
    pub async fn list_budgets(
        &self,
        user_id: Uuid,
        filter: &BudgetFilter,
    ) -> ResultEngine<Vec<BudgetReport>> {
        if let Some(month) = filter.month {
            validate_month(month)?;
        }

        let mut query = budgets::Entity::find().filter(budgets::Column::UserId.eq(user_id));
        if let Some(category_id) = filter.category_id {
            query = query.filter(budgets::Column::CategoryId.eq(category_id));
        }
        if let Some(start_date) = filter.start_date {
            query = query.filter(budgets::Column::StartDate.eq(start_date));
        }
        if let Some(end_date) = filter.end_date {
            query = query.filter(budgets::Column::EndDate.eq(end_date));
        }
        if let Some(year) = filter.year {
            let (first, last) = period_bounds(year, filter.month)?;
            query = query.filter(budgets::Column::StartDate.between(first, last));
        }
        let column = match filter.ordering.field {
            BudgetOrderField::StartDate => budgets::Column::StartDate,
            BudgetOrderField::CreatedAt => budgets::Column::CreatedAt,
        };
        query = if filter.ordering.descending {
            query.order_by_desc(column)
        } else {
            query.order_by_asc(column)
        };

        let models = query.all(&self.database).await?;
        let mut reports = Vec::with_capacity(models.len());
        for model in models {
            let budget = Budget::from(model);
            if filter.year.is_none() && !in_month(budget.start_date, filter.month) {
                continue;
            }
            let report = self.report(budget).await?;
            if filter.exceeded_only && !report.status.is_exceeded {
                continue;
            }
            reports.push(report);
        }
        Ok(reports)
    }

    pub async fn budget(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<BudgetReport> {
        let model = self
            .require_budget(&self.database, user_id, budget_id)
            .await?;
        self.report(Budget::from(model)).await
    }

    /// Create a budget on a category owned by `user_id`.
    pub async fn create_budget(&self, user_id: Uuid, cmd: NewBudgetCmd) -> ResultEngine<BudgetReport> {
        let name = normalize_budget_name(cmd.name.as_deref().unwrap_or(DEFAULT_BUDGET_NAME))?;
        let budget = Budget {
            id: Uuid::new_v4(),
            user_id,
            category_id: cmd.category_id,
            name,
            amount: cmd.amount,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            created_at: Utc::now(),
        };
        validate_budget(&budget)?;

        let budget = with_tx!(self, |db_tx| {
            self.require_category(&db_tx, user_id, budget.category_id)
                .await?;
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            Ok::<_, EngineError>(budget)
        })?;
        tracing::debug!(budget_id = %budget.id, "budget created");
        self.report(budget).await
    }

    /// Partially update a budget. The resulting period and amount are
    /// validated as a whole.
    pub async fn update_budget(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        cmd: BudgetUpdateCmd,
    ) -> ResultEngine<BudgetReport> {
        let name = cmd.name.as_deref().map(normalize_budget_name).transpose()?;

        let budget = with_tx!(self, |db_tx| {
            let mut budget = Budget::from(self.require_budget(&db_tx, user_id, budget_id).await?);
            if let Some(category_id) = cmd.category_id {
                self.require_category(&db_tx, user_id, category_id).await?;
                budget.category_id = category_id;
            }
            if let Some(name) = name {
                budget.name = name;
            }
            if let Some(amount) = cmd.amount {
                budget.amount = amount;
            }
            if let Some(start_date) = cmd.start_date {
                budget.start_date = start_date;
            }
            if let Some(end_date) = cmd.end_date {
                budget.end_date = end_date;
            }
            validate_budget(&budget)?;

            let mut active = budgets::ActiveModel::from(&budget);
            active.id = ActiveValue::Unchanged(budget.id);
            active.user_id = ActiveValue::Unchanged(budget.user_id);
            active.created_at = ActiveValue::Unchanged(budget.created_at);
            active.update(&db_tx).await?;
            Ok::<_, EngineError>(budget)
        })?;
        self.report(budget).await
    }

    pub async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_budget(&db_tx, user_id, budget_id).await?;
            budgets::Entity::delete_by_id(budget_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Exceeded budgets of `user_id`, in the order of [`Engine::list_budgets`]
    /// with default filters.
    pub async fn budget_warnings(&self, user_id: Uuid) -> ResultEngine<Vec<BudgetWarning>> {
        let category_names: HashMap<Uuid, String> = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| (model.id, model.name))
            .collect();

        let filter = BudgetFilter {
            exceeded_only: true,
            ..BudgetFilter::default()
        };
        let warnings = self
            .list_budgets(user_id, &filter)
            .await?
            .into_iter()
            .map(|BudgetReport { budget, status }| BudgetWarning {
                budget_id: budget.id,
                category: category_names
                    .get(&budget.category_id)
                    .cloned()
                    .unwrap_or_default(),
                budget_name: budget.name,
                budget_amount: budget.amount,
                total_expense: status.total_spent,
                exceeded_by: status.exceeded_amount,
            })
            .collect::<Vec<_>>();

        if !warnings.is_empty() {
            let over: MoneyCents = warnings.iter().map(|w| w.exceeded_by).sum();
            tracing::debug!(%user_id, count = warnings.len(), %over, "budgets exceeded");
        }
        Ok(warnings)
    }
}
