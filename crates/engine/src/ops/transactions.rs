use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, NewTransactionCmd, ResultEngine, Transaction, TransactionFilter,
    TransactionKind, TransactionUpdateCmd, extend_series, transactions,
    util::{in_month, period_bounds, validate_month},
};

use super::{Engine, with_tx};

/// Result of a create: the requested record plus the generated siblings of
/// its recurring series (empty for one-off records).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub generated: Vec<Transaction>,
}

/// Totals of a user across every record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Balance {
    pub total_income: MoneyCents,
    pub total_expense: MoneyCents,
    /// `total_income - total_expense`, may be negative.
    pub balance: MoneyCents,
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter) -> ResultEngine<Self>;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter) -> ResultEngine<Self> {
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some(date) = filter.date {
            self = self.filter(transactions::Column::Date.eq(date));
        }
        if let Some(year) = filter.year {
            let (first, last) = period_bounds(year, filter.month)?;
            self = self.filter(transactions::Column::Date.between(first, last));
        }
        Ok(self)
    }
}

impl Engine {
    /// Create an income or expense record.
    ///
    /// For a recurring command the base record is committed first, then its
    /// `count - 1` siblings are written as one batch. If the batch fails the
    /// error is returned and only the base record remains.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<CreatedTransaction> {
        let base = Transaction::new(
            cmd.user_id,
            cmd.kind,
            cmd.category_id,
            cmd.amount,
            cmd.description.trim().to_string(),
            cmd.date,
            cmd.recurrence,
        )?;

        let base = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, base.user_id).await?;
            self.require_optional_category(&db_tx, base.user_id, base.category_id)
                .await?;
            transactions::ActiveModel::try_from(&base)?.insert(&db_tx).await?;
            Ok::<_, EngineError>(base)
        })?;

        let generated = extend_series(self, &base).await.inspect_err(|err| {
            tracing::warn!(base_id = %base.id, "recurring series not generated: {err}");
        })?;

        Ok(CreatedTransaction {
            transaction: base,
            generated,
        })
    }

    /// Records of `kind` owned by `user_id`, newest date first.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        if let Some(month) = filter.month {
            validate_month(month)?;
        }

        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .apply_tx_filters(filter)?
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let tx = Transaction::try_from(model)?;
            if filter.year.is_some() || in_month(tx.date, filter.month) {
                out.push(tx);
            }
        }
        Ok(out)
    }

    pub async fn transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let model = self
            .require_transaction(&self.database, user_id, kind, transaction_id)
            .await?;
        Transaction::try_from(model)
    }

    /// Update one record. Recurrence fields and other records of the series
    /// are left as they are.
    pub async fn update_transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        transaction_id: Uuid,
        cmd: TransactionUpdateCmd,
    ) -> ResultEngine<Transaction> {
        let amount = cmd.amount.map(MoneyCents::positive_amount).transpose()?;

        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, user_id, kind, transaction_id)
                .await?;
            let mut active: transactions::ActiveModel = model.into();
            if let Some(amount) = amount {
                active.amount_minor = ActiveValue::Set(amount.cents());
            }
            if let Some(category_id) = cmd.category_id {
                self.require_optional_category(&db_tx, user_id, category_id)
                    .await?;
                active.category_id = ActiveValue::Set(category_id);
            }
            if let Some(description) = cmd.description {
                active.description = ActiveValue::Set(description.trim().to_string());
            }
            if let Some(date) = cmd.date {
                active.date = ActiveValue::Set(date);
            }
            let model = active.update(&db_tx).await?;
            Transaction::try_from(model)
        })
    }

    /// Delete one record; other records of its series are kept.
    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_transaction(&db_tx, user_id, kind, transaction_id)
                .await?;
            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    async fn sum_amounts<C>(&self, db: &C, user_id: Uuid, kind: TransactionKind) -> ResultEngine<MoneyCents>
    where
        C: ConnectionTrait,
    {
        let user_bytes: Vec<u8> = user_id.as_bytes().to_vec();
        let stmt = Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT COALESCE(SUM(amount_minor), 0) AS total \
             FROM transactions \
             WHERE user_id = ? AND kind = ?",
            vec![user_bytes.into(), kind.as_str().into()],
        );
        let total = match db.query_one(stmt).await? {
            Some(row) => row.try_get::<i64>("", "total")?,
            None => 0,
        };
        Ok(MoneyCents::new(total))
    }

    /// Income, expense and net totals of `user_id`.
    pub async fn balance(&self, user_id: Uuid) -> ResultEngine<Balance> {
        let total_income = self
            .sum_amounts(&self.database, user_id, TransactionKind::Income)
            .await?;
        let total_expense = self
            .sum_amounts(&self.database, user_id, TransactionKind::Expense)
            .await?;
        let balance = total_income.checked_sub(total_expense).ok_or_else(|| {
            EngineError::InvalidAmount("balance overflow".to_string())
        })?;
        Ok(Balance {
            total_income,
            total_expense,
            balance,
        })
    }
}
