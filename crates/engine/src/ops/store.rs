use std::ops::RangeInclusive;

use chrono::NaiveDate;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{ResultEngine, Transaction, TransactionKind, TransactionStore, transactions};

use super::{Engine, with_tx};

impl TransactionStore for Engine {
    async fn find_expenses(
        &self,
        owner: Uuid,
        category: Uuid,
        range: RangeInclusive<NaiveDate>,
    ) -> ResultEngine<Vec<Transaction>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let (start, end) = range.into_inner();
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(owner))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::CategoryId.eq(category))
            .filter(transactions::Column::Date.between(start, end))
            .order_by_asc(transactions::Column::Date)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn save_batch(&self, records: &[Transaction]) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            for record in records {
                transactions::ActiveModel::try_from(record)?.insert(&db_tx).await?;
            }
            Ok(())
        })
    }
}
