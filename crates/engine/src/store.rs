//! Storage capability used by the recurrence expander and the budget
//! evaluator.
//!
//! [`Engine`](crate::Engine) implements it over sea-orm; tests and other
//! backends can provide their own implementation.

use std::{future::Future, ops::RangeInclusive};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{ResultEngine, Transaction};

pub trait TransactionStore {
    /// Expense records of `owner` in `category` whose date falls inside
    /// `range` (both ends inclusive).
    fn find_expenses(
        &self,
        owner: Uuid,
        category: Uuid,
        range: RangeInclusive<NaiveDate>,
    ) -> impl Future<Output = ResultEngine<Vec<Transaction>>> + Send;

    /// Persist `records` all-or-nothing: on error no record of the batch is
    /// stored.
    fn save_batch(&self, records: &[Transaction]) -> impl Future<Output = ResultEngine<()>> + Send;
}
