//! Recurring transactions.
//!
//! A recurring transaction is stored as a *series*: the base record plus
//! `count - 1` generated siblings, each with an advanced date. Every record
//! of the series carries the same [`Recurrence`] (the total count is not
//! decremented on the siblings).

use std::num::NonZeroU32;

use chrono::{Days, Months, NaiveDate};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction, TransactionStore};

/// Cadence of a recurring series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecurrenceType {
    Weekly,
    Monthly,
}

impl RecurrenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Date of occurrence `index` of a series starting at `base` (index 0 is
    /// the base itself).
    ///
    /// Monthly offsets are always computed from `base`, so a series starting
    /// on Jan 31 lands on the last day of February and then on Mar 31.
    /// Returns `None` past the end of the calendar.
    pub fn occurrence_date(self, base: NaiveDate, index: u32) -> Option<NaiveDate> {
        match self {
            Self::Weekly => base.checked_add_days(Days::new(7 * u64::from(index))),
            Self::Monthly => base.checked_add_months(Months::new(index)),
        }
    }
}

impl TryFrom<&str> for RecurrenceType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidRecurrence(format!(
                "unknown recurrence type: {other}"
            ))),
        }
    }
}

/// Upper bound on the occurrences of one series (ten years of weekly
/// records).
pub const MAX_RECURRENCE_COUNT: u32 = 520;

/// Recurrence policy: cadence plus total number of occurrences, base
/// included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Recurrence {
    pub recurrence_type: RecurrenceType,
    count: NonZeroU32,
}

impl Recurrence {
    pub fn new(recurrence_type: RecurrenceType, count: u32) -> ResultEngine<Self> {
        let count = NonZeroU32::new(count).ok_or_else(|| {
            EngineError::InvalidRecurrence("recurrence_count must be > 0".to_string())
        })?;
        if count.get() > MAX_RECURRENCE_COUNT {
            return Err(EngineError::InvalidRecurrence(format!(
                "recurrence_count must be <= {MAX_RECURRENCE_COUNT}"
            )));
        }
        Ok(Self {
            recurrence_type,
            count,
        })
    }

    /// Build a policy from the three loose request fields.
    ///
    /// `is_recurring = false` requires both fields to be absent;
    /// `is_recurring = true` requires both to be present.
    pub fn from_parts(
        is_recurring: bool,
        recurrence_type: Option<RecurrenceType>,
        count: Option<u32>,
    ) -> ResultEngine<Option<Self>> {
        match (is_recurring, recurrence_type, count) {
            (false, None, None) => Ok(None),
            (false, _, _) => Err(EngineError::InvalidRecurrence(
                "recurrence_type and recurrence_count must be empty when is_recurring is false"
                    .to_string(),
            )),
            (true, Some(recurrence_type), Some(count)) => {
                Self::new(recurrence_type, count).map(Some)
            }
            (true, None, _) => Err(EngineError::InvalidRecurrence(
                "recurrence_type is required when is_recurring is true".to_string(),
            )),
            (true, Some(_), None) => Err(EngineError::InvalidRecurrence(
                "recurrence_count is required when is_recurring is true".to_string(),
            )),
        }
    }

    /// Total occurrences of the series, base included.
    pub fn count(self) -> u32 {
        self.count.get()
    }
}

/// Generate the siblings of `base` for `recurrence`.
///
/// Returns `count - 1` records (occurrences `1..count`); an empty vector when
/// `count == 1`. Owner, kind, category, amount, description and creation
/// timestamp are copied from `base`; every record gets a fresh id.
pub fn expand(base: &Transaction, recurrence: Recurrence) -> ResultEngine<Vec<Transaction>> {
    (1..recurrence.count())
        .map(|index| {
            let date = recurrence
                .recurrence_type
                .occurrence_date(base.date, index)
                .ok_or_else(|| {
                    EngineError::InvalidDate(format!(
                        "occurrence {index} of the series is out of the calendar range"
                    ))
                })?;
            Ok(Transaction {
                id: Uuid::new_v4(),
                user_id: base.user_id,
                kind: base.kind,
                category_id: base.category_id,
                amount: base.amount,
                description: base.description.clone(),
                date,
                created_at: base.created_at,
                recurrence: Some(recurrence),
            })
        })
        .collect()
}

/// Expand `base` according to its own recurrence and persist the siblings as
/// one atomic batch.
///
/// Non-recurring records produce no siblings and touch no storage.
pub async fn extend_series<S>(store: &S, base: &Transaction) -> ResultEngine<Vec<Transaction>>
where
    S: TransactionStore + Sync,
{
    let Some(recurrence) = base.recurrence else {
        return Ok(Vec::new());
    };

    let siblings = expand(base, recurrence)?;
    if siblings.is_empty() {
        return Ok(siblings);
    }

    store.save_batch(&siblings).await?;
    tracing::debug!(
        base_id = %base.id,
        generated = siblings.len(),
        cadence = recurrence.recurrence_type.as_str(),
        "recurring series extended"
    );
    Ok(siblings)
}
