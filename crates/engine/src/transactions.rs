//! Transaction primitives.
//!
//! Income and expense records share one shape and one table; the
//! [`TransactionKind`] discriminant tells them apart.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, Recurrence, RecurrenceType, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidKind(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub category_id: Option<Uuid>,
    pub amount: MoneyCents,
    pub description: String,
    /// Economic date of the record, distinct from `created_at`.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub recurrence: Option<Recurrence>,
}

impl Transaction {
    pub fn new(
        user_id: Uuid,
        kind: TransactionKind,
        category_id: Option<Uuid>,
        amount: MoneyCents,
        description: String,
        date: NaiveDate,
        recurrence: Option<Recurrence>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            category_id,
            amount: amount.positive_amount()?,
            description,
            date,
            created_at: Utc::now(),
            recurrence,
        })
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub description: String,
    pub date: Date,
    pub created_at: DateTimeUtc,
    pub is_recurring: bool,
    pub recurrence_type: Option<String>,
    pub recurrence_count: Option<i32>,
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
        on_delete = "SetNull"
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

impl TryFrom<&Transaction> for ActiveModel {
    type Error = EngineError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        let recurrence_count = tx
            .recurrence
            .map(|r| {
                i32::try_from(r.count()).map_err(|_| {
                    EngineError::InvalidRecurrence(format!(
                        "recurrence count {} does not fit the store",
                        r.count()
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category_id: ActiveValue::Set(tx.category_id),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            description: ActiveValue::Set(tx.description.clone()),
            date: ActiveValue::Set(tx.date),
            created_at: ActiveValue::Set(tx.created_at),
            is_recurring: ActiveValue::Set(tx.is_recurring()),
            recurrence_type: ActiveValue::Set(
                tx.recurrence
                    .map(|r| r.recurrence_type.as_str().to_string()),
            ),
            recurrence_count: ActiveValue::Set(recurrence_count),
        })
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let recurrence = match (model.is_recurring, model.recurrence_type, model.recurrence_count) {
            (false, None, None) => None,
            (true, Some(kind), Some(count)) => {
                let count = u32::try_from(count).map_err(|_| {
                    EngineError::InvalidRecurrence(format!("stored count {count} is negative"))
                })?;
                Some(Recurrence::new(
                    RecurrenceType::try_from(kind.as_str())?,
                    count,
                )?)
            }
            _ => {
                return Err(EngineError::InvalidRecurrence(format!(
                    "transaction {} has inconsistent recurrence fields",
                    model.id
                )));
            }
        };

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category_id: model.category_id,
            amount: MoneyCents::new(model.amount_minor),
            description: model.description,
            date: model.date,
            created_at: model.created_at,
            recurrence,
        })
    }
}
