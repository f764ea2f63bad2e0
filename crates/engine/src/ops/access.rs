//! Owner-scoped lookups.
//!
//! Rows of another user are reported exactly like missing rows, so callers
//! cannot discover ids they do not own.

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, TransactionKind, budgets, categories, transactions, users,
};

use super::Engine;

/// Generates a `require_*` method loading an entity by id, scoped to its
/// owner.
macro_rules! impl_owned_lookup {
    ($require_fn:ident, $entity:path, $model:path, $user_col:expr, $err_msg:literal) => {
        pub(super) async fn $require_fn<C>(
            &self,
            db: &C,
            user_id: Uuid,
            target_id: Uuid,
        ) -> ResultEngine<$model>
        where
            C: ConnectionTrait,
        {
            <$entity>::find_by_id(target_id)
                .filter($user_col.eq(user_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_owned_lookup!(
        require_category,
        categories::Entity,
        categories::Model,
        categories::Column::UserId,
        "category not exists"
    );

    impl_owned_lookup!(
        require_budget,
        budgets::Entity,
        budgets::Model,
        budgets::Column::UserId,
        "budget not exists"
    );

    pub(super) async fn require_transaction<C>(
        &self,
        db: &C,
        user_id: Uuid,
        kind: TransactionKind,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model>
    where
        C: ConnectionTrait,
    {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("{} not exists", kind.as_str())))
    }

    pub(super) async fn require_user<C>(&self, db: &C, user_id: Uuid) -> ResultEngine<users::Model>
    where
        C: ConnectionTrait,
    {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Ensure `category_id` (if any) belongs to `user_id`.
    pub(super) async fn require_optional_category<C>(
        &self,
        db: &C,
        user_id: Uuid,
        category_id: Option<Uuid>,
    ) -> ResultEngine<()>
    where
        C: ConnectionTrait,
    {
        if let Some(category_id) = category_id {
            self.require_category(db, user_id, category_id).await?;
        }
        Ok(())
    }
}
