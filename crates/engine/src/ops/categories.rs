use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Category, CategoryUpdateCmd, EngineError, NewCategoryCmd, ResultEngine, TransactionKind,
    budgets, categories, transactions,
    util::{normalize_category_name, normalize_optional_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Fail with [`EngineError::ExistingKey`] if `user_id` already owns a
    /// category named `name` of `kind` (other than `except`).
    async fn ensure_unique_category<C>(
        &self,
        db: &C,
        user_id: Uuid,
        name: &str,
        kind: TransactionKind,
        except: Option<Uuid>,
    ) -> ResultEngine<()>
    where
        C: ConnectionTrait,
    {
        let mut query = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::Name.eq(name))
            .filter(categories::Column::Kind.eq(kind.as_str()));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(format!(
                "{} category '{name}'",
                kind.as_str()
            )));
        }
        Ok(())
    }

    /// List the categories of `user_id`, newest first.
    pub async fn list_categories(&self, user_id: Uuid) -> ResultEngine<Vec<Category>> {
        categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_desc(categories::Column::CreatedAt)
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    pub async fn category(&self, user_id: Uuid, category_id: Uuid) -> ResultEngine<Category> {
        let model = self
            .require_category(&self.database, user_id, category_id)
            .await?;
        Category::try_from(model)
    }

    pub async fn create_category(&self, user_id: Uuid, cmd: NewCategoryCmd) -> ResultEngine<Category> {
        let name = normalize_category_name(&cmd.name)?;
        let description = normalize_optional_text(cmd.description.as_deref());

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.ensure_unique_category(&db_tx, user_id, &name, cmd.kind, None)
                .await?;

            let category = Category {
                id: Uuid::new_v4(),
                user_id,
                name: name.clone(),
                kind: cmd.kind,
                description: description.clone(),
                created_at: Utc::now(),
            };
            categories::ActiveModel::from(&category)
                .insert(&db_tx)
                .await?;
            Ok(category)
        })
    }

    pub async fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        cmd: CategoryUpdateCmd,
    ) -> ResultEngine<Category> {
        let name = cmd.name.as_deref().map(normalize_category_name).transpose()?;

        with_tx!(self, |db_tx| {
            let current = Category::try_from(
                self.require_category(&db_tx, user_id, category_id).await?,
            )?;
            let name = name.unwrap_or_else(|| current.name.clone());
            let kind = cmd.kind.unwrap_or(current.kind);
            if name != current.name || kind != current.kind {
                self.ensure_unique_category(&db_tx, user_id, &name, kind, Some(category_id))
                    .await?;
            }

            let description = match cmd.description {
                Some(description) => normalize_optional_text(description.as_deref()),
                None => current.description.clone(),
            };

            let active = categories::ActiveModel {
                id: ActiveValue::Unchanged(category_id),
                name: ActiveValue::Set(name),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                description: ActiveValue::Set(description),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Category::try_from(model)
        })
    }

    /// Delete a category.
    ///
    /// Transactions of the category are kept with no category; budgets of
    /// the category are deleted with it.
    pub async fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, user_id, category_id).await?;

            transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::CategoryId,
                    Expr::value(Option::<Uuid>::None),
                )
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(transactions::Column::CategoryId.eq(category_id))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_many()
                .filter(budgets::Column::UserId.eq(user_id))
                .filter(budgets::Column::CategoryId.eq(category_id))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_by_id(category_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
