//! Category, subcategory, and budget reference data.

use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

use crate::{
    Budget, Category, EngineError, ResultEngine, Subcategory, budgets, categories, subcategories,
    transactions,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Add a new category. Names are unique, case-insensitively.
    pub async fn new_category(&self, name: &str) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "category")?;
        with_tx!(self, |db_tx| {
            let exists = categories::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let category = Category {
                id: Uuid::new_v4(),
                name,
            };
            categories::ActiveModel::from(&category).insert(&db_tx).await?;
            Ok(category.id)
        })
    }

    /// List every category.
    pub async fn list_categories(&self) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            let mut out = Vec::new();
            for model in categories::Entity::find().all(&db_tx).await? {
                out.push(Category::try_from(model)?);
            }
            Ok(out)
        })
    }

    /// Delete a category together with its subcategories and budgets.
    /// Rejected while any transaction still references it.
    pub async fn delete_category(&self, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let category = self.require_category(&db_tx, category_id).await?;

            let used = transactions::Entity::find()
                .filter(transactions::Column::CategoryId.eq(category_id.to_string()))
                .count(&db_tx)
                .await?;
            if used > 0 {
                return Err(EngineError::InvalidAmount(format!(
                    "category '{}' still has {used} transactions",
                    category.name
                )));
            }

            budgets::Entity::delete_many()
                .filter(budgets::Column::CategoryId.eq(category_id.to_string()))
                .exec(&db_tx)
                .await?;
            subcategories::Entity::delete_many()
                .filter(subcategories::Column::CategoryId.eq(category_id.to_string()))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_by_id(category_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Add a subcategory under a category. Names are unique within the
    /// category, case-insensitively.
    pub async fn new_subcategory(&self, category_id: Uuid, name: &str) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "subcategory")?;
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;

            let exists = subcategories::Entity::find()
                .filter(subcategories::Column::CategoryId.eq(category_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let subcategory = Subcategory {
                id: Uuid::new_v4(),
                category_id,
                name,
            };
            subcategories::ActiveModel::from(&subcategory)
                .insert(&db_tx)
                .await?;
            Ok(subcategory.id)
        })
    }

    /// List the subcategories of a category.
    pub async fn list_subcategories(&self, category_id: Uuid) -> ResultEngine<Vec<Subcategory>> {
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;
            let mut out = Vec::new();
            for model in subcategories::Entity::find()
                .filter(subcategories::Column::CategoryId.eq(category_id.to_string()))
                .all(&db_tx)
                .await?
            {
                out.push(Subcategory::try_from(model)?);
            }
            Ok(out)
        })
    }

    /// Create or replace the budget for `(category, year, month)`.
    pub async fn set_budget(
        &self,
        category_id: Uuid,
        year: i32,
        month: u32,
        amount_minor: i64,
    ) -> ResultEngine<Uuid> {
        let budget = Budget::new(category_id, year, month, amount_minor)?;
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;

            let existing = budgets::Entity::find()
                .filter(budgets::Column::CategoryId.eq(category_id.to_string()))
                .filter(budgets::Column::Year.eq(year))
                .filter(budgets::Column::Month.eq(month as i32))
                .one(&db_tx)
                .await?;
            if let Some(existing) = existing {
                let active = budgets::ActiveModel {
                    id: ActiveValue::Set(existing.id.clone()),
                    amount_minor: ActiveValue::Set(amount_minor),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                crate::util::parse_uuid(&existing.id, "budget")
            } else {
                budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
                info!(
                    category = %category_id,
                    year,
                    month,
                    amount = amount_minor,
                    "created budget"
                );
                Ok(budget.id)
            }
        })
    }

    /// Remove the budget for `(category, year, month)`, if present.
    pub async fn delete_budget(&self, category_id: Uuid, year: i32, month: u32) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;
            budgets::Entity::delete_many()
                .filter(budgets::Column::CategoryId.eq(category_id.to_string()))
                .filter(budgets::Column::Year.eq(year))
                .filter(budgets::Column::Month.eq(month as i32))
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
