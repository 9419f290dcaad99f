//! Join rows tying a settling transaction to its `LinkedEntry`.
//!
//! The settled amount is never stored here; it is the referenced
//! transaction's amount. `transaction_id` is unique, so a transaction can
//! settle at most one entry.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTransaction {
    pub id: Uuid,
    pub linked_entry_id: Uuid,
    pub transaction_id: Uuid,
}

impl LinkedTransaction {
    pub fn new(linked_entry_id: Uuid, transaction_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            linked_entry_id,
            transaction_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "linked_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub linked_entry_id: String,
    pub transaction_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::linked_entries::Entity",
        from = "Column::LinkedEntryId",
        to = "super::linked_entries::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    LinkedEntries,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
}

impl Related<super::linked_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LinkedEntries.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LinkedTransaction> for ActiveModel {
    fn from(link: &LinkedTransaction) -> Self {
        Self {
            id: ActiveValue::Set(link.id.to_string()),
            linked_entry_id: ActiveValue::Set(link.linked_entry_id.to_string()),
            transaction_id: ActiveValue::Set(link.transaction_id.to_string()),
        }
    }
}

impl TryFrom<Model> for LinkedTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| {
                EngineError::KeyNotFound("linked transaction not exists".to_string())
            })?,
            linked_entry_id: Uuid::parse_str(&model.linked_entry_id)
                .map_err(|_| EngineError::KeyNotFound("linked entry not exists".to_string()))?,
            transaction_id: Uuid::parse_str(&model.transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
        })
    }
}
