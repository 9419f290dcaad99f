//! Cached end-of-day wallet balances.
//!
//! A snapshot stores the inclusive balance of its wallet at the end of
//! `snapshot_date`. Reads start from the newest snapshot at or before the
//! requested date and only scan transactions after it; any historical edit
//! deletes every snapshot from the edited date onwards.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub snapshot_date: NaiveDate,
    pub balance_minor: i64,
}

impl WalletSnapshot {
    pub fn new(wallet_id: Uuid, snapshot_date: NaiveDate, balance_minor: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            snapshot_date,
            balance_minor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallet_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub snapshot_date: Date,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&WalletSnapshot> for ActiveModel {
    fn from(snapshot: &WalletSnapshot) -> Self {
        Self {
            id: ActiveValue::Set(snapshot.id.to_string()),
            wallet_id: ActiveValue::Set(snapshot.wallet_id.to_string()),
            snapshot_date: ActiveValue::Set(snapshot.snapshot_date),
            balance_minor: ActiveValue::Set(snapshot.balance_minor),
        }
    }
}

impl TryFrom<Model> for WalletSnapshot {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("snapshot not exists".to_string()))?,
            wallet_id: Uuid::parse_str(&model.wallet_id)
                .map_err(|_| EngineError::KeyNotFound("wallet not exists".to_string()))?,
            snapshot_date: model.snapshot_date,
            balance_minor: model.balance_minor,
        })
    }
}
