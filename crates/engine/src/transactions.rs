//! Transaction primitives.
//!
//! A `Transaction` is a single dated ledger row. Its `amount_minor` is
//! always positive; meaning and sign come from `Direction` plus
//! `Classification`, never from a negative amount.

use chrono::{NaiveDate, NaiveTime};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    classify::{Classification, Direction, is_valid_pair},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub direction: Direction,
    pub amount_minor: i64,
    pub classification: Classification,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub paired_transaction_id: Option<Uuid>,
    pub is_ignored: bool,
    pub is_calibration: bool,
}

impl Transaction {
    pub fn new(
        wallet_id: Uuid,
        date: NaiveDate,
        time: Option<NaiveTime>,
        direction: Direction,
        amount_minor: i64,
        classification: Classification,
        description: String,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if !is_valid_pair(direction, classification) {
            return Err(EngineError::InvalidClassification(format!(
                "{} cannot be {}",
                direction.as_str(),
                classification.as_str()
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            wallet_id,
            date,
            time,
            direction,
            amount_minor,
            classification,
            description,
            category_id: None,
            subcategory_id: None,
            paired_transaction_id: None,
            is_ignored: false,
            is_calibration: false,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub date: Date,
    pub time: Option<Time>,
    pub direction: String,
    pub amount_minor: i64,
    pub classification: String,
    pub description: String,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub paired_transaction_id: Option<String>,
    pub is_ignored: bool,
    pub is_calibration: bool,
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
    #[sea_orm(has_many = "super::linked_transactions::Entity")]
    LinkedTransactions,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl Related<super::linked_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LinkedTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            date: ActiveValue::Set(tx.date),
            time: ActiveValue::Set(tx.time),
            direction: ActiveValue::Set(tx.direction.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            classification: ActiveValue::Set(tx.classification.as_str().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            subcategory_id: ActiveValue::Set(tx.subcategory_id.map(|id| id.to_string())),
            paired_transaction_id: ActiveValue::Set(
                tx.paired_transaction_id.map(|id| id.to_string()),
            ),
            is_ignored: ActiveValue::Set(tx.is_ignored),
            is_calibration: ActiveValue::Set(tx.is_calibration),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            wallet_id: Uuid::parse_str(&model.wallet_id)
                .map_err(|_| EngineError::KeyNotFound("wallet not exists".to_string()))?,
            date: model.date,
            time: model.time,
            direction: Direction::try_from(model.direction.as_str())?,
            amount_minor: model.amount_minor,
            classification: Classification::try_from(model.classification.as_str())?,
            description: model.description,
            category_id: model.category_id.and_then(|s| Uuid::parse_str(&s).ok()),
            subcategory_id: model.subcategory_id.and_then(|s| Uuid::parse_str(&s).ok()),
            paired_transaction_id: model
                .paired_transaction_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            is_ignored: model.is_ignored,
            is_calibration: model.is_calibration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_amount_and_pair() {
        let wallet_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let err = Transaction::new(
            wallet_id,
            date,
            None,
            Direction::Outflow,
            0,
            Classification::Expense,
            String::from("lunch"),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));

        let err = Transaction::new(
            wallet_id,
            date,
            None,
            Direction::Inflow,
            1000,
            Classification::Expense,
            String::from("lunch"),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidClassification(_)));

        let tx = Transaction::new(
            wallet_id,
            date,
            None,
            Direction::Outflow,
            1000,
            Classification::Expense,
            String::from("lunch"),
        )
        .unwrap();
        assert!(!tx.is_ignored);
        assert!(!tx.is_calibration);
    }
}
