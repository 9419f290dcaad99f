//! The module contains `Wallet` struct and its implementation.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// Cash, bank account, e-wallet. Balance is inflow minus outflow.
    Normal,
    /// Credit card. Balance is outflow minus inflow (positive = debt) and
    /// a credit limit bounds available spending.
    Credit,
}

impl WalletKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for WalletKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "normal" => Ok(Self::Normal),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid wallet kind: {other}"
            ))),
        }
    }
}

/// A wallet.
///
/// A representation of a real place money sits: a physical wallet, a bank
/// account, or a credit card. Balances are never stored on the wallet;
/// they are derived from the ledger via the snapshot cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Stable identifier, generated once and persisted, so the wallet can
    /// be renamed without breaking references.
    pub id: Uuid,
    pub name: String,
    pub kind: WalletKind,
    pub credit_limit_minor: i64,
}

impl Wallet {
    pub fn new(name: String, kind: WalletKind, credit_limit_minor: i64) -> ResultEngine<Self> {
        if credit_limit_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "credit_limit_minor must be >= 0".to_string(),
            ));
        }
        if kind == WalletKind::Normal && credit_limit_minor != 0 {
            return Err(EngineError::InvalidAmount(
                "credit_limit_minor requires a credit wallet".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            kind,
            credit_limit_minor,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub credit_limit_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::snapshots::Entity")]
    Snapshots,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            credit_limit_minor: ActiveValue::Set(value.credit_limit_minor),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("wallet not exists".to_string()))?,
            name: model.name,
            kind: WalletKind::try_from(model.kind.as_str())?,
            credit_limit_minor: model.credit_limit_minor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_credit_wallet() {
        let wallet = Wallet::new(String::from("Visa"), WalletKind::Credit, 50_000_00).unwrap();
        assert_eq!(wallet.kind, WalletKind::Credit);
        assert_eq!(wallet.credit_limit_minor, 50_000_00);
    }

    #[test]
    fn normal_wallet_rejects_credit_limit() {
        let err = Wallet::new(String::from("Cash"), WalletKind::Normal, 1000).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn negative_credit_limit_rejected() {
        let err = Wallet::new(String::from("Visa"), WalletKind::Credit, -1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}
