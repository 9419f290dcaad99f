//! `LinkedEntry` primitives.
//!
//! A `LinkedEntry` is a receivable, payable, or installment commitment
//! hanging off exactly one primary transaction. It tracks partial
//! settlement over time through its `pending_amount_minor`; `status` is
//! always a pure function of pending relative to the settleable reference.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Paid on behalf of others, expect reimbursement of their share.
    SplitPayment,
    /// Lent money, expect payback.
    Loan,
    /// Borrowed money, must repay.
    Debt,
    /// Credit card installment plan, consumed by charges.
    Installment,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SplitPayment => "split_payment",
            Self::Loan => "loan",
            Self::Debt => "debt",
            Self::Installment => "installment",
        }
    }
}

impl TryFrom<&str> for LinkType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "split_payment" => Ok(Self::SplitPayment),
            "loan" => Ok(Self::Loan),
            "debt" => Ok(Self::Debt),
            "installment" => Ok(Self::Installment),
            other => Err(EngineError::InvalidLink(format!(
                "invalid link type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Pending,
    Partial,
    Settled,
}

impl LinkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Settled => "settled",
        }
    }
}

impl TryFrom<&str> for LinkStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "settled" => Ok(Self::Settled),
            other => Err(EngineError::InvalidLink(format!(
                "invalid link status: {other}"
            ))),
        }
    }
}

/// Status as a pure function of pending vs the settleable reference.
pub fn status_for(pending_minor: i64, reference_minor: i64) -> LinkStatus {
    if pending_minor == 0 {
        LinkStatus::Settled
    } else if pending_minor == reference_minor {
        LinkStatus::Pending
    } else {
        LinkStatus::Partial
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEntry {
    pub id: Uuid,
    pub link_type: LinkType,
    pub primary_transaction_id: Uuid,
    pub counterparty_name: String,
    pub total_amount_minor: i64,
    /// The user's own share; splits only.
    pub user_amount_minor: Option<i64>,
    pub pending_amount_minor: i64,
    pub status: LinkStatus,
    pub notes: Option<String>,
}

impl LinkedEntry {
    pub fn new(
        link_type: LinkType,
        primary_transaction_id: Uuid,
        counterparty_name: String,
        total_amount_minor: i64,
        user_amount_minor: Option<i64>,
        notes: Option<String>,
    ) -> ResultEngine<Self> {
        if total_amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "total_amount_minor must be > 0".to_string(),
            ));
        }
        match (link_type, user_amount_minor) {
            (LinkType::SplitPayment, Some(user)) => {
                if user <= 0 || user > total_amount_minor {
                    return Err(EngineError::InvalidAmount(
                        "user_amount_minor must be in (0, total]".to_string(),
                    ));
                }
            }
            (LinkType::SplitPayment, None) => {
                return Err(EngineError::InvalidLink(
                    "split payment requires user_amount_minor".to_string(),
                ));
            }
            (_, Some(_)) => {
                return Err(EngineError::InvalidLink(
                    "user_amount_minor is only valid for split payments".to_string(),
                ));
            }
            (_, None) => {}
        }

        let pending = total_amount_minor - user_amount_minor.unwrap_or(0);
        let mut entry = Self {
            id: Uuid::new_v4(),
            link_type,
            primary_transaction_id,
            counterparty_name,
            total_amount_minor,
            user_amount_minor,
            pending_amount_minor: pending,
            status: LinkStatus::Pending,
            notes,
        };
        entry.status = status_for(entry.pending_amount_minor, entry.settle_reference());
        Ok(entry)
    }

    /// The amount that can ever be settled against this entry: the others'
    /// share for splits, the full amount otherwise.
    pub fn settle_reference(&self) -> i64 {
        self.total_amount_minor - self.user_amount_minor.unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "linked_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub link_type: String,
    pub primary_transaction_id: String,
    pub counterparty_name: String,
    pub total_amount_minor: i64,
    pub user_amount_minor: Option<i64>,
    pub pending_amount_minor: i64,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::PrimaryTransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
    #[sea_orm(has_many = "super::linked_transactions::Entity")]
    LinkedTransactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::linked_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LinkedTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LinkedEntry> for ActiveModel {
    fn from(entry: &LinkedEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            link_type: ActiveValue::Set(entry.link_type.as_str().to_string()),
            primary_transaction_id: ActiveValue::Set(entry.primary_transaction_id.to_string()),
            counterparty_name: ActiveValue::Set(entry.counterparty_name.clone()),
            total_amount_minor: ActiveValue::Set(entry.total_amount_minor),
            user_amount_minor: ActiveValue::Set(entry.user_amount_minor),
            pending_amount_minor: ActiveValue::Set(entry.pending_amount_minor),
            status: ActiveValue::Set(entry.status.as_str().to_string()),
            notes: ActiveValue::Set(entry.notes.clone()),
        }
    }
}

impl TryFrom<Model> for LinkedEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("linked entry not exists".to_string()))?,
            link_type: LinkType::try_from(model.link_type.as_str())?,
            primary_transaction_id: Uuid::parse_str(&model.primary_transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            counterparty_name: model.counterparty_name,
            total_amount_minor: model.total_amount_minor,
            user_amount_minor: model.user_amount_minor,
            pending_amount_minor: model.pending_amount_minor,
            status: LinkStatus::try_from(model.status.as_str())?,
            notes: model.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_pending() {
        assert_eq!(status_for(1500, 1500), LinkStatus::Pending);
        assert_eq!(status_for(700, 1500), LinkStatus::Partial);
        assert_eq!(status_for(0, 1500), LinkStatus::Settled);
        assert_eq!(status_for(0, 0), LinkStatus::Settled);
    }

    #[test]
    fn split_pending_excludes_user_share() {
        let entry = LinkedEntry::new(
            LinkType::SplitPayment,
            Uuid::new_v4(),
            String::from("Bob"),
            3000,
            Some(1500),
            None,
        )
        .unwrap();
        assert_eq!(entry.pending_amount_minor, 1500);
        assert_eq!(entry.settle_reference(), 1500);
        assert_eq!(entry.status, LinkStatus::Pending);
    }

    #[test]
    fn loan_pending_is_full_amount() {
        let entry = LinkedEntry::new(
            LinkType::Loan,
            Uuid::new_v4(),
            String::from("Carol"),
            5000,
            None,
            Some(String::from("until March")),
        )
        .unwrap();
        assert_eq!(entry.pending_amount_minor, 5000);
        assert_eq!(entry.settle_reference(), 5000);
    }

    #[test]
    fn split_requires_user_amount_in_range() {
        let err = LinkedEntry::new(
            LinkType::SplitPayment,
            Uuid::new_v4(),
            String::from("Bob"),
            3000,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLink(_)));

        let err = LinkedEntry::new(
            LinkType::SplitPayment,
            Uuid::new_v4(),
            String::from("Bob"),
            3000,
            Some(3001),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn user_amount_rejected_outside_splits() {
        let err = LinkedEntry::new(
            LinkType::Debt,
            Uuid::new_v4(),
            String::from("Dave"),
            2000,
            Some(100),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLink(_)));
    }
}
