//! Settlement engine: the `LinkedEntry` lifecycle.
//!
//! Marking a transaction as split/loan/debt/installment creates the entry
//! and reclassifies the primary through the transition table. Linking
//! settles against the entry's pending amount; unlink and unclassify walk
//! the same table backwards. Every operation is one store transaction.

use std::collections::HashSet;

use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, JoinType, QueryFilter, QuerySelect, TransactionTrait,
    prelude::*,
};
use tracing::info;

use crate::{
    EngineError, LinkStatus, LinkType, LinkedEntry, LinkedTransaction, ResultEngine,
    classify::{self, Classification, Direction, TransitionOp},
    linked_entries::{self, status_for},
    linked_transactions, transactions,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

/// Filters for listing linked entries.
#[derive(Clone, Debug, Default)]
pub struct LinkedEntryFilter {
    pub link_type: Option<LinkType>,
    pub status: Option<LinkStatus>,
    pub counterparty: Option<String>,
}

/// The transition that settles an entry of this type.
fn settle_op(link_type: LinkType) -> TransitionOp {
    match link_type {
        LinkType::SplitPayment | LinkType::Loan => TransitionOp::SettleReceivable,
        LinkType::Debt => TransitionOp::SettlePayable,
        LinkType::Installment => TransitionOp::SettleInstallment,
    }
}

/// The direction a settling transaction must have.
fn settle_direction(link_type: LinkType) -> Direction {
    match link_type {
        LinkType::SplitPayment | LinkType::Loan => Direction::Inflow,
        LinkType::Debt | LinkType::Installment => Direction::Outflow,
    }
}

/// The classification a settled transaction carries.
fn settle_target(link_type: LinkType) -> Classification {
    match link_type {
        LinkType::SplitPayment | LinkType::Loan => Classification::DebtCollection,
        LinkType::Debt => Classification::LoanRepayment,
        LinkType::Installment => Classification::InstallmentCharge,
    }
}

impl Engine {
    /// Rewrite a transaction's classification (and direction, when the
    /// transition changes the physical flow too).
    pub(super) async fn set_classification(
        &self,
        db_tx: &DatabaseTransaction,
        tx_id: Uuid,
        classification: Classification,
        direction: Option<Direction>,
    ) -> ResultEngine<()> {
        let active = transactions::ActiveModel {
            id: ActiveValue::Set(tx_id.to_string()),
            classification: ActiveValue::Set(classification.as_str().to_string()),
            direction: match direction {
                Some(direction) => ActiveValue::Set(direction.as_str().to_string()),
                None => ActiveValue::NotSet,
            },
            ..Default::default()
        };
        active.update(db_tx).await?;
        Ok(())
    }

    pub(super) async fn update_entry_pending(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LinkedEntry,
    ) -> ResultEngine<()> {
        let active = linked_entries::ActiveModel {
            id: ActiveValue::Set(entry.id.to_string()),
            pending_amount_minor: ActiveValue::Set(entry.pending_amount_minor),
            status: ActiveValue::Set(entry.status.as_str().to_string()),
            ..Default::default()
        };
        active.update(db_tx).await?;
        Ok(())
    }

    async fn mark_primary(
        &self,
        tx_id: Uuid,
        op: TransitionOp,
        link_type: LinkType,
        user_amount_minor: Option<i64>,
        counterparty: &str,
        notes: Option<&str>,
    ) -> ResultEngine<LinkedEntry> {
        let counterparty = normalize_required_name(counterparty, "counterparty")?;
        let notes = normalize_optional_text(notes);
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            if self.entry_for_primary(&db_tx, tx.id).await?.is_some() {
                return Err(EngineError::ExistingKey(
                    "linked entry for transaction".to_string(),
                ));
            }
            if self.link_for_transaction(&db_tx, tx.id).await?.is_some() {
                return Err(EngineError::InvalidLink(
                    "transaction already settles another entry".to_string(),
                ));
            }

            let (classification, direction) = classify::transition(tx.classification, op)?;
            let entry = LinkedEntry::new(
                link_type,
                tx.id,
                counterparty,
                tx.amount_minor,
                user_amount_minor,
                notes,
            )?;

            self.set_classification(&db_tx, tx.id, classification, direction)
                .await?;
            linked_entries::ActiveModel::from(&entry)
                .insert(&db_tx)
                .await?;
            self.invalidate_snapshots(&db_tx, tx.wallet_id, tx.date)
                .await?;

            info!(
                entry = %entry.id,
                primary = %tx.id,
                link_type = link_type.as_str(),
                pending = entry.pending_amount_minor,
                "created linked entry"
            );
            Ok(entry)
        })
    }

    /// Mark an expense as paid on behalf of others; `user_amount_minor` is
    /// the user's own share, the rest becomes the pending receivable.
    pub async fn mark_as_split(
        &self,
        tx_id: Uuid,
        user_amount_minor: i64,
        counterparty: &str,
        notes: Option<&str>,
    ) -> ResultEngine<LinkedEntry> {
        self.mark_primary(
            tx_id,
            TransitionOp::MarkSplit,
            LinkType::SplitPayment,
            Some(user_amount_minor),
            counterparty,
            notes,
        )
        .await
    }

    /// Mark an expense as money lent out.
    pub async fn mark_as_loan(
        &self,
        tx_id: Uuid,
        counterparty: &str,
        notes: Option<&str>,
    ) -> ResultEngine<LinkedEntry> {
        self.mark_primary(
            tx_id,
            TransitionOp::MarkLoan,
            LinkType::Loan,
            None,
            counterparty,
            notes,
        )
        .await
    }

    /// Mark an income as money borrowed.
    pub async fn mark_as_debt(
        &self,
        tx_id: Uuid,
        counterparty: &str,
        notes: Option<&str>,
    ) -> ResultEngine<LinkedEntry> {
        self.mark_primary(
            tx_id,
            TransitionOp::MarkDebt,
            LinkType::Debt,
            None,
            counterparty,
            notes,
        )
        .await
    }

    /// Mark an expense as a credit card installment plan.
    ///
    /// The primary's direction flips to `Reserved`: the commitment leaves
    /// the wallet balance until actual charges are linked against it.
    pub async fn mark_as_installment(
        &self,
        tx_id: Uuid,
        counterparty: &str,
        notes: Option<&str>,
    ) -> ResultEngine<LinkedEntry> {
        self.mark_primary(
            tx_id,
            TransitionOp::MarkInstallment,
            LinkType::Installment,
            None,
            counterparty,
            notes,
        )
        .await
    }

    /// Link transactions to an entry, settling part or all of its pending
    /// amount. All-or-nothing across the batch.
    pub async fn link_transactions(
        &self,
        entry_id: Uuid,
        tx_ids: &[Uuid],
    ) -> ResultEngine<LinkedEntry> {
        if tx_ids.is_empty() {
            return Err(EngineError::InvalidLink(
                "no transactions to link".to_string(),
            ));
        }
        let unique: HashSet<Uuid> = tx_ids.iter().copied().collect();
        if unique.len() != tx_ids.len() {
            return Err(EngineError::InvalidLink(
                "duplicate transaction in batch".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut entry = self.require_entry(&db_tx, entry_id).await?;
            if entry.status == LinkStatus::Settled {
                return Err(EngineError::InvalidLink(
                    "entry already settled".to_string(),
                ));
            }

            let op = settle_op(entry.link_type);
            let direction = settle_direction(entry.link_type);
            let target = settle_target(entry.link_type);

            let mut candidates = Vec::with_capacity(tx_ids.len());
            let mut sum = 0;
            for &tx_id in tx_ids {
                let tx = self.require_transaction(&db_tx, tx_id).await?;
                if tx.id == entry.primary_transaction_id {
                    return Err(EngineError::InvalidLink(
                        "cannot link an entry's own primary".to_string(),
                    ));
                }
                if self.is_entry_involved(&db_tx, tx.id).await? {
                    return Err(EngineError::InvalidLink(
                        "transaction already linked".to_string(),
                    ));
                }
                if tx.direction != direction {
                    return Err(EngineError::InvalidLink(format!(
                        "settling a {} requires {}",
                        entry.link_type.as_str(),
                        direction.as_str()
                    )));
                }
                sum += tx.amount_minor;
                candidates.push(tx);
            }
            if sum > entry.pending_amount_minor {
                return Err(EngineError::InvalidLink(format!(
                    "linked amount {sum} exceeds pending {}",
                    entry.pending_amount_minor
                )));
            }

            for tx in &candidates {
                if tx.classification != target {
                    let (classification, direction) = classify::transition(tx.classification, op)?;
                    self.set_classification(&db_tx, tx.id, classification, direction)
                        .await?;
                }
                let link = LinkedTransaction::new(entry.id, tx.id);
                linked_transactions::ActiveModel::from(&link)
                    .insert(&db_tx)
                    .await?;
                self.invalidate_snapshots(&db_tx, tx.wallet_id, tx.date)
                    .await?;
            }

            entry.pending_amount_minor -= sum;
            entry.status = status_for(entry.pending_amount_minor, entry.settle_reference());
            self.update_entry_pending(&db_tx, &entry).await?;

            info!(
                entry = %entry.id,
                linked = candidates.len(),
                settled = sum,
                pending = entry.pending_amount_minor,
                "linked transactions"
            );
            Ok(entry)
        })
    }

    /// Detach one settling transaction: restore its plain classification,
    /// give its amount back to the entry's pending.
    pub async fn unlink_transaction(&self, tx_id: Uuid) -> ResultEngine<LinkedEntry> {
        with_tx!(self, |db_tx| {
            let link = self
                .link_for_transaction(&db_tx, tx_id)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("linked transaction not exists".to_string())
                })?;
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            let mut entry = self.require_entry(&db_tx, link.linked_entry_id).await?;

            let (classification, direction) =
                classify::transition(tx.classification, TransitionOp::Unlink)?;
            self.set_classification(&db_tx, tx.id, classification, direction)
                .await?;

            linked_transactions::Entity::delete_by_id(link.id.to_string())
                .exec(&db_tx)
                .await?;

            entry.pending_amount_minor += tx.amount_minor;
            entry.status = status_for(entry.pending_amount_minor, entry.settle_reference());
            self.update_entry_pending(&db_tx, &entry).await?;
            self.invalidate_snapshots(&db_tx, tx.wallet_id, tx.date)
                .await?;

            Ok(entry)
        })
    }

    /// Destroy the entry owned by a primary transaction, reverting the
    /// primary and every transaction that settled against it to plain
    /// Income/Expense. Nothing stays in a settlement classification once
    /// its justifying entry is gone.
    pub async fn unclassify_transaction(&self, tx_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            let entry = self
                .entry_for_primary(&db_tx, tx.id)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("linked entry not exists".to_string())
                })?;

            self.unlink_all_for_entry(&db_tx, &entry).await?;

            linked_entries::Entity::delete_by_id(entry.id.to_string())
                .exec(&db_tx)
                .await?;

            let (classification, direction) =
                classify::transition(tx.classification, TransitionOp::Unclassify)?;
            self.set_classification(&db_tx, tx.id, classification, direction)
                .await?;
            self.invalidate_snapshots(&db_tx, tx.wallet_id, tx.date)
                .await?;

            info!(entry = %entry.id, primary = %tx.id, "unclassified entry");
            Ok(())
        })
    }

    /// Revert every settling transaction of an entry and delete the join
    /// rows. The entry row itself is left to the caller.
    pub(super) async fn unlink_all_for_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LinkedEntry,
    ) -> ResultEngine<()> {
        let links = linked_transactions::Entity::find()
            .filter(linked_transactions::Column::LinkedEntryId.eq(entry.id.to_string()))
            .all(db_tx)
            .await?;
        for link_model in links {
            let link = LinkedTransaction::try_from(link_model)?;
            let linked_tx = self.require_transaction(db_tx, link.transaction_id).await?;
            let (classification, direction) =
                classify::transition(linked_tx.classification, TransitionOp::Unlink)?;
            self.set_classification(db_tx, linked_tx.id, classification, direction)
                .await?;
            self.invalidate_snapshots(db_tx, linked_tx.wallet_id, linked_tx.date)
                .await?;
            linked_transactions::Entity::delete_by_id(link.id.to_string())
                .exec(db_tx)
                .await?;
        }
        Ok(())
    }

    /// Return a linked entry by id.
    pub async fn linked_entry(&self, entry_id: Uuid) -> ResultEngine<LinkedEntry> {
        with_tx!(self, |db_tx| self.require_entry(&db_tx, entry_id).await)
    }

    /// List linked entries, optionally filtered by type, status, and
    /// counterparty.
    pub async fn linked_entries(
        &self,
        filter: &LinkedEntryFilter,
    ) -> ResultEngine<Vec<LinkedEntry>> {
        with_tx!(self, |db_tx| {
            let mut query = linked_entries::Entity::find();
            if let Some(link_type) = filter.link_type {
                query = query.filter(linked_entries::Column::LinkType.eq(link_type.as_str()));
            }
            if let Some(status) = filter.status {
                query = query.filter(linked_entries::Column::Status.eq(status.as_str()));
            }
            if let Some(counterparty) = &filter.counterparty {
                query = query
                    .filter(linked_entries::Column::CounterpartyName.eq(counterparty.clone()));
            }

            let mut out = Vec::new();
            for model in query.all(&db_tx).await? {
                out.push(LinkedEntry::try_from(model)?);
            }
            Ok(out)
        })
    }

    /// Still owed to the user: pending over splits and loans.
    pub async fn total_owed(&self) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| self.total_owed_in_tx(&db_tx).await)
    }

    /// Still owed by the user: pending over debts.
    pub async fn total_debt(&self) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| self.total_debt_in_tx(&db_tx).await)
    }

    /// Unconsumed installment commitments, optionally for one wallet.
    pub async fn pending_installments(&self, wallet_id: Option<Uuid>) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            self.pending_installments_in_tx(&db_tx, wallet_id).await
        })
    }

    pub(super) async fn total_owed_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<i64> {
        self.sum_pending(
            db_tx,
            &[LinkType::SplitPayment, LinkType::Loan],
            None,
        )
        .await
    }

    pub(super) async fn total_debt_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<i64> {
        self.sum_pending(db_tx, &[LinkType::Debt], None).await
    }

    pub(super) async fn pending_installments_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Option<Uuid>,
    ) -> ResultEngine<i64> {
        self.sum_pending(db_tx, &[LinkType::Installment], wallet_id)
            .await
    }

    async fn sum_pending(
        &self,
        db_tx: &DatabaseTransaction,
        link_types: &[LinkType],
        wallet_id: Option<Uuid>,
    ) -> ResultEngine<i64> {
        let types: Vec<&str> = link_types.iter().map(|t| t.as_str()).collect();
        let mut query = linked_entries::Entity::find()
            .filter(linked_entries::Column::LinkType.is_in(types));
        if let Some(wallet_id) = wallet_id {
            // The wallet lives on the primary transaction.
            query = query
                .join(JoinType::InnerJoin, linked_entries::Relation::Transactions.def())
                .filter(transactions::Column::WalletId.eq(wallet_id.to_string()));
        }

        let mut sum = 0;
        for model in query.all(db_tx).await? {
            sum += model.pending_amount_minor;
        }
        Ok(sum)
    }
}
