//! Transaction writes: create, update, delete (with cascade), ignore
//! flags, and reclassification.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::info;

use crate::{
    EngineError, ResultEngine, Transaction,
    classify::{self, Classification, Direction},
    linked_entries::status_for,
    linked_transactions, transactions,
};

use super::super::{Engine, with_tx};

/// Input for [`Engine::create_transaction`].
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub wallet_id: Uuid,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub direction: Direction,
    pub amount_minor: i64,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub is_ignored: bool,
}

/// Field edits for [`Engine::update_transaction`]. An outer `None`
/// leaves a field untouched; for the nullable fields, `Some(None)`
/// clears the stored value.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub date: Option<NaiveDate>,
    pub time: Option<Option<NaiveTime>>,
    pub amount_minor: Option<i64>,
    pub description: Option<String>,
    pub category_id: Option<Option<Uuid>>,
    pub subcategory_id: Option<Option<Uuid>>,
}

impl Engine {
    /// Create a plain Expense/Income transaction. Settlement
    /// classifications only exist via the mark operations, transfers via
    /// [`Engine::transfer`].
    pub async fn create_transaction(
        &self,
        new: &NewTransaction,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<Uuid> {
        let classification = classify::plain_classification(new.direction)?;
        with_tx!(self, |db_tx| {
            self.require_wallet(&db_tx, new.wallet_id).await?;
            if let Some(category_id) = new.category_id {
                self.require_category(&db_tx, category_id).await?;
            }
            if let Some(subcategory_id) = new.subcategory_id {
                let subcategory = self.require_subcategory(&db_tx, subcategory_id).await?;
                if new.category_id != Some(subcategory.category_id) {
                    return Err(EngineError::InvalidAmount(
                        "subcategory does not belong to the category".to_string(),
                    ));
                }
            }

            let mut tx = Transaction::new(
                new.wallet_id,
                new.date,
                new.time,
                new.direction,
                new.amount_minor,
                classification,
                new.description.clone(),
            )?;
            tx.category_id = new.category_id;
            tx.subcategory_id = new.subcategory_id;
            tx.is_ignored = new.is_ignored;

            self.invalidate_guarded(&db_tx, new.wallet_id, new.date, today, allow_rebuild)
                .await?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx.id)
        })
    }

    /// Edit a transaction's fields.
    ///
    /// Amount edits are rejected while the transaction participates in a
    /// settlement entry; unlink or unclassify first. Amount/date/description
    /// edits on a transfer leg propagate to the paired leg.
    pub async fn update_transaction(
        &self,
        tx_id: Uuid,
        update: &TransactionUpdate,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<()> {
        if let Some(amount) = update.amount_minor
            && amount <= 0
        {
            return Err(EngineError::InvalidAmount(format!(
                "invalid amount: {amount}"
            )));
        }

        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            if let Some(Some(category_id)) = update.category_id {
                self.require_category(&db_tx, category_id).await?;
            }
            if let Some(Some(subcategory_id)) = update.subcategory_id {
                self.require_subcategory(&db_tx, subcategory_id).await?;
            }

            if let Some(amount) = update.amount_minor
                && amount != tx.amount_minor
                && self.is_entry_involved(&db_tx, tx.id).await?
            {
                return Err(EngineError::InvalidLink(
                    "cannot change the amount of a transaction in a linked entry".to_string(),
                ));
            }

            let new_date = update.date.unwrap_or(tx.date);
            let from_date = new_date.min(tx.date);
            self.invalidate_guarded(&db_tx, tx.wallet_id, from_date, today, allow_rebuild)
                .await?;

            let active = transactions::ActiveModel {
                id: ActiveValue::Set(tx.id.to_string()),
                date: optional(update.date),
                time: match update.time {
                    Some(time) => ActiveValue::Set(time),
                    None => ActiveValue::NotSet,
                },
                amount_minor: optional(update.amount_minor),
                description: optional(update.description.clone()),
                category_id: match update.category_id {
                    Some(category_id) => {
                        ActiveValue::Set(category_id.map(|id| id.to_string()))
                    }
                    None => ActiveValue::NotSet,
                },
                subcategory_id: match update.subcategory_id {
                    Some(subcategory_id) => {
                        ActiveValue::Set(subcategory_id.map(|id| id.to_string()))
                    }
                    None => ActiveValue::NotSet,
                },
                ..Default::default()
            };
            active.update(&db_tx).await?;

            // A transfer's legs stay mirrored.
            if let Some(pair_id) = tx.paired_transaction_id {
                let pair = self.require_transaction(&db_tx, pair_id).await?;
                let pair_from = new_date.min(pair.date);
                self.invalidate_snapshots(&db_tx, pair.wallet_id, pair_from)
                    .await?;
                let active = transactions::ActiveModel {
                    id: ActiveValue::Set(pair.id.to_string()),
                    date: optional(update.date),
                    amount_minor: optional(update.amount_minor),
                    description: optional(update.description.clone()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
            }

            Ok(())
        })
    }

    /// Delete a transaction and everything that only exists because of it:
    /// the paired transfer leg, an owned linked entry with its join rows
    /// (settlers revert to plain), or its own settling join row (the
    /// entry's pending is restored).
    pub async fn delete_transaction(
        &self,
        tx_id: Uuid,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            self.invalidate_guarded(&db_tx, tx.wallet_id, tx.date, today, allow_rebuild)
                .await?;
            self.delete_tree(&db_tx, &tx).await?;
            info!(transaction = %tx.id, "deleted transaction");
            Ok(())
        })
    }

    /// Delete a batch atomically. The rebuild guard runs once per wallet at
    /// the earliest affected date.
    pub async fn delete_transactions(
        &self,
        tx_ids: &[Uuid],
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<()> {
        if tx_ids.is_empty() {
            return Err(EngineError::InvalidAmount(
                "no transactions to delete".to_string(),
            ));
        }
        let unique: HashSet<Uuid> = tx_ids.iter().copied().collect();
        if unique.len() != tx_ids.len() {
            return Err(EngineError::InvalidAmount(
                "duplicate transaction in batch".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut batch = Vec::with_capacity(tx_ids.len());
            let mut earliest: HashMap<Uuid, NaiveDate> = HashMap::new();
            for &tx_id in tx_ids {
                let tx = self.require_transaction(&db_tx, tx_id).await?;
                earliest
                    .entry(tx.wallet_id)
                    .and_modify(|date| *date = (*date).min(tx.date))
                    .or_insert(tx.date);
                batch.push(tx);
            }
            for (&wallet_id, &from_date) in &earliest {
                self.invalidate_guarded(&db_tx, wallet_id, from_date, today, allow_rebuild)
                    .await?;
            }

            for tx in &batch {
                // A transfer pair may already be gone via its other leg.
                let still_there = transactions::Entity::find_by_id(tx.id.to_string())
                    .one(&db_tx)
                    .await?
                    .is_some();
                if still_there {
                    self.delete_tree(&db_tx, tx).await?;
                }
            }
            info!(deleted = batch.len(), "deleted transaction batch");
            Ok(())
        })
    }

    async fn delete_tree(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        if let Some(pair_id) = tx.paired_transaction_id
            && let Some(pair) = transactions::Entity::find_by_id(pair_id.to_string())
                .one(db_tx)
                .await?
        {
            let pair = Transaction::try_from(pair)?;
            self.invalidate_snapshots(db_tx, pair.wallet_id, pair.date)
                .await?;
            transactions::Entity::delete_by_id(pair.id.to_string())
                .exec(db_tx)
                .await?;
        }

        if let Some(entry) = self.entry_for_primary(db_tx, tx.id).await? {
            self.unlink_all_for_entry(db_tx, &entry).await?;
            crate::linked_entries::Entity::delete_by_id(entry.id.to_string())
                .exec(db_tx)
                .await?;
        }

        if let Some(link) = self.link_for_transaction(db_tx, tx.id).await? {
            let mut entry = self.require_entry(db_tx, link.linked_entry_id).await?;
            entry.pending_amount_minor += tx.amount_minor;
            entry.status = status_for(entry.pending_amount_minor, entry.settle_reference());
            self.update_entry_pending(db_tx, &entry).await?;
            linked_transactions::Entity::delete_by_id(link.id.to_string())
                .exec(db_tx)
                .await?;
        }

        transactions::Entity::delete_by_id(tx.id.to_string())
            .exec(db_tx)
            .await?;
        self.invalidate_snapshots(db_tx, tx.wallet_id, tx.date)
            .await?;
        Ok(())
    }

    /// Set or clear the ignored flag on a batch. Ignored rows still move
    /// the balance, so no snapshot is invalidated.
    pub async fn set_ignored(&self, tx_ids: &[Uuid], ignored: bool) -> ResultEngine<()> {
        if tx_ids.is_empty() {
            return Err(EngineError::InvalidAmount(
                "no transactions to flag".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            for &tx_id in tx_ids {
                let tx = self.require_transaction(&db_tx, tx_id).await?;
                let active = transactions::ActiveModel {
                    id: ActiveValue::Set(tx.id.to_string()),
                    is_ignored: ActiveValue::Set(ignored),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
            }
            Ok(())
        })
    }

    /// Flip a plain transaction between Expense and Income, changing its
    /// direction to match. Transfer legs and entry-involved rows are
    /// rejected.
    pub async fn reclassify_transaction(
        &self,
        tx_id: Uuid,
        classification: Classification,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<()> {
        if !classification.is_plain() {
            return Err(EngineError::InvalidClassification(format!(
                "cannot reclassify to {}",
                classification.as_str()
            )));
        }
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            if !tx.classification.is_plain() {
                return Err(EngineError::InvalidClassification(format!(
                    "cannot reclassify a {}",
                    tx.classification.as_str()
                )));
            }
            if self.is_entry_involved(&db_tx, tx.id).await? {
                return Err(EngineError::InvalidLink(
                    "transaction participates in a linked entry".to_string(),
                ));
            }
            if tx.classification == classification {
                return Ok(());
            }

            let direction = match classification {
                Classification::Income => Direction::Inflow,
                _ => Direction::Outflow,
            };
            self.invalidate_guarded(&db_tx, tx.wallet_id, tx.date, today, allow_rebuild)
                .await?;
            self.set_classification(&db_tx, tx.id, classification, Some(direction))
                .await?;
            Ok(())
        })
    }
}

fn optional<T>(value: Option<T>) -> ActiveValue<T>
where
    T: Into<sea_orm::Value>,
{
    match value {
        Some(value) => ActiveValue::Set(value),
        None => ActiveValue::NotSet,
    }
}
