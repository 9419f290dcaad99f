//! Merging duplicate or fragmented transactions.

use chrono::NaiveDate;
use std::collections::HashSet;
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};
use tracing::info;

use crate::{EngineError, ResultEngine, Transaction, classify, transactions};

use super::super::{Engine, with_tx};

impl Engine {
    /// Replace two or more transactions with a single one carrying their
    /// summed amount.
    ///
    /// Sources must share a wallet and a direction, all be plain
    /// Expense/Income, and none be a calibration. The merged row inherits
    /// their classification when uniform, otherwise the plain one for the
    /// direction.
    pub async fn merge_transactions(
        &self,
        tx_ids: &[Uuid],
        date: NaiveDate,
        description: &str,
        category_id: Option<Uuid>,
        subcategory_id: Option<Uuid>,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<Uuid> {
        if tx_ids.len() < 2 {
            return Err(EngineError::InvalidAmount(
                "merging requires at least two transactions".to_string(),
            ));
        }
        let unique: HashSet<Uuid> = tx_ids.iter().copied().collect();
        if unique.len() != tx_ids.len() {
            return Err(EngineError::InvalidAmount(
                "duplicate transaction in batch".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut sources = Vec::with_capacity(tx_ids.len());
            for &tx_id in tx_ids {
                let tx = self.require_transaction(&db_tx, tx_id).await?;
                if !tx.classification.is_plain() {
                    return Err(EngineError::InvalidClassification(format!(
                        "cannot merge a {}",
                        tx.classification.as_str()
                    )));
                }
                if tx.is_calibration {
                    return Err(EngineError::InvalidClassification(
                        "cannot merge a calibration".to_string(),
                    ));
                }
                sources.push(tx);
            }
            let wallet_id = sources[0].wallet_id;
            let direction = sources[0].direction;
            if sources
                .iter()
                .any(|tx| tx.wallet_id != wallet_id || tx.direction != direction)
            {
                return Err(EngineError::InvalidAmount(
                    "merged transactions must share wallet and direction".to_string(),
                ));
            }

            let first = sources[0].classification;
            let classification = if sources.iter().all(|tx| tx.classification == first) {
                first
            } else {
                classify::plain_classification(direction)?
            };
            let amount_minor: i64 = sources.iter().map(|tx| tx.amount_minor).sum();

            let from_date = sources
                .iter()
                .map(|tx| tx.date)
                .fold(date, NaiveDate::min);
            self.invalidate_guarded(&db_tx, wallet_id, from_date, today, allow_rebuild)
                .await?;

            let mut merged = Transaction::new(
                wallet_id,
                date,
                None,
                direction,
                amount_minor,
                classification,
                description.to_string(),
            )?;
            merged.category_id = category_id;
            merged.subcategory_id = subcategory_id;

            for tx in &sources {
                transactions::Entity::delete_by_id(tx.id.to_string())
                    .exec(&db_tx)
                    .await?;
            }
            transactions::ActiveModel::from(&merged)
                .insert(&db_tx)
                .await?;

            info!(
                merged = %merged.id,
                sources = sources.len(),
                amount = amount_minor,
                "merged transactions"
            );
            Ok(merged.id)
        })
    }
}
