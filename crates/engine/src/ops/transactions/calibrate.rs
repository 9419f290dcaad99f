//! Resolving calibrations against late-arriving real transactions.

use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use tracing::info;

use crate::{EngineError, ResultEngine, Transaction, classify::Classification, transactions};

use super::super::{Engine, with_tx};

impl Engine {
    /// Absorb a real transaction into a calibration.
    ///
    /// The calibration covered an unexplained difference; once the real
    /// transaction explaining part of it shows up, the calibration shrinks
    /// by that amount (same direction) or grows (opposite direction). A
    /// fully explained calibration stays at amount zero, ignored; an
    /// overshoot flips its direction and classification.
    pub async fn resolve_calibration(
        &self,
        calibration_id: Uuid,
        tx_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let mut calibration = self.require_transaction(&db_tx, calibration_id).await?;
            if !calibration.is_calibration {
                return Err(EngineError::InvalidAmount(
                    "transaction is not a calibration".to_string(),
                ));
            }
            let tx = self.require_transaction(&db_tx, tx_id).await?;
            if tx.wallet_id != calibration.wallet_id {
                return Err(EngineError::InvalidAmount(
                    "calibration and transaction belong to different wallets".to_string(),
                ));
            }
            if tx.is_calibration {
                return Err(EngineError::InvalidAmount(
                    "cannot resolve against another calibration".to_string(),
                ));
            }
            if !tx.classification.is_plain() {
                return Err(EngineError::InvalidClassification(format!(
                    "cannot resolve a calibration with a {}",
                    tx.classification.as_str()
                )));
            }

            let remaining = if tx.direction == calibration.direction {
                calibration.amount_minor - tx.amount_minor
            } else {
                calibration.amount_minor + tx.amount_minor
            };

            if remaining < 0 {
                calibration.direction = calibration.direction.flipped();
                calibration.classification = match calibration.classification {
                    Classification::Expense => Classification::Income,
                    _ => Classification::Expense,
                };
                calibration.amount_minor = -remaining;
                calibration.is_ignored = false;
            } else {
                calibration.amount_minor = remaining;
                if remaining == 0 {
                    calibration.is_ignored = true;
                }
            }

            let active = transactions::ActiveModel {
                id: ActiveValue::Set(calibration.id.to_string()),
                direction: ActiveValue::Set(calibration.direction.as_str().to_string()),
                classification: ActiveValue::Set(
                    calibration.classification.as_str().to_string(),
                ),
                amount_minor: ActiveValue::Set(calibration.amount_minor),
                is_ignored: ActiveValue::Set(calibration.is_ignored),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            self.invalidate_snapshots(&db_tx, calibration.wallet_id, calibration.date)
                .await?;

            info!(
                calibration = %calibration.id,
                resolved_with = %tx.id,
                remaining = calibration.amount_minor,
                "resolved calibration"
            );
            Ok(calibration)
        })
    }
}
