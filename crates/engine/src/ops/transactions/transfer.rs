//! Wallet-to-wallet transfers.

use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};
use tracing::info;

use crate::{
    EngineError, ResultEngine, Transaction,
    classify::{Classification, Direction},
    transactions,
};

use super::super::{Engine, with_tx};

impl Engine {
    /// Move money between two wallets: one Outflow and one Inflow leg,
    /// both classified Transfer and cross-referencing each other, so
    /// neither counts as spending or earning.
    ///
    /// Returns `(outgoing, incoming)` transaction ids.
    pub async fn transfer(
        &self,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount_minor: i64,
        date: NaiveDate,
        description: &str,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<(Uuid, Uuid)> {
        if from_wallet_id == to_wallet_id {
            return Err(EngineError::InvalidAmount(
                "cannot transfer a wallet to itself".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_wallet(&db_tx, from_wallet_id).await?;
            self.require_wallet(&db_tx, to_wallet_id).await?;

            let mut outgoing = Transaction::new(
                from_wallet_id,
                date,
                None,
                Direction::Outflow,
                amount_minor,
                Classification::Transfer,
                description.to_string(),
            )?;
            let mut incoming = Transaction::new(
                to_wallet_id,
                date,
                None,
                Direction::Inflow,
                amount_minor,
                Classification::Transfer,
                description.to_string(),
            )?;
            outgoing.paired_transaction_id = Some(incoming.id);
            incoming.paired_transaction_id = Some(outgoing.id);

            self.invalidate_guarded(&db_tx, from_wallet_id, date, today, allow_rebuild)
                .await?;
            self.invalidate_guarded(&db_tx, to_wallet_id, date, today, allow_rebuild)
                .await?;

            transactions::ActiveModel::from(&outgoing)
                .insert(&db_tx)
                .await?;
            transactions::ActiveModel::from(&incoming)
                .insert(&db_tx)
                .await?;

            info!(
                from = %from_wallet_id,
                to = %to_wallet_id,
                amount = amount_minor,
                "created wallet transfer"
            );
            Ok((outgoing.id, incoming.id))
        })
    }
}
