//! Public balance reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, Wallet, wallets::WalletKind, wallets};

use super::{Engine, with_tx};

/// Overall standing across every wallet and open settlement entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetPosition {
    /// Sum of Normal wallet balances.
    pub assets_minor: i64,
    /// Sum of Credit wallet balances (positive = debt).
    pub liabilities_minor: i64,
    /// Still owed to the user (splits and loans).
    pub pending_owed_minor: i64,
    /// Still owed by the user (debts). Installment pending is excluded.
    pub pending_debt_minor: i64,
    pub net_minor: i64,
}

impl Engine {
    /// Balance of a wallet at end of `as_of` (defaults to `today`).
    ///
    /// Reads for today may lazily persist a snapshot; historical reads
    /// never write. Credit wallets report debt as a positive number.
    pub async fn balance(
        &self,
        wallet_id: Uuid,
        as_of: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet(&db_tx, wallet_id).await?;
            let as_of = as_of.unwrap_or(today);
            self.balance_in_tx(&db_tx, &wallet, as_of, today).await
        })
    }

    /// Point-in-time balances over an inclusive date range, one entry
    /// every `step_days`. Historical points never write; a point landing
    /// on `today` may refresh the cache like any other read for today.
    pub async fn balance_history(
        &self,
        wallet_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        step_days: u32,
        today: NaiveDate,
    ) -> ResultEngine<Vec<(NaiveDate, i64)>> {
        if from > to {
            return Err(EngineError::InvalidAmount(
                "invalid range: from must be <= to".to_string(),
            ));
        }
        if step_days == 0 {
            return Err(EngineError::InvalidAmount(
                "step_days must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet(&db_tx, wallet_id).await?;
            let mut out = Vec::new();
            let mut at = from;
            while at <= to {
                let balance = self.balance_in_tx(&db_tx, &wallet, at, today).await?;
                out.push((at, balance));
                at = at + chrono::Days::new(u64::from(step_days));
            }
            Ok(out)
        })
    }

    /// Remaining spending room on a credit wallet:
    /// `credit_limit - balance(today) - pending installment amounts`.
    pub async fn available_credit(
        &self,
        wallet_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet(&db_tx, wallet_id).await?;
            if wallet.kind != WalletKind::Credit {
                return Err(EngineError::InvalidAmount(
                    "available credit requires a credit wallet".to_string(),
                ));
            }
            let balance = self.balance_in_tx(&db_tx, &wallet, today, today).await?;
            let reserved = self
                .pending_installments_in_tx(&db_tx, Some(wallet.id))
                .await?;
            Ok(wallet.credit_limit_minor - balance - reserved)
        })
    }

    /// Assets minus liabilities, adjusted by open receivables and payables.
    pub async fn net_position(&self, today: NaiveDate) -> ResultEngine<NetPosition> {
        with_tx!(self, |db_tx| {
            let mut assets = 0;
            let mut liabilities = 0;
            for model in wallets::Entity::find().all(&db_tx).await? {
                let wallet = Wallet::try_from(model)?;
                let balance = self.balance_in_tx(&db_tx, &wallet, today, today).await?;
                match wallet.kind {
                    WalletKind::Normal => assets += balance,
                    WalletKind::Credit => liabilities += balance,
                }
            }

            let pending_owed = self.total_owed_in_tx(&db_tx).await?;
            let pending_debt = self.total_debt_in_tx(&db_tx).await?;

            Ok(NetPosition {
                assets_minor: assets,
                liabilities_minor: liabilities,
                pending_owed_minor: pending_owed,
                pending_debt_minor: pending_debt,
                net_minor: assets - liabilities + pending_owed - pending_debt,
            })
        })
    }
}
